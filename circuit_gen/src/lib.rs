//! Source generation for the voting circuit benchmarks: circom test circuits,
//! sage reference scripts and benchmark suites.

pub mod ballot;
pub mod circom;
pub mod config;
pub mod errors;
pub mod params;
pub mod reference;
pub mod suite;

pub use ballot::BallotType;
pub use circom::CircuitTemplate;
pub use config::{BallotTypeConfig, CircomConfig, CurveConfig};
pub use params::{Mode, NamedParams, ProofSystem};
pub use reference::ScriptCache;
