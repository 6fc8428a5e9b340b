//! Drives the external circom/snarkjs toolchain for one benchmark circuit.

pub mod constraints;
pub mod errors;
pub mod exec;
pub mod pipeline;
pub mod ptau;

pub use constraints::{ConstraintCounts, CountPolicy};
pub use errors::{Result, ToolchainError};
pub use exec::{Executor, ShellExecutor, NODE_OPTIONS};
pub use pipeline::{Benchmark, SetupReport, WitnessSource, Workspace};
pub use ptau::find_largest_ptau;
