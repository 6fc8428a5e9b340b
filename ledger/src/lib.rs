//! Benchmark result files.
//!
//! One `;`-separated file per (proof system, curve, mode, ballot type). Each
//! data line is keyed by its indicator (bit width followed by the parameter
//! values), and [`ResultLedger::upsert`] keeps at most one line per indicator.

pub mod errors;
pub mod ledger;
pub mod row;

pub use errors::{LedgerError, Result};
pub use ledger::ResultLedger;
pub use row::{header, FileKey, Indicator, Metrics, ResultRow, SEPARATOR};
