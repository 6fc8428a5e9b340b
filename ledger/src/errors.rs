use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("parameter arity mismatch (expected {expected:?} values, found {found:?})")]
    ArityMismatch { expected: usize, found: usize },

    #[error("invalid field value `{0}`: must not contain the separator or a newline")]
    InvalidField(String),

    #[error("invalid CRS size {0:?}: must be finite and not negative")]
    InvalidCrsSize(f64),

    #[error("result file `{path}` error")]
    FileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    pub(crate) fn file(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> LedgerError {
        let path = path.into();
        move |source| LedgerError::FileError { path, source }
    }
}
