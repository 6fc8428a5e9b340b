use thiserror::Error;

pub use anyhow::{bail, Result};

#[derive(Error, Debug)]
pub enum CircuitGenError {
    #[error("unknown {kind} `{value}`, expected one of: {expected}")]
    UnknownVariant { kind: &'static str, value: String, expected: String },

    #[error("invalid argument '{0}', expected key=value format")]
    InvalidNamedParam(String),

    #[error("missing configuration entry `{0}`")]
    MissingConfig(String),

    #[error("reference module `{module}` not found under {searched}")]
    ModuleNotFound { module: String, searched: String },

    #[error("cannot import name `{name}` from {module}")]
    MissingDefinition { name: String, module: String },
}
