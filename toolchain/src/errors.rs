use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolchainError>;

#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reading output of `{command}` failed")]
    Output {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error executing command: {command} (exit code {code:?})")]
    CommandFailed { command: String, code: Option<i32>, output: String },

    #[error("{0} was not generated")]
    MissingArtifact(PathBuf),

    #[error("`{0}` line missing from compiler output")]
    MissingConstraintCount(&'static str),

    #[error("invalid constraint count in line `{0}`")]
    MalformedConstraintCount(String),

    #[error("no powersOfTau28_hez_final_<n>.ptau file in {0}")]
    NoPtauFile(PathBuf),

    #[error("proof verification failed: {0}")]
    VerificationFailed(String),

    #[error("open file error")]
    FileError(#[from] std::io::Error),
}
