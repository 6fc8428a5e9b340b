use crate::errors::{Result, ToolchainError};

const NON_LINEAR: &str = "non-linear constraints:";
const LINEAR: &str = "linear constraints:";

/// What to do when the compiler output lacks a constraint count line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountPolicy {
    /// A missing line is an error.
    #[default]
    Strict,
    /// A missing line counts as zero.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstraintCounts {
    pub non_linear: u64,
    pub linear: u64,
}

impl ConstraintCounts {
    /// Scrape the counts circom prints after compiling.
    pub fn parse(output: &str, policy: CountPolicy) -> Result<Self> {
        let count = |prefix: &'static str| -> Result<u64> {
            match (find_count(output, prefix)?, policy) {
                (Some(n), _) => Ok(n),
                (None, CountPolicy::Lenient) => {
                    log::warn!("`{}` missing from compiler output, recording 0", prefix);
                    Ok(0)
                }
                (None, CountPolicy::Strict) => Err(ToolchainError::MissingConstraintCount(prefix)),
            }
        };
        Ok(ConstraintCounts { non_linear: count(NON_LINEAR)?, linear: count(LINEAR)? })
    }

    pub fn total(&self) -> u64 {
        self.non_linear + self.linear
    }
}

fn find_count(output: &str, prefix: &str) -> Result<Option<u64>> {
    let line = match output.lines().find(|l| l.starts_with(prefix)) {
        Some(l) => l,
        None => return Ok(None),
    };
    line[prefix.len()..]
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .map(Some)
        .ok_or_else(|| ToolchainError::MalformedConstraintCount(line.to_string()))
}
