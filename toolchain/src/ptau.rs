use crate::errors::{Result, ToolchainError};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref PTAU_FILE: Regex = Regex::new(r"^powersOfTau28_hez_final_(\d+)\.ptau$").unwrap();
}

/// Power of tau encoded in a Hermez ceremony file name.
pub fn ptau_power(file_name: &str) -> Option<u32> {
    PTAU_FILE.captures(file_name).and_then(|cap| cap[1].parse().ok())
}

/// The `powersOfTau28_hez_final_<n>.ptau` file in `dir` with the largest `n`.
pub fn find_largest_ptau(dir: &Path) -> Result<PathBuf> {
    let mut best: Option<(u32, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let power = match name.to_str().and_then(ptau_power) {
            Some(p) => p,
            None => continue,
        };
        if best.as_ref().map_or(true, |(max, _)| power > *max) {
            best = Some((power, entry.path()));
        }
    }
    let (power, path) = best.ok_or_else(|| ToolchainError::NoPtauFile(dir.to_path_buf()))?;
    log::info!("using ptau file {} (2^{} constraints)", path.display(), power);
    Ok(path)
}
