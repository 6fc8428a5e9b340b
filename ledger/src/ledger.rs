use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{LedgerError, Result};
use crate::row::{check_field, header, FileKey, Indicator, Metrics, ResultRow};

/// Result files rooted at one directory, one file per [`FileKey`].
///
/// Every write is a full read-modify-write of the target file. There is no
/// locking: two processes upserting into the same file race and the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct ResultLedger {
    root: PathBuf,
}

impl ResultLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ResultLedger { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, key: &FileKey) -> PathBuf {
        key.path(&self.root)
    }

    /// Insert or replace the row of `indicator` in the file selected by `key`.
    ///
    /// The header is derived from `parameter_names` only when the file is
    /// created. Any line of an existing file starting with `<indicator>;` is
    /// dropped and the new row is appended last, so the other rows keep
    /// their bytes and relative order.
    pub fn upsert<S: AsRef<str>>(
        &self,
        key: &FileKey,
        parameter_names: &[S],
        indicator: &Indicator,
        metrics: &Metrics,
    ) -> Result<PathBuf> {
        if parameter_names.len() != indicator.values().len() {
            return Err(LedgerError::ArityMismatch {
                expected: parameter_names.len(),
                found: indicator.values().len(),
            });
        }
        for name in parameter_names {
            check_field(name.as_ref())?;
        }
        if !metrics.crs_size_mb.is_finite() || metrics.crs_size_mb < 0.0 {
            return Err(LedgerError::InvalidCrsSize(metrics.crs_size_mb));
        }

        let path = self.path(key);
        let expected_header = header(parameter_names);

        let mut lines = match self.read_lines(&path)? {
            Some(lines) if !lines.is_empty() => lines,
            _ => {
                log::info!("creating result file {}", path.display());
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(LedgerError::file(parent))?;
                }
                vec![expected_header.clone()]
            }
        };
        if lines[0] != expected_header {
            log::warn!(
                "keeping existing header of {}: `{}` (this run would have written `{}`)",
                path.display(),
                lines[0],
                expected_header
            );
        }

        let prefix = indicator.line_prefix();
        let before = lines.len();
        let mut data = lines.split_off(1);
        data.retain(|line| !line.starts_with(&prefix));
        if data.len() + 1 < before {
            log::debug!("replacing previous row for indicator `{}`", indicator);
        }

        let row = ResultRow::new(indicator.clone(), *metrics);
        lines.extend(data);
        lines.push(row.to_line());

        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&path, content).map_err(LedgerError::file(&path))?;
        log::info!("results saved in {}", path.display());
        Ok(path)
    }

    /// Data lines of the file selected by `key`, header excluded. A missing
    /// file has no rows.
    pub fn rows(&self, key: &FileKey) -> Result<Vec<String>> {
        let lines = self.read_lines(&self.path(key))?.unwrap_or_default();
        Ok(lines.into_iter().skip(1).collect())
    }

    /// Header line of the file selected by `key`, if the file exists.
    pub fn header(&self, key: &FileKey) -> Result<Option<String>> {
        Ok(self.read_lines(&self.path(key))?.and_then(|lines| lines.into_iter().next()))
    }

    fn read_lines(&self, path: &Path) -> Result<Option<Vec<String>>> {
        match fs::read_to_string(path) {
            Ok(text) => {
                // split on `\n` only so a `\r` stays part of its line
                let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
                if lines.last().map_or(false, |l| l.is_empty()) {
                    lines.pop();
                }
                Ok(Some(lines))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::file(path)(e)),
        }
    }
}
