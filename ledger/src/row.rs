use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::{LedgerError, Result};

/// Field separator of the result files.
pub const SEPARATOR: char = ';';

const LEADING_COLUMN: &str = "Number of Bits";
const METRIC_COLUMNS: [&str; 7] = [
    "non-linear constraints",
    "linear constraints",
    "total constraints",
    "CRS size [MB]",
    "t_prep [ms]",
    "t_prove [ms]",
    "t_ver [ms]",
];

/// Selects one result file: `<proof_system>/<curve>/results/<mode>/<ballot_type>.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileKey {
    pub proof_system: String,
    pub curve: String,
    pub mode: String,
    pub ballot_type: String,
}

impl FileKey {
    pub fn new(
        proof_system: impl Into<String>,
        curve: impl Into<String>,
        mode: impl Into<String>,
        ballot_type: impl Into<String>,
    ) -> Self {
        FileKey {
            proof_system: proof_system.into(),
            curve: curve.into(),
            mode: mode.into(),
            ballot_type: ballot_type.into(),
        }
    }

    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(&self.proof_system)
            .join(&self.curve)
            .join("results")
            .join(&self.mode)
            .join(format!("{}.csv", self.ballot_type))
    }
}

/// Row key: bit width followed by the parameter values in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    bit_width: String,
    values: Vec<String>,
}

impl Indicator {
    pub fn new<I, S>(bit_width: impl ToString, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let indicator = Indicator {
            bit_width: bit_width.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        };
        for field in std::iter::once(&indicator.bit_width).chain(indicator.values.iter()) {
            check_field(field)?;
        }
        Ok(indicator)
    }

    pub fn bit_width(&self) -> &str {
        &self.bit_width
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The prefix every line of this indicator starts with, separator included.
    pub fn line_prefix(&self) -> String {
        format!("{}{}", self, SEPARATOR)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bit_width)?;
        for v in &self.values {
            write!(f, "{}{}", SEPARATOR, v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub non_linear_constraints: u64,
    pub linear_constraints: u64,
    /// Size of the proving key in mebibytes.
    pub crs_size_mb: f64,
    pub t_prep_ms: u64,
    pub t_prove_ms: u64,
    pub t_ver_ms: u64,
}

impl Metrics {
    pub fn total_constraints(&self) -> u64 {
        self.non_linear_constraints + self.linear_constraints
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub indicator: Indicator,
    pub metrics: Metrics,
}

impl ResultRow {
    pub fn new(indicator: Indicator, metrics: Metrics) -> Self {
        ResultRow { indicator, metrics }
    }

    pub fn to_line(&self) -> String {
        let m = &self.metrics;
        // `{:?}` keeps a trailing `.0` on whole numbers, so the column always reads as a float
        format!(
            "{ind}{s}{}{s}{}{s}{}{s}{:?}{s}{}{s}{}{s}{}",
            m.non_linear_constraints,
            m.linear_constraints,
            m.total_constraints(),
            m.crs_size_mb,
            m.t_prep_ms,
            m.t_prove_ms,
            m.t_ver_ms,
            ind = self.indicator,
            s = SEPARATOR,
        )
    }
}

/// Header line for a file whose indicator carries `parameter_names`.
pub fn header<S: AsRef<str>>(parameter_names: &[S]) -> String {
    std::iter::once(LEADING_COLUMN)
        .chain(parameter_names.iter().map(AsRef::as_ref))
        .chain(METRIC_COLUMNS)
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string())
}

pub(crate) fn check_field(field: &str) -> Result<()> {
    if field.contains(SEPARATOR) || field.contains('\n') || field.contains('\r') {
        return Err(LedgerError::InvalidField(field.to_string()));
    }
    Ok(())
}
