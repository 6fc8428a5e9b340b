use crate::ballot::BallotType;
use crate::errors::{CircuitGenError, Result};
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub fn load_json<T>(filename: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let mut file =
        File::open(filename).map_err(|e| anyhow!("open {} error: {:?}", filename.display(), e))?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    serde_json::from_str(&data).with_context(|| format!("parse {}", filename.display()))
}

/// Shape of the circom templates, read from `circomConfig.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircomConfig {
    pub elliptic_curves: BTreeMap<String, CurveConfig>,
    pub election_types: BTreeMap<String, BallotTypeConfig>,
}

/// Names and dimensions of the curve-specific signals.
#[derive(Debug, Clone, Deserialize)]
pub struct CurveConfig {
    pub curve_point_name: String,
    pub g_name: String,
    pub pk_name: String,
    pub g_dim: String,
    pub pk_dim: String,
    pub curve_params_name: String,
    pub curve_params_str: String,
    pub ballot_entry_dim_for_enc: String,
    pub r_entry_dim: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BallotTypeConfig {
    pub dim: Vec<String>,
    pub ballot_format: String,
    pub has_ranking: bool,
    #[serde(default)]
    pub ranking_dim: Option<String>,
}

impl BallotTypeConfig {
    /// `[a][b]` form used in signal declarations.
    pub fn dim_array(&self) -> String {
        self.dim.iter().map(|d| format!("[{}]", d)).collect()
    }

    /// `a,b` form used as template arguments.
    pub fn dim_args(&self) -> String {
        self.dim.join(",")
    }

    /// Dimension of the ranking signal, `None` for ballots without ranking.
    pub fn ranking(&self) -> Result<Option<&str>> {
        match (self.has_ranking, self.ranking_dim.as_deref()) {
            (false, _) => Ok(None),
            (true, Some(dim)) => Ok(Some(dim)),
            (true, None) => Err(CircuitGenError::MissingConfig("ranking_dim".to_string()).into()),
        }
    }
}

impl CircomConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn curve(&self, name: &str) -> Result<&CurveConfig> {
        self.elliptic_curves
            .get(name)
            .ok_or_else(|| CircuitGenError::MissingConfig(format!("ellipticCurves.{}", name)).into())
    }

    pub fn ballot_type(&self, ballot_type: BallotType) -> Result<&BallotTypeConfig> {
        self.election_types.get(ballot_type.name()).ok_or_else(|| {
            CircuitGenError::MissingConfig(format!("electionTypes.{}", ballot_type.name())).into()
        })
    }
}
