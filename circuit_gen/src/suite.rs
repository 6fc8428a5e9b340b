//! Benchmark suite generation.
//!
//! `testConfig.json` names the ballot types, bit widths and candidate counts
//! to cover. Each ballot type expands one (bits, candidates) point into zero
//! or more concrete cases through its [`CaseGenerator`]; the resulting suite
//! lists one `zkbench run` command per case.

use crate::ballot::BallotType;
use crate::config::load_json;
use crate::errors::{CircuitGenError, Result};
use crate::params::{Mode, ProofSystem};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Placeholder in `maxChoices` asking for twice the candidate count.
pub const DERIVED_MAX_CHOICES: &str = "calculated from nCand";

/// Program name used in generated commands.
pub const RUN_COMMAND: &str = "zkbench run";

lazy_static! {
    static ref ORDERED_POINTS_ARRAY: Regex = Regex::new(r#""orderedPoints": \[([^\]]*)\]"#).unwrap();
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub test_suite: SuiteSettings,
    #[serde(default)]
    pub election_type_specific_configs: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSettings {
    pub snark: ProofSystem,
    pub test_circuits: Vec<Mode>,
    pub bits_votes: Vec<u32>,
    pub n_cand: Vec<u32>,
    pub election_types: Vec<BallotType>,
    pub elliptic_curve: String,
}

impl TestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Typed settings of `ballot_type` from `electionTypeSpecificConfigs`.
    fn settings<T: serde::de::DeserializeOwned>(&self, ballot_type: BallotType) -> Result<T> {
        let raw = self.election_type_specific_configs.get(ballot_type.name()).ok_or_else(|| {
            CircuitGenError::MissingConfig(format!("electionTypeSpecificConfigs.{}", ballot_type))
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }
}

/// Scalar or list value of an additional benchmark parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    List(Vec<i64>),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            // `{:?}` keeps `1.0` from collapsing to `1`, matching the JSON form
            ParamValue::Float(v) => write!(f, "{:?}", v),
            ParamValue::List(vs) => {
                let items = vs.iter().map(|v| v.to_string()).collect::<Vec<_>>();
                write!(f, "[{}]", items.join(","))
            }
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Grid point every generator starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSeed {
    pub snark: ProofSystem,
    pub mode: Mode,
    pub curve: String,
    pub ballot_type: BallotType,
    pub bits_votes: u32,
    pub n_cand: u32,
}

/// One benchmark invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub seed: CaseSeed,
    pub additional: Vec<(String, ParamValue)>,
}

impl TestCase {
    fn new(seed: &CaseSeed, additional: Vec<(String, ParamValue)>) -> Self {
        TestCase { seed: seed.clone(), additional }
    }

    pub fn command(&self) -> String {
        let s = &self.seed;
        let mut command = format!(
            "{} {} {} {} {} {} {}={}",
            RUN_COMMAND,
            s.snark,
            s.mode,
            s.curve,
            s.ballot_type,
            s.bits_votes,
            s.ballot_type.candidate_param(),
            s.n_cand
        );
        for (name, value) in &self.additional {
            command.push_str(&format!(" {}={}", name, value.to_string().replace(' ', "")));
        }
        command
    }

    pub fn to_json(&self) -> Value {
        let s = &self.seed;
        let mut data = Map::new();
        data.insert("name".into(), s.ballot_type.name().into());
        data.insert("ellipticCurve".into(), s.curve.clone().into());
        data.insert("bitsVotes".into(), s.bits_votes.into());
        data.insert(s.ballot_type.candidate_param().into(), s.n_cand.into());
        for (name, value) in &self.additional {
            data.insert(name.clone(), serde_json::to_value(value).unwrap_or(Value::Null));
        }
        data.insert("command".into(), self.command().into());
        Value::Object(data)
    }
}

pub type CaseGenerator = fn(&CaseSeed, &TestConfig) -> Result<Vec<TestCase>>;

/// Expansion rule of each ballot type.
pub fn case_generator(ballot_type: BallotType) -> CaseGenerator {
    match ballot_type {
        BallotType::SingleVote | BallotType::LineVote | BallotType::Condorcet => single_case,
        BallotType::PointlistBorda => pointlist_borda_cases,
        BallotType::MultiVote => multi_vote_cases,
        BallotType::MultiVoteWithRules => multi_vote_with_rules_cases,
        BallotType::MajorityJudgement => majority_judgement_cases,
        BallotType::BordaTournamentStyle => borda_tournament_cases,
    }
}

fn single_case(seed: &CaseSeed, _: &TestConfig) -> Result<Vec<TestCase>> {
    Ok(vec![TestCase::new(seed, vec![])])
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointlistSettings {
    default_pointlist_length: u32,
    #[serde(default)]
    do_pointlist_length_equals_choices_case: bool,
}

/// Descending point list `[len, len - 1, ..., 1]`.
pub fn point_list(len: u32) -> Vec<i64> {
    (1..=len as i64).rev().collect()
}

fn pointlist_borda_cases(seed: &CaseSeed, config: &TestConfig) -> Result<Vec<TestCase>> {
    let settings: PointlistSettings = config.settings(seed.ballot_type)?;
    let with_points = |len: u32| {
        TestCase::new(
            seed,
            vec![
                ("nPoints".into(), ParamValue::Int(len as i64)),
                ("orderedPoints".into(), ParamValue::List(point_list(len))),
            ],
        )
    };
    let mut cases = vec![];
    if settings.do_pointlist_length_equals_choices_case {
        cases.push(with_points(seed.n_cand));
    }
    if seed.n_cand >= settings.default_pointlist_length {
        cases.push(with_points(settings.default_pointlist_length));
    }
    Ok(cases)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiVoteSettings {
    max_votes_cand: ParamValue,
    max_choices: ParamValue,
}

fn multi_vote_params(seed: &CaseSeed, config: &TestConfig) -> Result<Vec<(String, ParamValue)>> {
    let settings: MultiVoteSettings = config.settings(seed.ballot_type)?;
    let max_choices = match settings.max_choices {
        ParamValue::Text(s) if s == DERIVED_MAX_CHOICES => ParamValue::Int(2 * seed.n_cand as i64),
        other => other,
    };
    Ok(vec![("maxVotesCand".into(), settings.max_votes_cand), ("maxChoices".into(), max_choices)])
}

fn multi_vote_cases(seed: &CaseSeed, config: &TestConfig) -> Result<Vec<TestCase>> {
    Ok(vec![TestCase::new(seed, multi_vote_params(seed, config)?)])
}

fn multi_vote_with_rules_cases(seed: &CaseSeed, config: &TestConfig) -> Result<Vec<TestCase>> {
    // the additional rule needs at least three entries
    if seed.n_cand < 3 {
        return Ok(vec![]);
    }
    multi_vote_cases(seed, config)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MajorityJudgementSettings {
    default_number_of_grades: i64,
    #[serde(default)]
    do_number_of_grades_equals_cands_case: bool,
}

fn majority_judgement_cases(seed: &CaseSeed, config: &TestConfig) -> Result<Vec<TestCase>> {
    let settings: MajorityJudgementSettings = config.settings(seed.ballot_type)?;
    let with_grades = |n: i64| TestCase::new(seed, vec![("nGrades".into(), ParamValue::Int(n))]);
    let mut cases = vec![];
    if settings.do_number_of_grades_equals_cands_case {
        cases.push(with_grades(seed.n_cand as i64));
    }
    cases.push(with_grades(settings.default_number_of_grades));
    Ok(cases)
}

#[derive(Deserialize)]
struct BordaTournamentSettings {
    a: ParamValue,
    b: ParamValue,
}

fn borda_tournament_cases(seed: &CaseSeed, config: &TestConfig) -> Result<Vec<TestCase>> {
    let settings: BordaTournamentSettings = config.settings(seed.ballot_type)?;
    Ok(vec![TestCase::new(seed, vec![("a".into(), settings.a), ("b".into(), settings.b)])])
}

/// All cases of the suite for `mode`: ballot types × bit widths × candidate counts.
pub fn generate_cases(config: &TestConfig, mode: Mode) -> Result<Vec<TestCase>> {
    let suite = &config.test_suite;
    let mut cases = vec![];
    for &ballot_type in &suite.election_types {
        let generate = case_generator(ballot_type);
        for &bits_votes in &suite.bits_votes {
            for &n_cand in &suite.n_cand {
                let seed = CaseSeed {
                    snark: suite.snark,
                    mode,
                    curve: suite.elliptic_curve.clone(),
                    ballot_type,
                    bits_votes,
                    n_cand,
                };
                cases.extend(generate(&seed, config)?);
            }
        }
    }
    log::debug!("{} suite: {} cases", mode, cases.len());
    Ok(cases)
}

/// Pretty JSON array of `cases`, point lists kept on one line.
pub fn render_suite(cases: &[TestCase]) -> Result<String> {
    let data = Value::Array(cases.iter().map(TestCase::to_json).collect());
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)?;
    let pretty = String::from_utf8(buf)?;
    let collapsed = ORDERED_POINTS_ARRAY.replace_all(&pretty, |caps: &Captures| {
        let items = caps[1].split(',').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>();
        format!("\"orderedPoints\": [{}]", items.join(", "))
    });
    Ok(collapsed.into_owned())
}

/// `testSuite<Mode>.json`
pub fn suite_file_name(mode: Mode) -> String {
    let name = mode.name();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("testSuite{}{}.json", first.to_uppercase(), chars.as_str().to_lowercase()),
        None => "testSuite.json".to_string(),
    }
}
