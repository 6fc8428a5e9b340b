use crate::ballot::{capitalize_first, BallotType};
use crate::config::{BallotTypeConfig, CurveConfig};
use crate::errors::Result;
use crate::params::{digits_for, Mode, NamedParams, BITS_RAND};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

pub const CIRCOM_VERSION: &str = "2.2.1";

/// Location of the circom voting library, relative to `circomTestFiles/`.
const VOTING_LIBRARY: &str = "../../../../../circom/voting";

lazy_static! {
    // the point list can be arbitrarily long, keep it out of file names
    static ref ORDERED_POINTS_SUFFIX: Regex = Regex::new(r",?\s*orderedPoints=\[[^\]]*\]$").unwrap();
}

/// Everything needed to render one benchmark circuit.
pub struct CircuitTemplate<'a> {
    pub ballot_type: BallotType,
    pub mode: Mode,
    pub curve_name: &'a str,
    pub curve: &'a CurveConfig,
    pub ballot: &'a BallotTypeConfig,
    pub n_bits: u32,
    pub params: &'a NamedParams,
}

impl<'a> CircuitTemplate<'a> {
    pub fn n_digits(&self) -> u32 {
        digits_for(self.curve_name, self.n_bits)
    }

    pub fn rand_digits(&self) -> u32 {
        digits_for(self.curve_name, BITS_RAND)
    }

    pub fn file_prefix(&self) -> String {
        file_prefix(self.ballot_type, self.n_bits, self.params)
    }

    pub fn render(&self) -> Result<String> {
        let curve = self.curve;
        let ballot_name = self.ballot_type.pascal_name();
        let dim_array = self.ballot.dim_array();
        let dim_args = self.ballot.dim_args();
        let ranking = self.ballot.ranking()?;
        let param_names = self.params.names().join(",");

        let mut out = String::new();
        writeln!(out, "pragma circom {};", CIRCOM_VERSION)?;
        writeln!(out, "include \"{}/{}.circom\";", VOTING_LIBRARY, self.ballot_type)?;
        writeln!(out)?;
        writeln!(
            out,
            "template assert{}({}) {{",
            ballot_name,
            join_args(&[
                "n_bits",
                "n_digits",
                "rand_digits",
                curve.curve_params_name.as_str(),
                param_names.as_str()
            ])
        )?;

        writeln!(out, "    // Public")?;
        writeln!(out, "    input {}() {}{}; // Generator", curve.curve_point_name, curve.g_name, curve.g_dim)?;
        writeln!(
            out,
            "    input {}() {}{}; // Public key, pk=g^b for some private b",
            curve.curve_point_name, curve.pk_name, curve.pk_dim
        )?;
        writeln!(out)?;
        writeln!(out, "    // g^r and g^v*pk^r values from expElGamal")?;
        writeln!(out, "    input {}() enc_gr{};", curve.curve_point_name, dim_array)?;
        writeln!(out, "    input {}() enc_gv_pkr{};", curve.curve_point_name, dim_array)?;
        writeln!(out)?;
        writeln!(out, "    // Private/Witness")?;
        writeln!(out, "    input signal ballot{};", dim_array)?;
        writeln!(out, "    input signal ballot_for_enc{}{};", dim_array, curve.ballot_entry_dim_for_enc)?;
        writeln!(out, "    input signal r{}{}; // Randomness", dim_array, curve.r_entry_dim)?;
        if let Some(ranking_dim) = ranking {
            writeln!(out, "    input signal ranking{};", ranking_dim)?;
        }

        if self.mode.includes_encryption() {
            writeln!(out)?;
            writeln!(
                out,
                "    component assertEnc = assertEnc{}{}({});",
                self.ballot.ballot_format,
                capitalize_first(self.curve_name),
                join_args(&[
                    dim_args.as_str(),
                    "n_digits",
                    "rand_digits",
                    curve.curve_params_name.as_str()
                ])
            )?;
            writeln!(out, "    assertEnc.v <== ballot_for_enc;")?;
            writeln!(out, "    assertEnc.{0} <== {0};", curve.g_name)?;
            writeln!(out, "    assertEnc.{0} <== {0};", curve.pk_name)?;
            writeln!(out, "    assertEnc.r <== r;")?;
            writeln!(out, "    assertEnc.gr <== enc_gr;")?;
            writeln!(out, "    assertEnc.gv_pkr <== enc_gv_pkr;")?;
        }

        if self.mode.includes_voting() {
            writeln!(out)?;
            writeln!(
                out,
                "    component assertVoting = assert{}Voting({});",
                ballot_name,
                join_args(&["n_bits", param_names.as_str()])
            )?;
            writeln!(out, "    assertVoting.ballot <== ballot;")?;
            if ranking.is_some() {
                writeln!(out, "    assertVoting.ranking <== ranking;")?;
            }
        }
        writeln!(out, "}}")?;
        writeln!(out)?;

        let n_bits = self.n_bits.to_string();
        let n_digits = self.n_digits().to_string();
        let rand_digits = self.rand_digits().to_string();
        let param_values = self.params.values().join(",");
        writeln!(
            out,
            "component main {{public [{}, {}, enc_gr, enc_gv_pkr]}} = assert{}({});",
            curve.g_name,
            curve.pk_name,
            ballot_name,
            join_args(&[
                n_bits.as_str(),
                n_digits.as_str(),
                rand_digits.as_str(),
                curve.curve_params_str.as_str(),
                param_values.as_str()
            ])
        )?;
        Ok(out)
    }

    /// Render into `<dir>/<prefix>.circom`, creating `dir` if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.circom", self.file_prefix()));
        fs::write(&path, self.render()?)?;
        log::info!("circom test file '{}' created", path.display());
        Ok(path)
    }
}

/// `<ballot>_nBits=<n>_<k=v,...>` without a trailing `orderedPoints` entry.
pub fn file_prefix(ballot_type: BallotType, n_bits: u32, params: &NamedParams) -> String {
    let prefix = format!("{}_nBits={}_{}", ballot_type, n_bits, params.join_assignments(","));
    ORDERED_POINTS_SUFFIX.replace(&prefix, "").into_owned()
}

fn join_args(args: &[&str]) -> String {
    args.iter().filter(|a| !a.is_empty()).copied().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample;

    fn template<'a>(
        config: &'a crate::config::CircomConfig,
        ballot_type: BallotType,
        mode: Mode,
        params: &'a NamedParams,
    ) -> CircuitTemplate<'a> {
        CircuitTemplate {
            ballot_type,
            mode,
            curve_name: "twistedEdwards",
            curve: config.curve("twistedEdwards").unwrap(),
            ballot: config.ballot_type(ballot_type).unwrap(),
            n_bits: 32,
            params,
        }
    }

    #[test]
    fn test_file_prefix_strips_point_list() {
        let params = NamedParams::from_pairs([("nCand", "4"), ("nPoints", "3"), ("orderedPoints", "[3,2,1]")]);
        assert_eq!(
            file_prefix(BallotType::PointlistBorda, 16, &params),
            "pointlistBorda_nBits=16_nCand=4,nPoints=3"
        );
        let params = NamedParams::from_pairs([("nVotes", "5")]);
        assert_eq!(file_prefix(BallotType::SingleVote, 8, &params), "singleVote_nBits=8_nVotes=5");
    }

    #[test]
    fn test_voting_mode_has_no_encryption() {
        let config = sample();
        let params = NamedParams::from_pairs([("nVotes", "5")]);
        let src = template(&config, BallotType::SingleVote, Mode::Voting, &params).render().unwrap();

        assert!(src.starts_with("pragma circom 2.2.1;\n"));
        assert!(src.contains("include \"../../../../../circom/voting/singleVote.circom\";"));
        assert!(src.contains("template assertSingleVote(n_bits, n_digits, rand_digits, TE_a, TE_d, nVotes) {"));
        assert!(src.contains("input signal ballot_for_enc[nVotes][n_digits];"));
        assert!(src.contains("component assertVoting = assertSingleVoteVoting(n_bits, nVotes);"));
        assert!(!src.contains("assertEnc"));
        assert!(src.contains(
            "component main {public [g, pk, enc_gr, enc_gv_pkr]} = assertSingleVote(32, 14, 110, 126934, 126930, 5);"
        ));
    }

    #[test]
    fn test_combined_mode_with_ranking() {
        let config = sample();
        let params = NamedParams::from_pairs([("nCand", "3")]);
        let src = template(&config, BallotType::Condorcet, Mode::Combined, &params).render().unwrap();

        assert!(src.contains("input signal ranking[nCand];"));
        assert!(src.contains(
            "component assertEnc = assertEncMatrixTwistedEdwards(nCand,nCand, n_digits, rand_digits, TE_a, TE_d);"
        ));
        assert!(src.contains("assertVoting.ranking <== ranking;"));
        let enc = src.find("assertEnc =").unwrap();
        let voting = src.find("assertVoting =").unwrap();
        assert!(enc < voting);
    }

    #[test]
    fn test_encryption_mode_skips_voting() {
        let config = sample();
        let params = NamedParams::from_pairs([("nCand", "3")]);
        let src = template(&config, BallotType::Condorcet, Mode::Encryption, &params).render().unwrap();
        assert!(src.contains("assertEnc.gv_pkr <== enc_gv_pkr;"));
        assert!(!src.contains("assertVoting"));
    }

    #[test]
    fn test_write_to_dir() {
        let config = sample();
        let params = NamedParams::from_pairs([("nVotes", "2")]);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("circomTestFiles");
        let path = template(&config, BallotType::SingleVote, Mode::Voting, &params).write_to(&out).unwrap();
        assert_eq!(path, out.join("singleVote_nBits=32_nVotes=2.circom"));
        assert!(fs::read_to_string(path).unwrap().contains("assertSingleVote"));
    }
}
