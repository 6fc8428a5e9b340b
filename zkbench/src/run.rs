use anyhow::{Context, Result};
use circuit_gen::circom::CircuitTemplate;
use circuit_gen::reference::write_reference_script;
use circuit_gen::{BallotType, CircomConfig, Mode, NamedParams, ProofSystem, ScriptCache};
use clap::Args;
use ledger::{FileKey, Indicator, Metrics, ResultLedger};
use std::path::{Path, PathBuf};
use toolchain::{
    find_largest_ptau, Benchmark, CountPolicy, Executor, ShellExecutor, WitnessSource, Workspace,
};

#[derive(Debug, Args)]
pub struct RunOpt {
    /// Input JSON for the witness; the sage reference script is skipped when given
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// groth16, plonk or fflonk
    proof_system: ProofSystem,
    /// voting, encryption or combined
    mode: Mode,
    /// Curve name as listed in the circom config, like twistedEdwards
    curve: String,
    ballot_type: BallotType,
    n_bits: u32,
    /// Ballot parameters as key=value, in template order
    params: Vec<String>,

    #[arg(long, default_value = "circomConfig.json")]
    config: PathBuf,
    #[arg(long, default_value = "../scripts/ptau")]
    ptau_dir: PathBuf,
    /// Root of the per proof system scratch and result directories
    #[arg(long, default_value = ".")]
    results_root: PathBuf,
    /// Extra directories searched for sage modules
    #[arg(long = "sage-root")]
    sage_roots: Vec<PathBuf>,

    /// Keep the generated circom, sage and snarkjs files
    #[arg(long)]
    keep_files: bool,
    /// Record 0 for constraint counts missing from the compiler output
    #[arg(long)]
    lenient_constraints: bool,
    /// Do not check the imports of the generated sage script
    #[arg(long)]
    no_reference_check: bool,
    #[arg(long, default_value = toolchain::NODE_OPTIONS, allow_hyphen_values = true)]
    node_options: String,
}

/// Generated sources of one run.
pub struct Sources {
    pub workspace: Workspace,
    pub prefix: String,
    pub witness: WitnessSource,
}

pub fn run(opt: RunOpt) -> Result<()> {
    let executor = ShellExecutor::new(&opt.node_options);
    run_with(&opt, &executor)
}

/// The whole benchmark with the toolchain commands going through `executor`.
/// Nothing is recorded unless every stage succeeded.
pub fn run_with<E: Executor>(opt: &RunOpt, executor: E) -> Result<()> {
    let params = NamedParams::parse(&opt.params)?;
    let config = CircomConfig::load(&opt.config)
        .with_context(|| format!("loading {}", opt.config.display()))?;
    let ptau = find_largest_ptau(&opt.ptau_dir)?;
    log::info!("using {}", ptau.display());

    let sources = generate_sources(opt, &config, &params)?;
    if !opt.no_reference_check {
        if let WitnessSource::ReferenceScript = sources.witness {
            let script = sources.workspace.sage_dir().join(format!("{}.sage", sources.prefix));
            ScriptCache::new(opt.sage_roots.clone()).verify_script(&script)?;
        }
    }

    let policy = if opt.lenient_constraints { CountPolicy::Lenient } else { CountPolicy::Strict };
    let bench = Benchmark::new(executor, &sources.workspace, opt.proof_system, sources.prefix.as_str(), ptau);
    // on failure the scratch files stay for inspection
    let metrics = bench.run(&sources.witness, policy)?;

    let path = record(&opt.results_root, opt, &params, &metrics)?;
    println!(
        "{} {}",
        ansi_term::Colour::Green.paint("Results written to"),
        path.display()
    );

    if !opt.keep_files {
        sources.workspace.cleanup()?;
    }
    Ok(())
}

/// Write the circom test circuit and, without an input file, the sage
/// reference script.
pub fn generate_sources(opt: &RunOpt, config: &CircomConfig, params: &NamedParams) -> Result<Sources> {
    let template = CircuitTemplate {
        ballot_type: opt.ballot_type,
        mode: opt.mode,
        curve_name: &opt.curve,
        curve: config.curve(&opt.curve)?,
        ballot: config.ballot_type(opt.ballot_type)?,
        n_bits: opt.n_bits,
        params,
    };
    let workspace = Workspace::prepare(&opt.results_root, opt.proof_system, &opt.curve, opt.ballot_type.name())?;
    template.write_to(&workspace.circom_dir())?;
    let prefix = template.file_prefix();

    let witness = match &opt.input {
        Some(input) => WitnessSource::InputFile(input.clone()),
        None => {
            write_reference_script(
                &workspace.sage_dir(),
                &prefix,
                opt.ballot_type,
                &opt.curve,
                opt.n_bits,
                params,
            )?;
            WitnessSource::ReferenceScript
        }
    };
    Ok(Sources { workspace, prefix, witness })
}

/// Upsert the metrics row of this run into its result file.
pub fn record(root: &Path, opt: &RunOpt, params: &NamedParams, metrics: &Metrics) -> Result<PathBuf> {
    let key = FileKey::new(opt.proof_system.name(), opt.curve.as_str(), opt.mode.name(), opt.ballot_type.name());
    let indicator = Indicator::new(opt.n_bits, params.values())?;
    let path = ResultLedger::new(root).upsert(&key, &params.names(), &indicator, metrics)?;
    log::info!("row {} written to {}", indicator, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::cell::RefCell;
    use std::fs;
    use toolchain::ToolchainError;

    /// Stands in for circom/snarkjs: writes the witness and zkey they would
    /// produce and fails any command containing `fail_on`.
    struct FakeToolchain {
        commands: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl FakeToolchain {
        fn new(fail_on: Option<&'static str>) -> Self {
            FakeToolchain { commands: RefCell::new(vec![]), fail_on }
        }
    }

    impl Executor for FakeToolchain {
        fn run(&self, workdir: &Path, command: &str) -> toolchain::Result<String> {
            self.commands.borrow_mut().push(command.to_string());
            if matches!(self.fail_on, Some(word) if command.contains(word)) {
                return Err(ToolchainError::CommandFailed { command: command.to_string(), code: Some(1), output: String::new() });
            }
            let words: Vec<&str> = command.split_whitespace().collect();
            if words[0] == "genCircom.sh" {
                let js = workdir.join(format!("{}_js", words[1].trim_end_matches(".circom")));
                fs::create_dir_all(&js).unwrap();
                fs::write(js.join("witness.wtns"), "").unwrap();
                return Ok("non-linear constraints: 120\nlinear constraints: 30\n".to_string());
            }
            if words[0] == "prepareProof.sh" {
                let prefix = Path::new(words[1]).file_stem().unwrap().to_str().unwrap();
                fs::write(workdir.join(format!("{}.zkey", prefix)), vec![0u8; 512 * 1024]).unwrap();
            }
            Ok(String::new())
        }
    }

    /// Config, ptau directory and results root inside `root`, plus the
    /// matching command line.
    fn scenario(root: &Path, extra: &[&str]) -> RunOpt {
        let config = root.join("circomConfig.json");
        fs::write(&config, CIRCOM_CONFIG).unwrap();
        let ptau_dir = root.join("ptau");
        fs::create_dir_all(&ptau_dir).unwrap();
        fs::write(ptau_dir.join("powersOfTau28_hez_final_10.ptau"), "").unwrap();
        let (config, ptau_dir, results) =
            (config.display().to_string(), ptau_dir.display().to_string(), root.display().to_string());
        let mut args = vec![
            "groth16", "voting", "twistedEdwards", "singleVote", "32", "nVotes=5",
            "--config", &config, "--ptau-dir", &ptau_dir, "--results-root", &results, "--no-reference-check",
        ];
        args.extend_from_slice(extra);
        parse(&args)
    }

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunOpt,
    }

    const CIRCOM_CONFIG: &str = r#"{
        "ellipticCurves": {
            "twistedEdwards": {
                "curve_point_name": "TEPoint",
                "g_name": "g",
                "pk_name": "pk",
                "g_dim": "",
                "pk_dim": "",
                "curve_params_name": "TE_a, TE_d",
                "curve_params_str": "126934, 126930",
                "ballot_entry_dim_for_enc": "[n_digits]",
                "r_entry_dim": "[n_digits]"
            }
        },
        "electionTypes": {
            "singleVote": {"dim": ["nVotes"], "ballot_format": "Array", "has_ranking": false}
        }
    }"#;

    fn parse(args: &[&str]) -> RunOpt {
        TestCli::parse_from(std::iter::once("run").chain(args.iter().copied())).run
    }

    fn metrics() -> Metrics {
        Metrics {
            non_linear_constraints: 120,
            linear_constraints: 30,
            crs_size_mb: 0.512,
            t_prep_ms: 850,
            t_prove_ms: 220,
            t_ver_ms: 15,
        }
    }

    #[test]
    fn test_parse_arguments() {
        let opt = parse(&["-i", "input.json", "plonk", "combined", "twistedEdwards", "singleVote", "8", "nVotes=5"]);
        assert_eq!(opt.input, Some(PathBuf::from("input.json")));
        assert_eq!(opt.proof_system, ProofSystem::Plonk);
        assert_eq!(opt.mode, Mode::Combined);
        assert_eq!(opt.ballot_type, BallotType::SingleVote);
        assert_eq!(opt.params, vec!["nVotes=5"]);
        assert_eq!(opt.node_options, toolchain::NODE_OPTIONS);
        assert!(!opt.keep_files);

        let err = TestCli::try_parse_from(["run", "snark", "voting", "bn128", "singleVote", "8"]).unwrap_err();
        assert!(err.to_string().contains("unknown proof system `snark`"));
    }

    #[test]
    fn test_generate_sources() {
        let root = tempfile::tempdir().unwrap();
        let config_path = root.path().join("circomConfig.json");
        fs::write(&config_path, CIRCOM_CONFIG).unwrap();
        let results = root.path().display().to_string();
        let opt = parse(&["groth16", "voting", "twistedEdwards", "singleVote", "32", "nVotes=5", "--results-root", &results]);
        let config = CircomConfig::load(&config_path).unwrap();
        let params = NamedParams::parse(&opt.params).unwrap();

        let sources = generate_sources(&opt, &config, &params).unwrap();
        assert_eq!(sources.prefix, "singleVote_nBits=32_nVotes=5");
        assert!(matches!(sources.witness, WitnessSource::ReferenceScript));
        let base = root.path().join("groth16/twistedEdwards/singleVote");
        assert!(base.join("circomTestFiles/singleVote_nBits=32_nVotes=5.circom").is_file());
        let sage = fs::read_to_string(base.join("sageTestFiles/singleVote_nBits=32_nVotes=5.sage")).unwrap();
        assert!(sage.ends_with("Ballot.test(SingleVoteBallot, TwistedEdwardsPoint, 32, nVotes=5)\n"));
    }

    #[test]
    fn test_input_file_skips_reference_script() {
        let root = tempfile::tempdir().unwrap();
        let config_path = root.path().join("circomConfig.json");
        fs::write(&config_path, CIRCOM_CONFIG).unwrap();
        let results = root.path().display().to_string();
        let opt = parse(&[
            "--input", "in.json", "fflonk", "voting", "twistedEdwards", "singleVote", "8", "nVotes=2",
            "--results-root", &results,
        ]);
        let config = CircomConfig::load(&config_path).unwrap();
        let params = NamedParams::parse(&opt.params).unwrap();

        let sources = generate_sources(&opt, &config, &params).unwrap();
        assert!(matches!(sources.witness, WitnessSource::InputFile(ref p) if p == Path::new("in.json")));
        assert!(!sources.workspace.sage_dir().exists());
    }

    #[test]
    fn test_failed_stage_records_nothing() {
        let root = tempfile::tempdir().unwrap();
        let opt = scenario(root.path(), &[]);
        let fake = FakeToolchain::new(Some("groth16 prove"));

        let err = run_with(&opt, &fake).unwrap_err();
        assert!(err.to_string().contains("groth16 prove"), "{}", err);

        assert!(!root.path().join("groth16/twistedEdwards/results").exists());
        let base = root.path().join("groth16/twistedEdwards/singleVote");
        assert!(base.join("circomTestFiles").is_dir());
        assert!(base.join("snarkjsTestFiles").is_dir());
        assert!(fake.commands.borrow().iter().all(|c| !c.contains(" verify ")));
    }

    #[test]
    fn test_successful_run_records_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let opt = scenario(root.path(), &[]);
        let fake = FakeToolchain::new(None);

        run_with(&opt, &fake).unwrap();

        let csv = root.path().join("groth16/twistedEdwards/results/voting/singleVote.csv");
        let rows: Vec<String> = fs::read_to_string(csv).unwrap().lines().skip(1).map(String::from).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].starts_with("32;5;120;30;150;0.5;"), "{}", rows[0]);

        let base = root.path().join("groth16/twistedEdwards/singleVote");
        assert!(base.is_dir());
        for dir in ["circomTestFiles", "sageTestFiles", "snarkjsTestFiles"] {
            assert!(!base.join(dir).exists(), "{} left behind", dir);
        }
    }

    #[test]
    fn test_keep_files() {
        let root = tempfile::tempdir().unwrap();
        let opt = scenario(root.path(), &["--keep-files"]);

        run_with(&opt, &FakeToolchain::new(None)).unwrap();

        let base = root.path().join("groth16/twistedEdwards/singleVote");
        assert!(root.path().join("groth16/twistedEdwards/results/voting/singleVote.csv").is_file());
        assert!(base.join("circomTestFiles/singleVote_nBits=32_nVotes=5.circom").is_file());
        assert!(base.join("snarkjsTestFiles/singleVote_nBits=32_nVotes=5.zkey").is_file());
    }

    #[test]
    fn test_record_row() {
        let root = tempfile::tempdir().unwrap();
        let opt = parse(&["groth16", "voting", "twistedEdwards", "singleVote", "10", "nVotes=10"]);
        let params = NamedParams::parse(&opt.params).unwrap();

        let path = record(root.path(), &opt, &params, &metrics()).unwrap();
        assert_eq!(path, root.path().join("groth16/twistedEdwards/results/voting/singleVote.csv"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Number of Bits;nVotes;non-linear constraints;linear constraints;total constraints;\
             CRS size [MB];t_prep [ms];t_prove [ms];t_ver [ms]\n10;10;120;30;150;0.512;850;220;15\n"
        );
    }
}
