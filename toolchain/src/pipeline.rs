use crate::constraints::{ConstraintCounts, CountPolicy};
use crate::errors::{Result, ToolchainError};
use crate::exec::Executor;
use circuit_gen::ProofSystem;
use ledger::Metrics;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const CIRCOM_DIR: &str = "circomTestFiles";
pub const SAGE_DIR: &str = "sageTestFiles";
pub const SNARKJS_DIR: &str = "snarkjsTestFiles";

const COMPILE_SCRIPT: &str = "genCircom.sh";
const GROTH16_SETUP_SCRIPT: &str = "prepareProof.sh";
const PROOF_FILE: &str = "proof.json";
const PUBLIC_FILE: &str = "public.json";

/// Scratch directories of one (proof system, curve, ballot type) scenario.
#[derive(Debug, Clone)]
pub struct Workspace {
    base: PathBuf,
}

impl Workspace {
    /// `<root>/<proof_system>/<curve>/<ballot_type>`, created if missing.
    pub fn prepare(root: &Path, proof_system: ProofSystem, curve: &str, ballot_type: &str) -> Result<Self> {
        let base = root.join(proof_system.name()).join(curve).join(ballot_type);
        fs::create_dir_all(&base)?;
        Ok(Workspace { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn circom_dir(&self) -> PathBuf {
        self.base.join(CIRCOM_DIR)
    }

    pub fn sage_dir(&self) -> PathBuf {
        self.base.join(SAGE_DIR)
    }

    pub fn snarkjs_dir(&self) -> PathBuf {
        self.base.join(SNARKJS_DIR)
    }

    /// Remove the scratch directories. Result files live elsewhere and are kept.
    pub fn cleanup(&self) -> Result<()> {
        for dir in [self.circom_dir(), self.sage_dir(), self.snarkjs_dir()] {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        log::info!("cleanup of {} complete", self.base.display());
        Ok(())
    }
}

/// Where the witness inputs come from.
#[derive(Debug, Clone)]
pub enum WitnessSource {
    /// The generated sage script `sageTestFiles/<prefix>.sage`.
    ReferenceScript,
    /// A prepared input JSON file.
    InputFile(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupReport {
    pub t_prep_ms: u64,
    pub crs_size_mb: f64,
}

/// Drives compile, setup, prove and verify for one generated circuit.
pub struct Benchmark<'a, E: Executor> {
    executor: E,
    workspace: &'a Workspace,
    proof_system: ProofSystem,
    prefix: String,
    ptau: PathBuf,
}

impl<'a, E: Executor> Benchmark<'a, E> {
    pub fn new(
        executor: E,
        workspace: &'a Workspace,
        proof_system: ProofSystem,
        prefix: impl Into<String>,
        ptau: impl Into<PathBuf>,
    ) -> Self {
        Benchmark { executor, workspace, proof_system, prefix: prefix.into(), ptau: ptau.into() }
    }

    pub fn zkey_path(&self) -> PathBuf {
        self.workspace.snarkjs_dir().join(format!("{}.zkey", self.prefix))
    }

    pub fn witness_path(&self) -> PathBuf {
        self.workspace.circom_dir().join(format!("{}_js", self.prefix)).join("witness.wtns")
    }

    /// Compile the circuit and compute its witness.
    pub fn compile(&self, source: &WitnessSource, policy: CountPolicy) -> Result<ConstraintCounts> {
        let input = match source {
            WitnessSource::ReferenceScript => format!("../{}/{}.sage", SAGE_DIR, self.prefix),
            WitnessSource::InputFile(path) => absolute(path)?.display().to_string(),
        };
        let output = self.executor.run(
            &self.workspace.circom_dir(),
            &format!(
                "{} {}.circom {} {}",
                COMPILE_SCRIPT,
                self.prefix,
                input,
                self.proof_system.optimization_level()
            ),
        )?;
        let counts = ConstraintCounts::parse(&output, policy)?;

        let witness = self.witness_path();
        if !witness.exists() {
            return Err(ToolchainError::MissingArtifact(witness));
        }
        log::info!(
            "witness generated ({} non-linear, {} linear constraints)",
            counts.non_linear,
            counts.linear
        );
        Ok(counts)
    }

    /// Circuit specific setup and verification key export.
    pub fn setup(&self) -> Result<SetupReport> {
        let dir = self.workspace.snarkjs_dir();
        fs::create_dir_all(&dir)?;
        let r1cs = format!("../{}/{}.r1cs", CIRCOM_DIR, self.prefix);
        let ptau = absolute(&self.ptau)?;

        let start = Instant::now();
        let setup = match self.proof_system {
            ProofSystem::Groth16 => format!("{} {} {}", GROTH16_SETUP_SCRIPT, r1cs, ptau.display()),
            ProofSystem::Plonk | ProofSystem::Fflonk => format!(
                "snarkjs {} setup {} {} {}.zkey",
                self.proof_system,
                r1cs,
                ptau.display(),
                self.prefix
            ),
        };
        self.executor.run(&dir, &setup)?;
        self.executor.run(
            &dir,
            &format!(
                "snarkjs zkey export verificationkey {0}.zkey {0}_verification_key.json",
                self.prefix
            ),
        )?;
        let t_prep_ms = elapsed_ms(start);

        let zkey = self.zkey_path();
        let size = fs::metadata(&zkey).map_err(|_| ToolchainError::MissingArtifact(zkey.clone()))?.len();
        let crs_size_mb = size as f64 / (1024.0 * 1024.0);
        log::info!("zkey file ({:.6} MB) generated in {} ms", crs_size_mb, t_prep_ms);
        Ok(SetupReport { t_prep_ms, crs_size_mb })
    }

    pub fn prove(&self) -> Result<u64> {
        let start = Instant::now();
        self.executor.run(
            &self.workspace.snarkjs_dir(),
            &format!(
                "snarkjs {} prove {}.zkey ../{}/{}_js/witness.wtns {} {}",
                self.proof_system, self.prefix, CIRCOM_DIR, self.prefix, PROOF_FILE, PUBLIC_FILE
            ),
        )?;
        let t_prove_ms = elapsed_ms(start);
        log::info!("proof generated in {} ms", t_prove_ms);
        Ok(t_prove_ms)
    }

    pub fn verify(&self) -> Result<u64> {
        let start = Instant::now();
        let output = self.executor.run(
            &self.workspace.snarkjs_dir(),
            &format!(
                "snarkjs {} verify {}_verification_key.json {} {}",
                self.proof_system, self.prefix, PUBLIC_FILE, PROOF_FILE
            ),
        )?;
        let t_ver_ms = elapsed_ms(start);
        if output.contains("Invalid proof") {
            return Err(ToolchainError::VerificationFailed(output));
        }
        log::info!("verification completed in {} ms", t_ver_ms);
        Ok(t_ver_ms)
    }

    /// All four stages in order. Any failure aborts before later stages run.
    pub fn run(&self, source: &WitnessSource, policy: CountPolicy) -> Result<Metrics> {
        let counts = self.compile(source, policy)?;
        let setup = self.setup()?;
        let t_prove_ms = self.prove()?;
        let t_ver_ms = self.verify()?;
        Ok(Metrics {
            non_linear_constraints: counts.non_linear,
            linear_constraints: counts.linear,
            crs_size_mb: setup.crs_size_mb,
            t_prep_ms: setup.t_prep_ms,
            t_prove_ms,
            t_ver_ms,
        })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Commands run in the scenario subdirectories, so paths from the caller's
/// working directory are made absolute first.
fn absolute(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|_| ToolchainError::MissingArtifact(path.to_path_buf()))
}
