use anyhow::{anyhow, bail, Context, Result};
use circuit_gen::suite::{generate_cases, render_suite, suite_file_name, TestConfig};
use clap::Args;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use toolchain::ShellExecutor;

const SEPARATOR_WIDTH: usize = 100;

#[derive(Debug, Args)]
pub struct SuiteOpt {
    #[arg(short, long, default_value = "testConfig.json")]
    config: PathBuf,
    /// Directory receiving the testSuite<Mode>.json files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExecSuiteOpt {
    /// Suite file, a JSON array of objects carrying a `command`
    suite: PathBuf,
    #[arg(short, long, default_value = "benchmark.log")]
    log: PathBuf,
    /// Working directory of the commands
    #[arg(long, default_value = ".")]
    workdir: PathBuf,
    #[arg(long, default_value = toolchain::NODE_OPTIONS, allow_hyphen_values = true)]
    node_options: String,
}

pub fn generate(opt: SuiteOpt) -> Result<()> {
    let config = TestConfig::load(&opt.config).with_context(|| format!("loading {}", opt.config.display()))?;
    fs::create_dir_all(&opt.out_dir)?;
    for &mode in &config.test_suite.test_circuits {
        let cases = generate_cases(&config, mode)?;
        let path = opt.out_dir.join(suite_file_name(mode));
        fs::write(&path, render_suite(&cases)?)?;
        log::info!("{} test cases written to {}", cases.len(), path.display());
    }
    Ok(())
}

/// `command` of every suite entry; an entry without one rejects the whole file.
pub fn suite_commands(path: &Path) -> Result<Vec<String>> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<Value> = serde_json::from_str(&data)?;
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .get("command")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("test {} does not contain a command", i))
        })
        .collect()
}

pub fn execute(opt: ExecSuiteOpt) -> Result<()> {
    let commands = suite_commands(&opt.suite)?;
    let executor = ShellExecutor::new(&opt.node_options);
    let mut log_file = LineWriter::new(File::create(&opt.log)?);
    let separator = "=".repeat(SEPARATOR_WIDTH);

    let mut failed = vec![];
    for command in &commands {
        writeln!(log_file, "\n{}", separator)?;
        println!("\n{}", separator);
        writeln!(log_file, "Executing: {}\n", command)?;
        println!("Executing: {}\n", command);

        let mut write_err = None;
        let status = executor.run_streaming(&opt.workdir, command, |line| {
            println!("{}", line);
            if let Err(e) = writeln!(log_file, "{}", line) {
                if write_err.is_none() {
                    write_err = Some(e);
                }
            }
        })?;
        if let Some(e) = write_err {
            return Err(e).with_context(|| format!("writing {}", opt.log.display()));
        }
        if !status.success() {
            log::warn!("`{}` exited with {}", command, status);
            failed.push(command.clone());
        }
    }
    log_file.flush()?;

    if !failed.is_empty() {
        bail!("{} of {} commands failed:\n{}", failed.len(), commands.len(), failed.join("\n"));
    }
    Ok(())
}
