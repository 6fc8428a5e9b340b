use clap::{Parser, Subcommand};
use std::time::Instant;

mod run;
mod suite;

use run::RunOpt;
use suite::{ExecSuiteOpt, SuiteOpt};

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate, compile, set up, prove and verify one circuit and record its metrics
    #[command(name = "run")]
    Run(RunOpt),
    /// Write testSuite<Mode>.json files from a test configuration
    #[command(name = "suite")]
    Suite(SuiteOpt),
    /// Execute every command of a suite file, logging the output
    #[command(name = "exec-suite")]
    ExecSuite(ExecSuiteOpt),
}

#[derive(Debug, Parser)]
#[command(version, about = "zk voting circuit benchmarks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let args = Cli::parse();
    env_logger::init();
    let start = Instant::now();
    let exec_result = match args.command {
        Command::Run(opt) => run::run(opt),
        Command::Suite(opt) => suite::generate(opt),
        Command::ExecSuite(opt) => suite::execute(opt),
    };
    match exec_result {
        Err(x) => {
            eprintln!("execute error: {:#}", x);
            std::process::exit(1);
        }
        _ => println!("time cost: {}", start.elapsed().as_secs_f64()),
    };
}
