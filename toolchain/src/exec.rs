use crate::errors::{Result, ToolchainError};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Heap limit handed to the node based tools (snarkjs, witness generation).
pub const NODE_OPTIONS: &str = "--max-old-space-size=16384";

/// Runs shell command strings of the external toolchain.
pub trait Executor {
    /// Run `command` in `workdir` and return its stdout followed by its
    /// stderr. A non-zero exit is an error carrying that output.
    fn run(&self, workdir: &Path, command: &str) -> Result<String>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn run(&self, workdir: &Path, command: &str) -> Result<String> {
        (**self).run(workdir, command)
    }
}

/// [`Executor`] backed by `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    envs: Vec<(String, String)>,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        ShellExecutor::new(NODE_OPTIONS)
    }
}

impl ShellExecutor {
    pub fn new(node_options: &str) -> Self {
        ShellExecutor { envs: vec![("NODE_OPTIONS".to_string(), node_options.to_string())] }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn command(&self, workdir: &Path, command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(workdir);
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd
    }

    /// Run `command` with stderr merged into stdout, handing every output
    /// line to `sink` as it arrives. Lines are decoded lossily. Only spawn
    /// and pipe errors are errors; the exit status is returned to the caller.
    pub fn run_streaming(
        &self,
        workdir: &Path,
        command: &str,
        mut sink: impl FnMut(&str),
    ) -> Result<ExitStatus> {
        let spawn_err = |source| ToolchainError::Spawn { command: command.to_string(), source };
        let mut child = self
            .command(workdir, &format!("{{ {}\n}} 2>&1", command))
            .stdout(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;
        let forwarded = match child.stdout.take() {
            Some(stdout) => forward_lines(stdout, &mut sink),
            None => Ok(()),
        };
        // reap the child even when reading its output failed
        let output_err = |source| ToolchainError::Output { command: command.to_string(), source };
        let status = child.wait().map_err(output_err)?;
        forwarded.map_err(output_err)?;
        Ok(status)
    }
}

fn forward_lines(output: impl Read, sink: &mut impl FnMut(&str)) -> std::io::Result<()> {
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        sink(&String::from_utf8_lossy(&buf));
    }
}

impl Executor for ShellExecutor {
    fn run(&self, workdir: &Path, command: &str) -> Result<String> {
        log::info!("executing `{}` in {}", command, workdir.display());
        let output = self
            .command(workdir, command)
            .output()
            .map_err(|source| ToolchainError::Spawn { command: command.to_string(), source })?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if !output.status.success() {
            log::error!("`{}` failed:\n{}", command, text);
            return Err(ToolchainError::CommandFailed {
                command: command.to_string(),
                code: output.status.code(),
                output: text,
            });
        }
        log::debug!("{}", text);
        Ok(text)
    }
}
