// src/tool/mod.rs

//! External tool invocation
//!
//! Runs the dependency analyzer and the compiler as blocking child
//! processes. Stdout and stderr are drained on their own threads (a chatty
//! analyzer would otherwise fill the pipe and stall) and concatenated,
//! stdout first. The exit status is reported but callers classify outcomes
//! from the text: the analyzer exits 0 on several failures.

use crate::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// A command line to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program name or path
    pub program: String,
    /// Arguments in order
    pub args: Vec<OsString>,
    /// Working directory, if not inherited
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run in the given directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Position of an argument, if present
    pub fn arg_position(&self, arg: &str) -> Option<usize> {
        self.args.iter().position(|a| a == arg)
    }

    /// Value following a flag, if present
    pub fn flag_value(&self, flag: &str) -> Option<&OsStr> {
        self.arg_position(flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// Printable command line for logs
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Outcome of one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocationResult {
    /// Exit code; `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Stdout followed by stderr
    pub output: String,
}

impl ToolInvocationResult {
    pub fn new(exit_code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    /// Whether the tool reported a zero exit status (advisory only)
    pub fn exited_cleanly(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external tools
///
/// The engine only ever talks to tools through this trait, so tests can
/// script analyzer and compiler behaviour without a JDK.
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolInvocationResult>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, command: &ToolCommand) -> Result<ToolInvocationResult> {
        (**self).run(command)
    }
}

/// Runs tools as child processes with a bounded wait
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn locate(program: &str) -> Result<PathBuf> {
        if program.contains(std::path::is_separator) {
            let path = Path::new(program);
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(Error::ToolNotFound(program.to_string()));
        }
        which::which(program).map_err(|_| Error::ToolNotFound(program.to_string()))
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            warn!("Failed to read tool output: {}", e);
        }
        buf
    })
}

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolInvocationResult> {
        let program = Self::locate(&command.program)?;
        debug!("Running: {}", command.display());

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ToolNotFound(command.program.clone()),
            _ => Error::Io(e),
        })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                warn!(
                    "{} did not finish within {} seconds, killed",
                    command.program,
                    self.timeout.as_secs()
                );
                return Err(Error::ToolTimeout {
                    tool: command.program.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        let mut combined = Vec::new();
        for handle in [stdout, stderr].into_iter().flatten() {
            match handle.join() {
                Ok(bytes) => combined.extend_from_slice(&bytes),
                Err(_) => warn!("Output reader thread for {} panicked", command.program),
            }
        }

        let output = String::from_utf8_lossy(&combined).into_owned();
        for line in output.lines() {
            debug!("[{}] {}", command.program, line);
        }
        debug!("{} exited with {:?}", command.program, status.code());

        Ok(ToolInvocationResult::new(status.code(), output))
    }
}
