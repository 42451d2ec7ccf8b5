//! External command capability.
//!
//! Every probe and effecting step is a [`CommandSpec`] handed to a
//! [`CommandRunner`]. A [`CommandSpec`] carries the full execution parameters
//! (environment overlay, working directory, acting identity) so the runner
//! itself holds no context. [`ProcessRunner`] spawns real processes; tests
//! substitute a scripted runner.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Numeric identity a command runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Acting {
  pub uid: u32,
  pub gid: u32,
}

/// A fully parameterized command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  /// Variables added on top of the inherited environment.
  pub env: BTreeMap<String, String>,
  pub cwd: Option<PathBuf>,
  /// Identity to switch to before exec. `None` runs as the caller.
  pub acting: Option<Acting>,
}

impl CommandSpec {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  /// Program and arguments as a single line, for logs and error messages.
  pub fn command_line(&self) -> String {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for CommandSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command_line())
  }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
  /// Exit code, `None` when terminated by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Runs commands to completion.
///
/// `Err` means the command could not be run at all. A command that ran and
/// exited non-zero is an `Ok` output; interpreting its code is the caller's job.
pub trait CommandRunner {
  fn run(&self, spec: &CommandSpec) -> impl Future<Output = io::Result<CommandOutput>> + Send;
}

/// Spawns commands as host processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
  async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
    debug!(cmd = %spec, cwd = ?spec.cwd, acting = ?spec.acting, "spawning process");

    let mut command = Command::new(&spec.program);
    command
      .args(&spec.args)
      .envs(&spec.env)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    if let Some(cwd) = &spec.cwd {
      command.current_dir(cwd);
    }

    #[cfg(unix)]
    if let Some(acting) = spec.acting {
      command.uid(acting.uid).gid(acting.gid);
    }

    let output = command.output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }

    Ok(CommandOutput {
      code: output.status.code(),
      stdout,
      stderr,
    })
  }
}
