//! Observed-state queries.
//!
//! Probes are read-only and never cached: guards call them right before the
//! action they protect, so effects of earlier actions in the same pass are
//! visible. A probe that cannot give a clean yes/no answer is an error, never
//! a default.

use std::io;

use thiserror::Error;
use tracing::debug;

use crate::context::{DependencyError, ExecutionContext};
use crate::execute::cmd::{CommandOutput, CommandRunner, CommandSpec};
use crate::ops::{runtime, supervisor};

/// A probe could not determine the observed state.
#[derive(Debug, Error)]
pub enum ProbeError {
  #[error("probe {cmd} could not run: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  #[error("probe {cmd} was inconclusive (exit code {code:?}): {output}")]
  Inconclusive {
    cmd: String,
    code: Option<i32>,
    output: String,
  },
}

/// Queries observed state through a runner within one context.
pub struct StateProber<'a, R> {
  runner: &'a R,
  ctx: &'a ExecutionContext,
}

impl<'a, R: CommandRunner> StateProber<'a, R> {
  pub fn new(runner: &'a R, ctx: &'a ExecutionContext) -> Self {
    Self { runner, ctx }
  }

  /// Whether the runtime knows a pod called `pod`.
  pub async fn pod_exists(&self, pod: &str) -> Result<bool, ProbeError> {
    let cmd = runtime::pod_exists(self.ctx, pod);
    let output = self.run(&cmd).await?;

    let exists = match output.code {
      Some(0) => true,
      Some(runtime::POD_NOT_FOUND) => false,
      code => {
        return Err(ProbeError::Inconclusive {
          cmd: cmd.command_line(),
          code,
          output: output.stderr,
        });
      }
    };

    debug!(pod = %pod, exists, "probed pod existence");
    Ok(exists)
  }

  /// Whether the supervisor reports `unit` as active.
  pub async fn service_active(&self, unit: &str) -> Result<bool, ProbeError> {
    let cmd = supervisor::is_active(self.ctx, unit);
    let output = self.run(&cmd).await?;

    let active = supervisor::parse_is_active(&output).ok_or_else(|| ProbeError::Inconclusive {
      cmd: cmd.command_line(),
      code: output.code,
      output: if output.stderr.is_empty() {
        output.stdout.clone()
      } else {
        output.stderr.clone()
      },
    })?;

    debug!(unit = %unit, active, "probed service state");
    Ok(active)
  }

  /// Precondition: the runtime is installed and answers.
  pub async fn runtime_available(&self) -> Result<(), DependencyError> {
    let cmd = runtime::version(self.ctx);
    let output = self
      .runner
      .run(&cmd)
      .await
      .map_err(|source| DependencyError::RuntimeMissing {
        program: cmd.program.clone(),
        source,
      })?;

    if !output.success() {
      return Err(DependencyError::RuntimeUnusable {
        program: cmd.program,
        code: output.code,
      });
    }

    debug!(version = %output.stdout, "container runtime available");
    Ok(())
  }

  async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ProbeError> {
    self.runner.run(cmd).await.map_err(|source| ProbeError::Spawn {
      cmd: cmd.command_line(),
      source,
    })
  }
}
