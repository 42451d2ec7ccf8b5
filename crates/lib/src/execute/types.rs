//! Outcome and error types of plan execution.

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::persist::PersistError;
use crate::plan::{ActionId, Ensure};
use crate::probe::ProbeError;

/// Why an effecting step failed.
#[derive(Debug, Error)]
pub enum ActionFailure {
  #[error("command failed with exit code {code:?}: {cmd}{}", stderr_suffix(.stderr))]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("command could not run: {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Persist(#[from] PersistError),
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!(" ({})", stderr)
  }
}

/// An action ran and failed.
#[derive(Debug, Error)]
#[error("action {action} failed for pod {pod}: {source}")]
pub struct ActionError {
  pub action: ActionId,
  pub pod: String,
  #[source]
  pub source: ActionFailure,
}

/// What stopped a pass.
#[derive(Debug, Error)]
pub enum PassFailure {
  /// A guard's probe was inconclusive; the action was never attempted.
  #[error("guard of {action} for pod {pod} could not be evaluated: {source}")]
  Probe {
    action: ActionId,
    pod: String,
    #[source]
    source: ProbeError,
  },

  #[error(transparent)]
  Action(#[from] ActionError),
}

impl PassFailure {
  pub fn action(&self) -> &ActionId {
    match self {
      PassFailure::Probe { action, .. } => action,
      PassFailure::Action(err) => &err.action,
    }
  }
}

/// Why an action did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  /// Trigger-only and nothing notified it.
  NotTriggered,
  PodExists,
  PodMissing,
  ServiceActive,
  ServiceInactive,
  /// Persisted content already matches.
  UpToDate,
}

/// Result of one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  Ran { changed: bool },
  Skipped { reason: SkipReason },
  Failed,
}

/// One entry of the pass trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
  pub action: ActionId,
  #[serde(flatten)]
  pub outcome: Outcome,
}

/// Everything attempted in one convergence pass.
///
/// Actions after a failure are neither run nor recorded.
#[derive(Debug, Serialize)]
pub struct PassReport {
  pub pod: String,
  pub ensure: Ensure,
  pub context: String,
  pub actions: Vec<ActionRecord>,
  #[serde(skip)]
  pub failure: Option<PassFailure>,
}

impl PassReport {
  pub fn new(pod: impl Into<String>, ensure: Ensure, context: impl Into<String>) -> Self {
    Self {
      pod: pod.into(),
      ensure,
      context: context.into(),
      actions: Vec::new(),
      failure: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.failure.is_none()
  }

  /// Actions that ran, in order.
  pub fn ran(&self) -> Vec<&ActionId> {
    self.filter(|o| matches!(o, Outcome::Ran { .. }))
  }

  /// Actions that ran and changed something.
  pub fn changed(&self) -> Vec<&ActionId> {
    self.filter(|o| matches!(o, Outcome::Ran { changed: true }))
  }

  pub fn skipped(&self) -> Vec<&ActionId> {
    self.filter(|o| matches!(o, Outcome::Skipped { .. }))
  }

  pub fn failed(&self) -> Vec<&ActionId> {
    self.filter(|o| matches!(o, Outcome::Failed))
  }

  pub fn outcome_of(&self, action: &ActionId) -> Option<Outcome> {
    self.actions.iter().find(|r| &r.action == action).map(|r| r.outcome)
  }

  pub(crate) fn record(&mut self, action: ActionId, outcome: Outcome) {
    self.actions.push(ActionRecord { action, outcome });
  }

  fn filter(&self, pred: impl Fn(&Outcome) -> bool) -> Vec<&ActionId> {
    self.actions.iter().filter(|r| pred(&r.outcome)).map(|r| &r.action).collect()
  }
}
