//! Service supervisor commands (systemd).

use crate::context::ExecutionContext;
use crate::execute::cmd::{CommandOutput, CommandSpec};

/// States `is-active` reports for a unit that is not running.
const NOT_ACTIVE_STATES: &[&str] = &["inactive", "failed", "unknown"];

/// Transitional states reported with a non-zero exit. The unit has live
/// processes, so these count as active.
const TRANSITIONAL_STATES: &[&str] = &["activating", "deactivating", "reloading", "refreshing"];

pub fn reload(ctx: &ExecutionContext) -> CommandSpec {
  ctx.supervisor().arg("daemon-reload")
}

pub fn start(ctx: &ExecutionContext, unit: &str) -> CommandSpec {
  ctx.supervisor().args(["start", unit])
}

pub fn stop(ctx: &ExecutionContext, unit: &str) -> CommandSpec {
  ctx.supervisor().args(["stop", unit])
}

pub fn is_active(ctx: &ExecutionContext, unit: &str) -> CommandSpec {
  ctx.supervisor().args(["is-active", unit])
}

/// Read an `is-active` result. `None` when the answer is not a unit state.
pub fn parse_is_active(output: &CommandOutput) -> Option<bool> {
  if output.success() {
    return Some(true);
  }
  let state = output.stdout.lines().next().unwrap_or_default().trim();
  if TRANSITIONAL_STATES.contains(&state) {
    Some(true)
  } else {
    NOT_ACTIVE_STATES.contains(&state).then_some(false)
  }
}
