//! Plan execution.
//!
//! Walks a [`Plan`] in order. For each action:
//! - trigger-only actions nobody notified are skipped, unless their pending
//!   state is due
//! - the guard is probed against live state
//! - the step runs, and a change notifies the action's targets
//! - leftover files are deleted after the step, or after a guard skip
//!
//! The first failure halts the pass. Nothing is rolled back.

pub mod cmd;
pub mod types;

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use tracing::{debug, error, info, warn};

use crate::context::ExecutionContext;
use crate::ops::{runtime, supervisor};
use crate::persist;
use crate::plan::{Action, Guard, Plan, Step};
use crate::probe::{ProbeError, StateProber};

use cmd::{CommandRunner, CommandSpec};

pub use types::{ActionError, ActionFailure, ActionRecord, Outcome, PassFailure, PassReport, SkipReason};

/// Execute `plan` within `ctx`, returning the trace of the pass.
///
/// A failed pass is reported through [`PassReport::failure`]; the entries
/// recorded up to and including the failed action are kept.
pub async fn execute_plan<R: CommandRunner>(plan: &Plan, ctx: &ExecutionContext, runner: &R) -> PassReport {
  info!(pod = %plan.pod, ensure = %plan.ensure, context = %ctx.key(), "starting pass");

  let prober = StateProber::new(runner, ctx);
  let graph = plan.graph();
  let mut report = PassReport::new(&plan.pod, plan.ensure, ctx.key().to_string());
  let mut triggered: HashSet<NodeIndex> = HashSet::new();

  for &idx in plan.order() {
    let action = graph.action(idx);

    if action.trigger_only && !triggered.contains(&idx) {
      match action.pending.as_ref().filter(|p| p.is_due()) {
        Some(pending) => info!(action = %action.id, %pending, "running untriggered action left pending"),
        None => {
          debug!(action = %action.id, "not triggered");
          report.record(action.id.clone(), Outcome::Skipped {
            reason: SkipReason::NotTriggered,
          });
          continue;
        }
      }
    }

    match check_guard(action, &prober).await {
      Ok(Some(reason)) => {
        debug!(action = %action.id, ?reason, "guard skipped action");
        if let Err(source) = remove_leftovers(action) {
          fail(&mut report, action, &plan.pod, source.into());
          break;
        }
        report.record(action.id.clone(), Outcome::Skipped { reason });
        continue;
      }
      Ok(None) => {}
      Err(source) => {
        error!(action = %action.id, error = %source, "guard probe failed");
        report.failure = Some(PassFailure::Probe {
          action: action.id.clone(),
          pod: plan.pod.clone(),
          source,
        });
        break;
      }
    }

    info!(action = %action.id, step = %action.describe_step(), "running action");
    let result = match run_step(&action.step, ctx, runner).await {
      Ok(changed) => remove_leftovers(action).map(|_| changed).map_err(ActionFailure::from),
      Err(source) => Err(source),
    };
    match result {
      Ok(changed) => {
        report.record(action.id.clone(), Outcome::Ran { changed });
        if changed {
          triggered.extend(graph.notify_targets(idx));
        }
      }
      Err(source) => {
        fail(&mut report, action, &plan.pod, source);
        break;
      }
    }
  }

  info!(
    pod = %plan.pod,
    ran = report.ran().len(),
    skipped = report.skipped().len(),
    success = report.is_success(),
    "pass complete"
  );
  report
}

fn fail(report: &mut PassReport, action: &Action, pod: &str, source: ActionFailure) {
  error!(action = %action.id, error = %source, "action failed");
  report.record(action.id.clone(), Outcome::Failed);
  report.failure = Some(PassFailure::Action(ActionError {
    action: action.id.clone(),
    pod: pod.to_string(),
    source,
  }));
}

fn remove_leftovers(action: &Action) -> Result<(), persist::PersistError> {
  for path in &action.leftovers {
    if persist::remove_file(path)? {
      debug!(action = %action.id, path = %path.display(), "removed leftover file");
    }
  }
  Ok(())
}

/// `Some(reason)` when the guard says to skip.
async fn check_guard<R: CommandRunner>(
  action: &Action,
  prober: &StateProber<'_, R>,
) -> Result<Option<SkipReason>, ProbeError> {
  let skip = match &action.guard {
    Guard::None => None,
    Guard::PodExists { pod, expect } => {
      let exists = prober.pod_exists(pod).await?;
      match (exists, *expect) {
        (true, false) => Some(SkipReason::PodExists),
        (false, true) => Some(SkipReason::PodMissing),
        _ => None,
      }
    }
    Guard::ServiceActive { unit, expect } => {
      let active = prober.service_active(unit).await?;
      match (active, *expect) {
        (true, false) => Some(SkipReason::ServiceActive),
        (false, true) => Some(SkipReason::ServiceInactive),
        _ => None,
      }
    }
    Guard::ContentDiffers => match &action.step {
      // An unreadable file counts as differing; the write reports the real error.
      Step::Persist { path, content, .. } => persist::content_matches(path, content.as_bytes())
        .unwrap_or(false)
        .then_some(SkipReason::UpToDate),
      _ => None,
    },
  };
  Ok(skip)
}

/// Run one step, returning whether it changed anything.
async fn run_step<R: CommandRunner>(step: &Step, ctx: &ExecutionContext, runner: &R) -> Result<bool, ActionFailure> {
  match step {
    Step::Persist {
      path,
      content,
      marker,
      file,
      dir,
    } => {
      if let Some(parent) = path.parent() {
        persist::ensure_directory(parent, *dir)?;
      }
      if let Some(marker) = marker {
        persist::write_file(marker, b"", *file)?;
      }
      Ok(persist::write_file(path, content.as_bytes(), *file)?)
    }
    Step::Command(cmd) => {
      run_checked(runner, cmd).await?;
      Ok(true)
    }
    Step::GenerateUnits { cmd, dir, placement } => {
      persist::ensure_directory(dir, *placement)?;
      run_checked(runner, cmd).await?;
      Ok(true)
    }
    Step::Reload => {
      let reload = ctx.reload();
      let _slot = reload.acquire().await;
      run_checked(runner, &supervisor::reload(ctx)).await?;
      reload.record_reload();
      debug!(context = %reload.key(), reloads = reload.reload_count(), "supervisor reloaded");
      Ok(true)
    }
    Step::RemoveFile { path } => Ok(persist::remove_file(path)?),
    Step::RemovePod { pod, manifest } => {
      let cmd = match manifest.as_deref() {
        Some(path) if path.exists() => runtime::teardown(ctx, path),
        Some(path) => {
          warn!(pod = %pod, path = %path.display(), "no persisted manifest, removing pod by name");
          runtime::remove_pod(ctx, pod)
        }
        None => runtime::remove_pod(ctx, pod),
      };
      run_checked(runner, &cmd).await?;
      Ok(true)
    }
  }
}

async fn run_checked<R: CommandRunner>(runner: &R, cmd: &CommandSpec) -> Result<(), ActionFailure> {
  let output = runner.run(cmd).await.map_err(|source| ActionFailure::Spawn {
    cmd: cmd.command_line(),
    source,
  })?;

  if !output.success() {
    return Err(ActionFailure::CmdFailed {
      cmd: cmd.command_line(),
      code: output.code,
      stderr: output.stderr,
    });
  }
  Ok(())
}
