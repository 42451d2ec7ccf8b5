//! Plan command implementation.
//!
//! Normalizes the pod and shows the ordered actions with their guards and
//! notifications. Nothing is probed or changed, so no container runtime is
//! needed.

use anyhow::{Context, Result};

use podsync_lib::{Ensure, ReconcileConfig};

use crate::output::{print_json, print_plan};

use super::{SourceArgs, reconciler};

pub fn cmd_plan(source: &SourceArgs, config: ReconcileConfig, absent: bool, json: bool) -> Result<()> {
  let ensure = if absent { Ensure::Absent } else { Ensure::Present };
  let request = source.request(ensure)?;

  let reconciler = reconciler(config);
  let context = reconciler
    .context(request.user.as_deref())
    .context("Failed to resolve execution context")?;
  let plan = reconciler.plan(&request).context("Failed to plan")?;

  if json {
    print_json(&serde_json::json!({
      "pod": plan.pod,
      "ensure": plan.ensure,
      "context": context.key().to_string(),
      "actions": plan.describe(),
    }))?;
  } else {
    print_plan(&plan, &context.key().to_string());
  }

  Ok(())
}
