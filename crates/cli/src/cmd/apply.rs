//! Implementation of the `podsync apply` command.
//!
//! Converges a pod to present: persisted, created or replaced, unit files
//! generated and the pod service started.

use anyhow::Result;

use podsync_lib::{Ensure, ReconcileConfig};

use super::{SourceArgs, converge};

pub fn cmd_apply(source: &SourceArgs, config: ReconcileConfig, json: bool) -> Result<()> {
  converge(source, config, Ensure::Present, json)
}
