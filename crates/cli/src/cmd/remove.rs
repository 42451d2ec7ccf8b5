//! Implementation of the `podsync remove` command.

use anyhow::Result;

use podsync_lib::{Ensure, ReconcileConfig};

use super::{SourceArgs, converge};

/// Stop the pod service, delete its unit files, reload the supervisor and
/// remove the pod.
pub fn cmd_remove(source: &SourceArgs, config: ReconcileConfig, json: bool) -> Result<()> {
  converge(source, config, Ensure::Absent, json)
}
