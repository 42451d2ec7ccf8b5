//! Status command implementation.
//!
//! Probes whether a pod exists and whether its pod service is active.

use anyhow::{Context, Result};

use podsync_lib::ReconcileConfig;
use podsync_lib::ops::pod_unit;

use crate::output::{print_info, print_json, print_stat, print_success, print_warning};

use super::{reconciler, runtime};

pub fn cmd_status(pod: &str, user: Option<&str>, config: ReconcileConfig, json: bool) -> Result<()> {
  let reconciler = reconciler(config);
  let rt = runtime()?;
  let status = rt
    .block_on(reconciler.status(pod, user))
    .with_context(|| format!("Failed to query pod {}", pod))?;

  if json {
    return print_json(&status);
  }

  match (status.exists, status.active) {
    (true, true) => print_success(&format!("Pod {} is running", status.pod)),
    (true, false) => print_warning(&format!("Pod {} exists but {} is not active", status.pod, pod_unit(pod))),
    (false, true) => print_warning(&format!("Pod {} is missing but {} is active", status.pod, pod_unit(pod))),
    (false, false) => print_info(&format!("Pod {} is absent", status.pod)),
  }
  print_stat("Context", &status.context);
  print_stat("Exists", &status.exists.to_string());
  print_stat("Active", &status.active.to_string());

  Ok(())
}
