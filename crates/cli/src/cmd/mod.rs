mod apply;
mod plan;
mod remove;
mod status;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Map, Value};
use tracing::debug;

use podsync_lib::context::SystemIdentities;
use podsync_lib::manifest::PodFlags;
use podsync_lib::{DesiredSource, Ensure, PodRequest, ProcessRunner, ReconcileConfig, Reconciler};

use crate::output;

pub use apply::cmd_apply;
pub use plan::cmd_plan;
pub use remove::cmd_remove;
pub use status::cmd_status;

/// Overrides for the reconciler's programs and system-mode directories.
#[derive(Debug, Args)]
pub struct ConfigArgs {
  /// Container runtime binary
  #[arg(long, global = true, env = "PODSYNC_RUNTIME", value_name = "PROGRAM")]
  runtime: Option<String>,

  /// Service supervisor binary
  #[arg(long, global = true, env = "PODSYNC_SUPERVISOR", value_name = "PROGRAM")]
  supervisor: Option<String>,

  /// Directory for persisted manifests in system mode
  #[arg(long, global = true, env = "PODSYNC_MANIFEST_DIR", value_name = "DIR")]
  manifest_dir: Option<PathBuf>,

  /// Unit directory in system mode
  #[arg(long, global = true, env = "PODSYNC_UNIT_DIR", value_name = "DIR")]
  unit_dir: Option<PathBuf>,
}

impl ConfigArgs {
  pub fn build(&self) -> ReconcileConfig {
    let mut config = ReconcileConfig::default();
    if let Some(runtime) = &self.runtime {
      config.runtime_program = runtime.clone();
    }
    if let Some(supervisor) = &self.supervisor {
      config.supervisor_program = supervisor.clone();
    }
    if let Some(dir) = &self.manifest_dir {
      config.system_manifest_dir = dir.clone();
    }
    if let Some(dir) = &self.unit_dir {
      config.system_unit_dir = dir.clone();
    }
    config
  }
}

/// The desired pod: a manifest file, or a name with runtime flags.
#[derive(Debug, Args)]
pub struct SourceArgs {
  /// Pod manifest (YAML or JSON)
  #[arg(long, value_name = "FILE", conflicts_with = "name")]
  manifest: Option<PathBuf>,

  /// Name of an empty pod created from flags
  #[arg(long, value_name = "ID", required_unless_present = "manifest")]
  name: Option<String>,

  /// Runtime flag for `pod create`; repeat for lists, omit the value for a switch
  #[arg(long = "flag", value_name = "KEY=VALUE", requires = "name")]
  flags: Vec<String>,

  /// Run as this provisioned user instead of system-wide
  #[arg(long, value_name = "USER")]
  user: Option<String>,
}

impl SourceArgs {
  pub fn request(&self, ensure: Ensure) -> Result<PodRequest> {
    let source = match (&self.manifest, &self.name) {
      (Some(path), _) => {
        let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let doc: Value =
          serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
        DesiredSource::Manifest(doc)
      }
      (None, Some(name)) => DesiredSource::Flags {
        flags: PodFlags::from_value(&parse_flags(&self.flags)?).context("invalid pod flags")?,
        identifier: name.clone(),
      },
      (None, None) => bail!("either --manifest or --name is required"),
    };

    Ok(PodRequest {
      ensure,
      source,
      user: self.user.clone(),
    })
  }
}

/// Collect `key=value` arguments into a flag map.
///
/// A repeated key becomes a list; a bare `key` is a switch.
fn parse_flags(args: &[String]) -> Result<Value> {
  let mut map = Map::new();
  for arg in args {
    let (key, value) = match arg.split_once('=') {
      Some((key, value)) => (key.trim(), Value::String(value.to_string())),
      None => (arg.trim(), Value::Bool(true)),
    };
    if key.is_empty() {
      bail!("flag {:?} has no key", arg);
    }

    match map.get_mut(key) {
      None => {
        map.insert(key.to_string(), value);
      }
      Some(Value::Array(items)) => items.push(value),
      Some(existing) => {
        let first = existing.take();
        *existing = Value::Array(vec![first, value]);
      }
    }
  }
  Ok(Value::Object(map))
}

/// Run one pass and print its report. A failed pass prints its error once
/// and exits 1.
fn converge(source: &SourceArgs, config: ReconcileConfig, ensure: Ensure, json: bool) -> Result<()> {
  let request = source.request(ensure)?;
  debug!(ensure = %ensure, user = ?request.user, "built pod request");
  let reconciler = reconciler(config);

  let rt = runtime()?;
  let report = rt
    .block_on(reconciler.reconcile(&request))
    .context("Reconciliation could not start")?;

  if json {
    output::print_report_json(&report)?;
  } else {
    output::print_report(&report);
  }

  if let Some(failure) = &report.failure {
    output::print_error(&failure.to_string());
    std::process::exit(1);
  }
  Ok(())
}

pub fn reconciler(config: ReconcileConfig) -> Reconciler<ProcessRunner, SystemIdentities> {
  Reconciler::new(ProcessRunner, SystemIdentities, config)
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
