//! Action nodes of a reconciliation plan.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::execute::cmd::CommandSpec;
use crate::persist::Placement;

/// Which unit file a removal targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitTarget {
  Pod,
  /// Qualified container identity.
  Container(String),
}

/// Identity of an action within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionId {
  PersistManifest,
  CreatePod,
  ReplacePod,
  GenerateSystemd,
  SupervisorReload,
  StartPod,
  StopPod,
  RemoveUnitDescriptor(UnitTarget),
  RemovePod,
}

impl fmt::Display for ActionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ActionId::PersistManifest => write!(f, "PersistManifest"),
      ActionId::CreatePod => write!(f, "CreatePod"),
      ActionId::ReplacePod => write!(f, "ReplacePod"),
      ActionId::GenerateSystemd => write!(f, "GenerateSystemd"),
      ActionId::SupervisorReload => write!(f, "SupervisorReload"),
      ActionId::StartPod => write!(f, "StartPod"),
      ActionId::StopPod => write!(f, "StopPod"),
      ActionId::RemoveUnitDescriptor(UnitTarget::Pod) => write!(f, "RemoveUnitDescriptor(pod)"),
      ActionId::RemoveUnitDescriptor(UnitTarget::Container(id)) => write!(f, "RemoveUnitDescriptor({})", id),
      ActionId::RemovePod => write!(f, "RemovePod"),
    }
  }
}

impl Serialize for ActionId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// What an action does when it runs.
#[derive(Debug, Clone)]
pub enum Step {
  /// Write the canonical manifest, creating its directory first. `marker`
  /// is written ahead of the manifest and stays until the change is played.
  Persist {
    path: PathBuf,
    content: String,
    marker: Option<PathBuf>,
    file: Placement,
    dir: Placement,
  },
  /// Run a runtime or supervisor command.
  Command(CommandSpec),
  /// Generate unit files into `dir`, creating it first.
  GenerateUnits { cmd: CommandSpec, dir: PathBuf, placement: Placement },
  /// Reload the context's supervisor through its shared registration.
  Reload,
  /// Delete a unit file; changed only when it existed.
  RemoveFile { path: PathBuf },
  /// Remove the pod: tear down the persisted manifest when there is one,
  /// force-remove by name otherwise.
  RemovePod { pod: String, manifest: Option<PathBuf> },
}

/// Host state that makes a trigger-only action due without a notification.
///
/// Notifications last one pass. When a pass halts between a change and the
/// action it notified, this is what the next pass finds instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
  /// A file the step produces is missing.
  Missing(PathBuf),
  /// A marker left by a change the step has not applied yet.
  Marked(PathBuf),
}

impl Pending {
  pub fn is_due(&self) -> bool {
    match self {
      Pending::Missing(path) => !path.exists(),
      Pending::Marked(path) => path.exists(),
    }
  }
}

impl fmt::Display for Pending {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Pending::Missing(path) => write!(f, "{} is missing", path.display()),
      Pending::Marked(path) => write!(f, "{} exists", path.display()),
    }
  }
}

/// Skip predicate, evaluated against live state right before the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
  None,
  /// Run only when the pod's existence equals `expect`.
  PodExists { pod: String, expect: bool },
  /// Run only when the unit's activity equals `expect`.
  ServiceActive { unit: String, expect: bool },
  /// Run only when the persisted file differs from the step's content.
  ContentDiffers,
}

impl fmt::Display for Guard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Guard::None => write!(f, "always"),
      Guard::PodExists { pod, expect: true } => write!(f, "only if pod {} exists", pod),
      Guard::PodExists { pod, expect: false } => write!(f, "unless pod {} exists", pod),
      Guard::ServiceActive { unit, expect: true } => write!(f, "only if {} is active", unit),
      Guard::ServiceActive { unit, expect: false } => write!(f, "unless {} is active", unit),
      Guard::ContentDiffers => write!(f, "only if content differs"),
    }
  }
}

/// A node of the plan.
#[derive(Debug, Clone)]
pub struct Action {
  pub id: ActionId,
  pub step: Step,
  pub guard: Guard,
  /// Runs only after a notification from a changed predecessor, or while
  /// `pending` is due.
  pub trigger_only: bool,
  pub pending: Option<Pending>,
  /// Files deleted once the action has run, or once its guard found nothing
  /// to do.
  pub leftovers: Vec<PathBuf>,
}

impl Action {
  pub fn new(id: ActionId, step: Step) -> Self {
    Self {
      id,
      step,
      guard: Guard::None,
      trigger_only: false,
      pending: None,
      leftovers: Vec::new(),
    }
  }

  pub fn guarded(mut self, guard: Guard) -> Self {
    self.guard = guard;
    self
  }

  pub fn trigger_only(mut self) -> Self {
    self.trigger_only = true;
    self
  }

  pub fn pending_while(mut self, pending: Pending) -> Self {
    self.pending = Some(pending);
    self
  }

  pub fn cleans_up(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
    self.leftovers.extend(paths);
    self
  }

  /// Human-readable summary of what the step does.
  pub fn describe_step(&self) -> String {
    match &self.step {
      Step::Persist { path, .. } => format!("write {}", path.display()),
      Step::Command(cmd) => cmd.command_line(),
      Step::GenerateUnits { cmd, dir, .. } => format!("{} (in {})", cmd.command_line(), dir.display()),
      Step::Reload => "reload supervisor".to_string(),
      Step::RemoveFile { path } => format!("remove {}", path.display()),
      Step::RemovePod { pod, manifest: Some(path) } => format!("tear down {} from {}", pod, path.display()),
      Step::RemovePod { pod, manifest: None } => format!("remove pod {}", pod),
    }
  }
}
