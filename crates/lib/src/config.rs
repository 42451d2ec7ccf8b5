//! Reconciler configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::APP_NAME;

/// Programs and locations the reconciler works with.
///
/// User-mode directories are relative to the identity's home directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
  /// Container runtime binary.
  pub runtime_program: String,
  /// Service supervisor binary.
  pub supervisor_program: String,
  /// Persisted manifests in System mode.
  pub system_manifest_dir: PathBuf,
  /// Persisted manifests in User mode, relative to home.
  pub user_manifest_subdir: PathBuf,
  /// Unit directory in System mode.
  pub system_unit_dir: PathBuf,
  /// Unit directory in User mode, relative to home.
  pub user_unit_subdir: PathBuf,
  /// File mode of persisted manifests.
  pub manifest_mode: u32,
}

impl Default for ReconcileConfig {
  fn default() -> Self {
    Self {
      runtime_program: "podman".to_string(),
      supervisor_program: "systemctl".to_string(),
      system_manifest_dir: PathBuf::from("/etc").join(APP_NAME).join("pods"),
      user_manifest_subdir: PathBuf::from(".config").join(APP_NAME).join("pods"),
      system_unit_dir: PathBuf::from("/etc/systemd/system"),
      user_unit_subdir: PathBuf::from(".config/systemd/user"),
      manifest_mode: 0o644,
    }
  }
}
