//! Execution context resolution.
//!
//! A pass runs either system-wide or as a provisioned identity with its own
//! supervisor instance. [`ExecutionContext`] captures every parameter that
//! differs between the two, and every command of the pass is built from it.
//!
//! | | System | User |
//! |---|---|---|
//! | supervisor | `systemctl` | `systemctl --user` |
//! | unit directory | `/etc/systemd/system` | `~/.config/systemd/user` |
//! | environment | none | `HOME`, `XDG_RUNTIME_DIR`, `DBUS_SESSION_BUS_ADDRESS` |
//! | working directory | inherited | home |
//! | acting identity | caller | uid/gid of the identity |

pub mod identity;
pub mod registry;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::config::ReconcileConfig;
use crate::consts::{MANIFEST_EXTENSION, REPLACE_PENDING_SUFFIX, USER_RUNTIME_BASE};
use crate::execute::cmd::{Acting, CommandSpec};

pub use identity::{Identity, IdentityResolver, StaticIdentities, SystemIdentities};
pub use registry::{ContextKey, ReloadRegistry, SupervisorReload};

/// A required external collaborator is missing.
#[derive(Debug, Error)]
pub enum DependencyError {
  #[error("user {name} does not exist")]
  UnknownIdentity { name: String },

  #[error("failed to look up user {name}: {source}")]
  IdentityLookup {
    name: String,
    #[source]
    source: io::Error,
  },

  #[error("container runtime {program} is not available: {source}")]
  RuntimeMissing {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("container runtime {program} is not usable (exit code {code:?})")]
  RuntimeUnusable { program: String, code: Option<i32> },
}

/// Which supervisor instance a context addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  System,
  User(Identity),
}

/// Resolved parameters for every command of a pass.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
  pub mode: Mode,
  pub runtime_program: String,
  /// Program and leading arguments addressing the supervisor.
  pub supervisor_prefix: Vec<String>,
  pub unit_dir: PathBuf,
  pub manifest_dir: PathBuf,
  /// Session variables for User mode, empty for System mode.
  pub env: BTreeMap<String, String>,
  pub working_dir: Option<PathBuf>,
  pub acting: Option<Acting>,
  reload: Arc<SupervisorReload>,
}

impl ExecutionContext {
  /// Resolve the context for an optional user.
  ///
  /// `None` is System mode. A named user must already exist.
  pub fn resolve(
    user: Option<&str>,
    identities: &impl IdentityResolver,
    config: &ReconcileConfig,
    registry: &ReloadRegistry,
  ) -> Result<Self, DependencyError> {
    let Some(name) = user else {
      return Ok(Self::system(config, registry));
    };

    let identity = identities
      .lookup(name)
      .map_err(|source| DependencyError::IdentityLookup {
        name: name.to_string(),
        source,
      })?
      .ok_or_else(|| DependencyError::UnknownIdentity { name: name.to_string() })?;

    Ok(Self::user(identity, config, registry))
  }

  /// System-wide context.
  pub fn system(config: &ReconcileConfig, registry: &ReloadRegistry) -> Self {
    debug!("resolved system execution context");
    Self {
      mode: Mode::System,
      runtime_program: config.runtime_program.clone(),
      supervisor_prefix: vec![config.supervisor_program.clone()],
      unit_dir: config.system_unit_dir.clone(),
      manifest_dir: config.system_manifest_dir.clone(),
      env: BTreeMap::new(),
      working_dir: None,
      acting: None,
      reload: registry.register(ContextKey::System),
    }
  }

  /// Per-user context for an existing identity.
  pub fn user(identity: Identity, config: &ReconcileConfig, registry: &ReloadRegistry) -> Self {
    let runtime_dir = Path::new(USER_RUNTIME_BASE).join(identity.uid.to_string());

    let mut env = BTreeMap::new();
    env.insert("HOME".to_string(), identity.home.display().to_string());
    env.insert("XDG_RUNTIME_DIR".to_string(), runtime_dir.display().to_string());
    env.insert(
      "DBUS_SESSION_BUS_ADDRESS".to_string(),
      format!("unix:path={}", runtime_dir.join("bus").display()),
    );

    debug!(user = %identity.name, uid = identity.uid, "resolved user execution context");

    let key = ContextKey::User {
      name: identity.name.clone(),
      uid: identity.uid,
    };

    Self {
      runtime_program: config.runtime_program.clone(),
      supervisor_prefix: vec![config.supervisor_program.clone(), "--user".to_string()],
      unit_dir: identity.home.join(&config.user_unit_subdir),
      manifest_dir: identity.home.join(&config.user_manifest_subdir),
      env,
      working_dir: Some(identity.home.clone()),
      acting: Some(Acting {
        uid: identity.uid,
        gid: identity.gid,
      }),
      reload: registry.register(key),
      mode: Mode::User(identity),
    }
  }

  pub fn key(&self) -> &ContextKey {
    self.reload.key()
  }

  /// The reload action shared by every pass in this context.
  pub fn reload(&self) -> &Arc<SupervisorReload> {
    &self.reload
  }

  pub fn is_user(&self) -> bool {
    matches!(self.mode, Mode::User(_))
  }

  /// A command for `program` carrying this context's parameters.
  pub fn command(&self, program: &str) -> CommandSpec {
    CommandSpec {
      program: program.to_string(),
      args: Vec::new(),
      env: self.env.clone(),
      cwd: self.working_dir.clone(),
      acting: self.acting,
    }
  }

  /// A runtime command; arguments follow.
  pub fn runtime(&self) -> CommandSpec {
    self.command(&self.runtime_program)
  }

  /// A supervisor command with the instance-selecting prefix applied.
  pub fn supervisor(&self) -> CommandSpec {
    let mut parts = self.supervisor_prefix.iter();
    let program = parts.next().map(String::as_str).unwrap_or("systemctl");
    self.command(program).args(parts.cloned())
  }

  /// Where the canonical copy of a pod's manifest lives.
  pub fn manifest_path(&self, pod: &str) -> PathBuf {
    self.manifest_dir.join(format!("{}.{}", pod, MANIFEST_EXTENSION))
  }

  /// Marker present while a persisted manifest change has not been replayed.
  pub fn replace_marker(&self, pod: &str) -> PathBuf {
    self.manifest_dir.join(format!(".{}.{}", pod, REPLACE_PENDING_SUFFIX))
  }
}
