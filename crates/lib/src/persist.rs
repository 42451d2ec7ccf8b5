//! File placement for persisted artifacts.
//!
//! Covers the canonical manifest copy and the removal of generated unit
//! files. Writes go through a temp file and a rename.
//!
//! # Layout
//!
//! ```text
//! <manifest dir>/<pod>.yaml            canonical manifest
//! <unit dir>/pod-<pod>.service         generated by the runtime
//! <unit dir>/container-<pod>-<c>.service
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::execute::cmd::Acting;

/// Mode for directories created to hold persisted manifests.
pub const DIR_MODE: u32 = 0o755;

/// Errors from persisting or removing files.
#[derive(Debug, Error)]
pub enum PersistError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to remove {path}: {source}")]
  Remove {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to set permissions on {path}: {source}")]
  Permissions {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to change owner of {path}: {source}")]
  Chown {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Owner and mode for a persisted file or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
  /// `None` keeps the owner of the calling process.
  pub owner: Option<Acting>,
  pub mode: u32,
}

/// Whether `path` already holds exactly `content`.
pub fn content_matches(path: &Path, content: &[u8]) -> Result<bool, PersistError> {
  match fs::read(path) {
    Ok(existing) => Ok(existing == content),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
    Err(source) => Err(PersistError::Read {
      path: path.to_path_buf(),
      source,
    }),
  }
}

/// Create `dir` and any missing parents.
///
/// Every directory created here gets `placement`; existing ones are left
/// alone.
pub fn ensure_directory(dir: &Path, placement: Placement) -> Result<(), PersistError> {
  if dir.is_dir() {
    return Ok(());
  }
  if let Some(parent) = dir.parent() {
    if !parent.as_os_str().is_empty() {
      ensure_directory(parent, placement)?;
    }
  }

  debug!(path = %dir.display(), "creating directory");
  match fs::create_dir(dir) {
    Ok(()) => apply_placement(dir, placement),
    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
    Err(source) => Err(PersistError::CreateDir {
      path: dir.to_path_buf(),
      source,
    }),
  }
}

/// Write `content` to `path` unless it is already there.
///
/// Returns whether the file changed.
pub fn write_file(path: &Path, content: &[u8], placement: Placement) -> Result<bool, PersistError> {
  if content_matches(path, content)? {
    debug!(path = %path.display(), "file already up to date");
    return Ok(false);
  }

  let temp_path = temp_path_for(path);
  fs::write(&temp_path, content).map_err(|source| PersistError::Write {
    path: temp_path.clone(),
    source,
  })?;
  apply_placement(&temp_path, placement)?;
  fs::rename(&temp_path, path).map_err(|source| PersistError::Write {
    path: path.to_path_buf(),
    source,
  })?;

  info!(path = %path.display(), bytes = content.len(), "file written");
  Ok(true)
}

/// Remove `path`. Returns whether there was anything to remove.
pub fn remove_file(path: &Path) -> Result<bool, PersistError> {
  match fs::remove_file(path) {
    Ok(()) => {
      info!(path = %path.display(), "file removed");
      Ok(true)
    }
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(path = %path.display(), "file already gone");
      Ok(false)
    }
    Err(source) => Err(PersistError::Remove {
      path: path.to_path_buf(),
      source,
    }),
  }
}

fn temp_path_for(path: &Path) -> PathBuf {
  let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".tmp");
  path.with_file_name(name)
}

#[cfg(unix)]
fn apply_placement(path: &Path, placement: Placement) -> Result<(), PersistError> {
  use std::os::unix::fs::PermissionsExt;

  fs::set_permissions(path, fs::Permissions::from_mode(placement.mode)).map_err(|source| {
    PersistError::Permissions {
      path: path.to_path_buf(),
      source,
    }
  })?;

  let Some(owner) = placement.owner else {
    return Ok(());
  };

  // Files created by the process already carry its ids.
  if nix::unistd::geteuid().as_raw() == owner.uid && nix::unistd::getegid().as_raw() == owner.gid {
    return Ok(());
  }

  nix::unistd::chown(
    path,
    Some(nix::unistd::Uid::from_raw(owner.uid)),
    Some(nix::unistd::Gid::from_raw(owner.gid)),
  )
  .map_err(|errno| PersistError::Chown {
    path: path.to_path_buf(),
    source: io::Error::from(errno),
  })
}

#[cfg(not(unix))]
fn apply_placement(_path: &Path, _placement: Placement) -> Result<(), PersistError> {
  Ok(())
}
