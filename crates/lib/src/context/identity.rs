//! Provisioned identity lookup.
//!
//! The account an unprivileged context runs as must already exist; this
//! module only reads it.

use std::io;
use std::path::PathBuf;

/// A provisioned account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
  pub name: String,
  pub uid: u32,
  pub gid: u32,
  pub home: PathBuf,
}

/// Resolves account names to identities.
pub trait IdentityResolver {
  /// `Ok(None)` when no such account exists.
  fn lookup(&self, name: &str) -> io::Result<Option<Identity>>;
}

/// Looks accounts up in the host's user database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemIdentities;

#[cfg(unix)]
impl IdentityResolver for SystemIdentities {
  fn lookup(&self, name: &str) -> io::Result<Option<Identity>> {
    let user = nix::unistd::User::from_name(name).map_err(io::Error::from)?;
    Ok(user.map(|u| Identity {
      name: u.name,
      uid: u.uid.as_raw(),
      gid: u.gid.as_raw(),
      home: u.dir,
    }))
  }
}

#[cfg(not(unix))]
impl IdentityResolver for SystemIdentities {
  fn lookup(&self, _name: &str) -> io::Result<Option<Identity>> {
    Err(io::Error::new(
      io::ErrorKind::Unsupported,
      "user lookup is only supported on unix",
    ))
  }
}

/// Fixed set of identities, for callers that provision accounts themselves.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentities {
  identities: Vec<Identity>,
}

impl StaticIdentities {
  pub fn new(identities: impl IntoIterator<Item = Identity>) -> Self {
    Self {
      identities: identities.into_iter().collect(),
    }
  }
}

impl IdentityResolver for StaticIdentities {
  fn lookup(&self, name: &str) -> io::Result<Option<Identity>> {
    Ok(self.identities.iter().find(|i| i.name == name).cloned())
  }
}
