//! Pod manifest types and validation.
//!
//! Two sources describe a pod:
//!
//! - a Kubernetes-style `Pod` document (`kind`, `metadata.name`,
//!   `spec.containers[].name`), which is persisted and played by the runtime;
//! - a flag mapping for an empty pod, which has no containers.
//!
//! Both normalize into a [`PodManifest`]. Normalization is pure: nothing is
//! probed or written here.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::consts::{CONTAINER_SEPARATOR, MAX_NAME_LEN, POD_KIND};

use super::flags::PodFlags;

/// Malformed or incomplete desired state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("manifest must be a map")]
  NotAnObject,

  #[error("manifest kind must be \"Pod\", found {}", describe_kind(.found))]
  WrongKind { found: Option<String> },

  #[error("pod name could not be derived")]
  MissingName,

  #[error("manifest has no spec.containers list")]
  MissingContainers,

  #[error("manifest spec.containers is empty")]
  EmptyContainers,

  #[error("container at index {index} has no name")]
  UnnamedContainer { index: usize },

  #[error("invalid flag {key}: {reason}")]
  InvalidFlag { key: String, reason: String },

  #[error("invalid name {name:?}: {reason}")]
  InvalidName { name: String, reason: String },
}

/// A container of the pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
  /// Name as written in the manifest.
  pub name: String,
  /// `<pod>-<container>`, the identity the runtime and the supervisor use.
  pub qualified: String,
}

/// Where the pod definition came from.
#[derive(Debug, Clone, PartialEq)]
pub enum PodSource {
  /// A full manifest document, kept for persistence and playback.
  Manifest(Value),
  /// Flags for an empty `pod create`.
  Flags(PodFlags),
}

/// Normalized desired state of one pod.
#[derive(Debug, Clone, PartialEq)]
pub struct PodManifest {
  pub name: String,
  /// Containers in manifest order. Empty for flag-defined pods.
  pub containers: Vec<Container>,
  pub source: PodSource,
}

impl PodManifest {
  /// Qualified container identities, in manifest order.
  pub fn container_ids(&self) -> Vec<&str> {
    self.containers.iter().map(|c| c.qualified.as_str()).collect()
  }

  pub fn is_manifest(&self) -> bool {
    matches!(self.source, PodSource::Manifest(_))
  }

  /// Canonical YAML of the manifest document, used for drift detection.
  ///
  /// Map keys serialize sorted, so equal trees always produce equal bytes.
  /// Returns `None` for flag-defined pods.
  pub fn canonical_document(&self) -> Option<Result<String, serde_yaml::Error>> {
    match &self.source {
      PodSource::Manifest(doc) => Some(serde_yaml::to_string(doc)),
      PodSource::Flags(_) => None,
    }
  }
}

/// Normalize a parsed manifest tree.
pub fn normalize_manifest(doc: &Value) -> Result<PodManifest, ValidationError> {
  let Value::Object(root) = doc else {
    return Err(ValidationError::NotAnObject);
  };

  match root.get("kind") {
    Some(Value::String(kind)) if kind == POD_KIND => {}
    Some(Value::String(kind)) => return Err(ValidationError::WrongKind { found: Some(kind.clone()) }),
    Some(other) => {
      return Err(ValidationError::WrongKind {
        found: Some(other.to_string()),
      });
    }
    None => return Err(ValidationError::WrongKind { found: None }),
  }

  let name = doc
    .pointer("/metadata/name")
    .and_then(Value::as_str)
    .filter(|n| !n.trim().is_empty())
    .ok_or(ValidationError::MissingName)?
    .to_string();
  validate_name(&name)?;

  let entries = doc
    .pointer("/spec/containers")
    .and_then(Value::as_array)
    .ok_or(ValidationError::MissingContainers)?;

  if entries.is_empty() {
    return Err(ValidationError::EmptyContainers);
  }

  let mut containers = Vec::with_capacity(entries.len());
  for (index, entry) in entries.iter().enumerate() {
    let container_name = entry
      .get("name")
      .and_then(Value::as_str)
      .filter(|n| !n.trim().is_empty())
      .ok_or(ValidationError::UnnamedContainer { index })?;
    validate_name(container_name)?;

    containers.push(Container {
      name: container_name.to_string(),
      qualified: qualify(&name, container_name),
    });
  }

  Ok(PodManifest {
    name,
    containers,
    source: PodSource::Manifest(doc.clone()),
  })
}

/// Normalize a flag mapping for an empty pod.
///
/// `identifier` names the pod unless the flags carry a `name` key.
pub fn normalize_flags(flags: PodFlags, identifier: &str) -> Result<PodManifest, ValidationError> {
  let name = flags.pod_name(identifier)?;
  Ok(PodManifest {
    name,
    containers: Vec::new(),
    source: PodSource::Flags(flags),
  })
}

/// Check that a pod or container name is safe as a path component and a
/// unit name.
///
/// Accepted: ASCII letters, digits, `-`, `_` and `.`, starting with a letter
/// or digit, without `..`.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
  let reason = if name.len() > MAX_NAME_LEN {
    format!("longer than {} characters", MAX_NAME_LEN)
  } else if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
    "must start with a letter or digit".to_string()
  } else if let Some(c) = name
    .chars()
    .find(|c| !(c.is_ascii_alphanumeric() || matches!(*c, '-' | '_' | '.')))
  {
    format!("character {:?} is not allowed", c)
  } else if name.contains("..") {
    "must not contain \"..\"".to_string()
  } else {
    return Ok(());
  };

  Err(ValidationError::InvalidName {
    name: name.to_string(),
    reason,
  })
}

fn describe_kind(found: &Option<String>) -> String {
  match found {
    Some(kind) => format!("\"{}\"", kind),
    None => "nothing".to_string(),
  }
}

fn qualify(pod: &str, container: &str) -> String {
  format!("{}{}{}", pod, CONTAINER_SEPARATOR, container)
}
