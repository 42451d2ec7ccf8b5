//! Desired-state normalization.
//!
//! Turns a parsed manifest tree or a flag mapping into a [`PodManifest`]:
//! the canonical pod name, qualified container identities, and whatever the
//! runtime needs to create the pod.

pub mod flags;
pub mod types;

pub use flags::{FlagValue, PodFlags};
pub use types::{Container, PodManifest, PodSource, ValidationError, normalize_flags, normalize_manifest, validate_name};
