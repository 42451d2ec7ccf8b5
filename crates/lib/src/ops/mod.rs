//! Command vocabularies of the runtime and the supervisor.
//!
//! Builders here are pure: they turn a context and a target into a
//! [`CommandSpec`](crate::execute::cmd::CommandSpec) and never run anything.

pub mod runtime;
pub mod supervisor;

use crate::consts::{CONTAINER_UNIT_PREFIX, POD_UNIT_PREFIX, UNIT_SUFFIX};

/// Service unit generated for a pod.
pub fn pod_unit(pod: &str) -> String {
  format!("{}{}{}", POD_UNIT_PREFIX, pod, UNIT_SUFFIX)
}

/// Service unit generated for a container, by qualified identity.
pub fn container_unit(qualified: &str) -> String {
  format!("{}{}{}", CONTAINER_UNIT_PREFIX, qualified, UNIT_SUFFIX)
}
