//! podsync-lib: reconciliation engine for podman pods under systemd.
//!
//! A convergence pass takes a desired pod (a Pod manifest or a flag set)
//! and an ensure-state, and drives the container runtime and the service
//! supervisor toward it:
//! - `manifest`: canonical pod and container identities
//! - `context`: system or per-user execution parameters
//! - `plan`: ordered action graph with guards and notifications
//! - `execute`: guarded, change-triggered execution of a plan
//! - `reconcile`: the pass itself

pub mod config;
pub mod consts;
pub mod context;
pub mod execute;
pub mod manifest;
pub mod ops;
pub mod persist;
pub mod plan;
pub mod probe;
pub mod reconcile;
pub mod util;

pub use config::ReconcileConfig;
pub use execute::PassReport;
pub use execute::cmd::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use plan::{ActionId, Ensure, Plan};
pub use reconcile::{DesiredSource, PodRequest, PodStatus, ReconcileError, Reconciler};
