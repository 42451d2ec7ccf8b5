//! Convergence passes.
//!
//! A [`Reconciler`] wires the pieces of one pass together:
//!
//! 1. normalize the desired source into a [`PodManifest`]
//! 2. resolve the execution context
//! 3. check that the container runtime answers
//! 4. build the plan and execute it
//!
//! Validation and dependency failures surface before any effecting command
//! is issued. Failures inside the pass are carried by the [`PassReport`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::ReconcileConfig;
use crate::context::{DependencyError, ExecutionContext, IdentityResolver, ReloadRegistry};
use crate::execute::cmd::CommandRunner;
use crate::execute::{PassReport, execute_plan};
use crate::manifest::{PodFlags, PodManifest, ValidationError, normalize_flags, normalize_manifest, validate_name};
use crate::ops::pod_unit;
use crate::plan::{Ensure, Plan, PlanError};
use crate::probe::{ProbeError, StateProber};

/// Errors that prevent a pass from starting.
#[derive(Debug, Error)]
pub enum ReconcileError {
  #[error("invalid manifest: {0}")]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Dependency(#[from] DependencyError),

  #[error(transparent)]
  Plan(#[from] PlanError),

  #[error(transparent)]
  Probe(#[from] ProbeError),
}

/// Where the desired pod comes from.
#[derive(Debug, Clone)]
pub enum DesiredSource {
  /// A Pod manifest document.
  Manifest(Value),
  /// An empty pod described by runtime flags.
  Flags { flags: PodFlags, identifier: String },
}

/// One pod's desired state.
#[derive(Debug, Clone)]
pub struct PodRequest {
  pub ensure: Ensure,
  pub source: DesiredSource,
  /// Run as this provisioned identity instead of system-wide.
  pub user: Option<String>,
}

impl PodRequest {
  pub fn present(source: DesiredSource) -> Self {
    Self {
      ensure: Ensure::Present,
      source,
      user: None,
    }
  }

  pub fn absent(source: DesiredSource) -> Self {
    Self {
      ensure: Ensure::Absent,
      source,
      user: None,
    }
  }

  pub fn as_user(mut self, user: impl Into<String>) -> Self {
    self.user = Some(user.into());
    self
  }
}

/// Observed state of one pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodStatus {
  pub pod: String,
  pub context: String,
  pub exists: bool,
  pub active: bool,
}

/// Runs convergence passes through a command runner.
pub struct Reconciler<R, I> {
  runner: R,
  identities: I,
  config: ReconcileConfig,
  registry: Arc<ReloadRegistry>,
}

impl<R: CommandRunner, I: IdentityResolver> Reconciler<R, I> {
  /// Reconciler sharing the process-wide reload registry.
  pub fn new(runner: R, identities: I, config: ReconcileConfig) -> Self {
    Self::with_registry(runner, identities, config, ReloadRegistry::global())
  }

  pub fn with_registry(runner: R, identities: I, config: ReconcileConfig, registry: Arc<ReloadRegistry>) -> Self {
    Self {
      runner,
      identities,
      config,
      registry,
    }
  }

  pub fn runner(&self) -> &R {
    &self.runner
  }

  pub fn config(&self) -> &ReconcileConfig {
    &self.config
  }

  pub fn registry(&self) -> &Arc<ReloadRegistry> {
    &self.registry
  }

  /// Canonical identity of the desired pod.
  pub fn normalize(&self, source: &DesiredSource) -> Result<PodManifest, ValidationError> {
    match source {
      DesiredSource::Manifest(doc) => normalize_manifest(doc),
      DesiredSource::Flags { flags, identifier } => normalize_flags(flags.clone(), identifier),
    }
  }

  /// Resolve the context a request runs in.
  pub fn context(&self, user: Option<&str>) -> Result<ExecutionContext, DependencyError> {
    ExecutionContext::resolve(user, &self.identities, &self.config, &self.registry)
  }

  /// Plan a request without probing or changing anything.
  pub fn plan(&self, request: &PodRequest) -> Result<Plan, ReconcileError> {
    let pod = self.normalize(&request.source)?;
    let ctx = self.context(request.user.as_deref())?;
    Ok(Plan::build(&pod, request.ensure, &ctx, &self.config)?)
  }

  /// Run one convergence pass.
  pub async fn reconcile(&self, request: &PodRequest) -> Result<PassReport, ReconcileError> {
    let pod = self.normalize(&request.source)?;
    let ctx = self.context(request.user.as_deref())?;
    info!(pod = %pod.name, ensure = %request.ensure, context = %ctx.key(), "reconciling pod");

    StateProber::new(&self.runner, &ctx).runtime_available().await?;

    let plan = Plan::build(&pod, request.ensure, &ctx, &self.config)?;
    Ok(execute_plan(&plan, &ctx, &self.runner).await)
  }

  /// Query whether `pod` exists and its pod unit is active.
  pub async fn status(&self, pod: &str, user: Option<&str>) -> Result<PodStatus, ReconcileError> {
    validate_name(pod)?;
    let ctx = self.context(user)?;
    let prober = StateProber::new(&self.runner, &ctx);
    prober.runtime_available().await?;

    Ok(PodStatus {
      pod: pod.to_string(),
      context: ctx.key().to_string(),
      exists: prober.pod_exists(pod).await?,
      active: prober.service_active(&pod_unit(pod)).await?,
    })
  }
}
