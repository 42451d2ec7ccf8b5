//! Reconciliation planning.
//!
//! Builds the action graph that converges one pod toward its ensure-state.
//! Planning reads no observed state: every decision that depends on the
//! host is a [`Guard`] evaluated by the executor right before the action.
//!
//! # Present
//!
//! ```text
//! PersistManifest ──notify──▶ ReplacePod ──notify──┐
//!        │                        │                ▼
//!        └──────▶ CreatePod ◀─────┘ ──notify──▶ GenerateSystemd ──notify──▶ SupervisorReload ──▶ StartPod
//! ```
//!
//! ReplacePod runs before CreatePod. Replace needs the pod to exist and
//! create needs it missing, so with existence re-probed at each guard at
//! most one of them runs.
//!
//! A pass that halts after a change loses its notifications. PersistManifest
//! leaves a marker that keeps ReplacePod due until a replay clears it, and
//! GenerateSystemd stays due while the pod unit file is missing.
//!
//! # Absent
//!
//! ```text
//! StopPod ──▶ RemoveUnitDescriptor(pod)        ──notify──▶ SupervisorReload ──▶ RemovePod
//!        └──▶ RemoveUnitDescriptor(container)* ──notify──┘                       ▲
//!                       └────────────────────────────────────────────────────────┘
//! ```
//!
//! RemovePod deletes the persisted manifest even when the pod is already gone.

pub mod action;
pub mod dag;

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ReconcileConfig;
use crate::context::ExecutionContext;
use crate::manifest::{PodManifest, PodSource};
use crate::ops::{container_unit, pod_unit, runtime, supervisor};
use crate::persist::{DIR_MODE, Placement};

pub use action::{Action, ActionId, Guard, Pending, Step, UnitTarget};
pub use dag::{ActionGraph, Edge};

/// Desired presence of the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
  Present,
  Absent,
}

impl fmt::Display for Ensure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Ensure::Present => write!(f, "present"),
      Ensure::Absent => write!(f, "absent"),
    }
  }
}

/// Errors from building a plan.
#[derive(Debug, Error)]
pub enum PlanError {
  #[error("failed to serialize manifest: {0}")]
  Serialize(#[from] serde_yaml::Error),

  #[error("action graph contains a cycle")]
  CycleDetected,
}

/// An ordered action graph for one pod.
#[derive(Debug)]
pub struct Plan {
  pub pod: String,
  pub ensure: Ensure,
  graph: ActionGraph,
  order: Vec<NodeIndex>,
}

/// Read-only view of one planned action.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
  pub id: ActionId,
  pub step: String,
  pub guard: String,
  pub trigger_only: bool,
  /// When a trigger-only action runs without a notification.
  pub pending: Option<String>,
  pub notifies: Vec<ActionId>,
}

impl Plan {
  /// Plan the convergence of `pod` toward `ensure` within `ctx`.
  pub fn build(
    pod: &PodManifest,
    ensure: Ensure,
    ctx: &ExecutionContext,
    config: &ReconcileConfig,
  ) -> Result<Self, PlanError> {
    let graph = match ensure {
      Ensure::Present => present_graph(pod, ctx, config)?,
      Ensure::Absent => absent_graph(pod, ctx),
    };
    let order = graph.execution_order()?;

    Ok(Self {
      pod: pod.name.clone(),
      ensure,
      graph,
      order,
    })
  }

  pub fn graph(&self) -> &ActionGraph {
    &self.graph
  }

  /// Node indices in execution order.
  pub fn order(&self) -> &[NodeIndex] {
    &self.order
  }

  /// Action ids in execution order.
  pub fn action_ids(&self) -> Vec<ActionId> {
    self.order.iter().map(|idx| self.graph.action(*idx).id.clone()).collect()
  }

  /// Every action with its step, guard and notifications, in execution order.
  pub fn describe(&self) -> Vec<PlannedAction> {
    self
      .order
      .iter()
      .map(|idx| {
        let action = self.graph.action(*idx);
        PlannedAction {
          id: action.id.clone(),
          step: action.describe_step(),
          guard: action.guard.to_string(),
          trigger_only: action.trigger_only,
          pending: action.pending.as_ref().map(ToString::to_string),
          notifies: self
            .graph
            .notify_targets(*idx)
            .into_iter()
            .map(|t| self.graph.action(t).id.clone())
            .collect(),
        }
      })
      .collect()
  }
}

fn present_graph(pod: &PodManifest, ctx: &ExecutionContext, config: &ReconcileConfig) -> Result<ActionGraph, PlanError> {
  let mut graph = ActionGraph::new();
  let exists = |expect| Guard::PodExists {
    pod: pod.name.clone(),
    expect,
  };

  // Manifest pods are persisted and played; flag pods are created directly.
  let (create, replace) = match &pod.source {
    PodSource::Manifest(doc) => {
      let path = ctx.manifest_path(&pod.name);
      let marker = ctx.replace_marker(&pod.name);
      let persist = graph.add(
        Action::new(
          ActionId::PersistManifest,
          Step::Persist {
            path: path.clone(),
            content: serde_yaml::to_string(doc)?,
            marker: Some(marker.clone()),
            file: Placement {
              owner: ctx.acting,
              mode: config.manifest_mode,
            },
            dir: Placement {
              owner: ctx.acting,
              mode: DIR_MODE,
            },
          },
        )
        .guarded(Guard::ContentDiffers),
      );
      let replace = graph.add(
        Action::new(ActionId::ReplacePod, Step::Command(runtime::play(ctx, &path, true)))
          .guarded(exists(true))
          .trigger_only()
          .pending_while(Pending::Marked(marker.clone()))
          .cleans_up([marker]),
      );
      let create = graph.add(
        Action::new(ActionId::CreatePod, Step::Command(runtime::play(ctx, &path, false))).guarded(exists(false)),
      );

      graph.notify(persist, replace);
      graph.before(persist, create);
      graph.before(replace, create);
      (create, Some(replace))
    }
    PodSource::Flags(flags) => {
      let create = graph.add(
        Action::new(ActionId::CreatePod, Step::Command(runtime::create(ctx, &pod.name, flags))).guarded(exists(false)),
      );
      (create, None)
    }
  };

  let unit = pod_unit(&pod.name);
  let generate = graph.add(
    Action::new(
      ActionId::GenerateSystemd,
      Step::GenerateUnits {
        cmd: runtime::generate_units(ctx, &pod.name),
        dir: ctx.unit_dir.clone(),
        placement: Placement {
          owner: ctx.acting,
          mode: DIR_MODE,
        },
      },
    )
    .trigger_only()
    .pending_while(Pending::Missing(ctx.unit_dir.join(&unit))),
  );
  let reload = graph.add(Action::new(ActionId::SupervisorReload, Step::Reload).trigger_only());
  let start = graph.add(
    Action::new(ActionId::StartPod, Step::Command(supervisor::start(ctx, &unit))).guarded(Guard::ServiceActive {
      unit,
      expect: false,
    }),
  );

  graph.notify(create, generate);
  if let Some(replace) = replace {
    graph.notify(replace, generate);
  }
  graph.notify(generate, reload);
  graph.before(reload, start);

  Ok(graph)
}

fn absent_graph(pod: &PodManifest, ctx: &ExecutionContext) -> ActionGraph {
  let mut graph = ActionGraph::new();
  let unit = pod_unit(&pod.name);

  let stop = graph.add(
    Action::new(ActionId::StopPod, Step::Command(supervisor::stop(ctx, &unit))).guarded(Guard::ServiceActive {
      unit: unit.clone(),
      expect: true,
    }),
  );

  let mut removals = vec![graph.add(Action::new(
    ActionId::RemoveUnitDescriptor(UnitTarget::Pod),
    Step::RemoveFile {
      path: ctx.unit_dir.join(&unit),
    },
  ))];
  for container in &pod.containers {
    removals.push(graph.add(Action::new(
      ActionId::RemoveUnitDescriptor(UnitTarget::Container(container.qualified.clone())),
      Step::RemoveFile {
        path: ctx.unit_dir.join(container_unit(&container.qualified)),
      },
    )));
  }

  let reload = graph.add(Action::new(ActionId::SupervisorReload, Step::Reload).trigger_only());
  let manifest = pod.is_manifest().then(|| ctx.manifest_path(&pod.name));
  let leftovers = match &manifest {
    Some(path) => vec![path.clone(), ctx.replace_marker(&pod.name)],
    None => Vec::new(),
  };
  let remove = graph.add(
    Action::new(
      ActionId::RemovePod,
      Step::RemovePod {
        pod: pod.name.clone(),
        manifest,
      },
    )
    .guarded(Guard::PodExists {
      pod: pod.name.clone(),
      expect: true,
    })
    .cleans_up(leftovers),
  );

  for removal in removals {
    graph.before(stop, removal);
    graph.notify(removal, reload);
    graph.before(removal, remove);
  }
  graph.before(reload, remove);

  graph
}
