//! Container runtime commands (podman).

use std::path::Path;

use crate::context::ExecutionContext;
use crate::execute::cmd::CommandSpec;
use crate::manifest::PodFlags;

/// Exit code of `pod exists` for a pod that is not there.
pub const POD_NOT_FOUND: i32 = 1;

pub fn version(ctx: &ExecutionContext) -> CommandSpec {
  ctx.runtime().arg("--version")
}

pub fn pod_exists(ctx: &ExecutionContext, pod: &str) -> CommandSpec {
  ctx.runtime().args(["pod", "exists", pod])
}

/// Create an empty pod from flags.
pub fn create(ctx: &ExecutionContext, pod: &str, flags: &PodFlags) -> CommandSpec {
  ctx
    .runtime()
    .args(["pod", "create", "--name", pod])
    .args(flags.to_args())
}

/// Play a manifest, replacing an existing pod when `replace` is set.
pub fn play(ctx: &ExecutionContext, manifest: &Path, replace: bool) -> CommandSpec {
  let mut cmd = ctx.runtime().args(["play", "kube"]);
  if replace {
    cmd = cmd.arg("--replace");
  }
  cmd.arg(manifest.display().to_string())
}

/// Tear down everything a manifest created.
pub fn teardown(ctx: &ExecutionContext, manifest: &Path) -> CommandSpec {
  ctx
    .runtime()
    .args(["play", "kube", "--down"])
    .arg(manifest.display().to_string())
}

pub fn remove_pod(ctx: &ExecutionContext, pod: &str) -> CommandSpec {
  ctx.runtime().args(["pod", "rm", "--force", pod])
}

/// Write unit files for the pod and its containers into the unit directory.
pub fn generate_units(ctx: &ExecutionContext, pod: &str) -> CommandSpec {
  ctx
    .runtime()
    .args(["generate", "systemd", "--files", "--name", pod])
    .current_dir(&ctx.unit_dir)
}
