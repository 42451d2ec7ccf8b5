//! System vs user contexts.

use std::sync::Arc;

use podsync_lib::context::ContextKey;
use podsync_lib::context::DependencyError;
use podsync_lib::plan::ActionId;
use podsync_lib::{DesiredSource, PodRequest, ReconcileError};
use serde_json::json;

use super::common::{TestEnv, USER, web};

fn api() -> DesiredSource {
  DesiredSource::Manifest(json!({
    "kind": "Pod",
    "metadata": { "name": "api" },
    "spec": { "containers": [ { "name": "server", "image": "api:2" } ] }
  }))
}

#[tokio::test]
async fn user_pass_runs_in_user_context() {
  let env = TestEnv::new();
  let r = env.reconciler();
  let identity = env.identity();

  let report = r.reconcile(&PodRequest::present(web()).as_user(USER)).await.unwrap();

  assert!(report.is_success());
  assert_eq!(report.context, format!("user:{}({})", USER, identity.uid));

  let runtime_dir = format!("/run/user/{}", identity.uid);
  for call in r.runner().calls() {
    assert_eq!(call.env.get("HOME"), Some(&env.home().display().to_string()));
    assert_eq!(call.env.get("XDG_RUNTIME_DIR"), Some(&runtime_dir));
    assert_eq!(
      call.env.get("DBUS_SESSION_BUS_ADDRESS"),
      Some(&format!("unix:path={}/bus", runtime_dir))
    );
    assert_eq!(call.acting.map(|a| a.uid), Some(identity.uid));
    if call.program == "systemctl" {
      assert_eq!(call.args.first().map(String::as_str), Some("--user"));
    }
  }

  assert!(env.home().join(".config/podsync/pods/web.yaml").exists());
  assert!(env.home().join(".config/systemd/user/pod-web.service").exists());
  assert!(!env.system_manifest("web").exists());
  assert!(!env.system_unit("pod-web.service").exists());
}

#[tokio::test]
async fn system_pass_carries_no_user_parameters() {
  let env = TestEnv::new();
  let r = env.reconciler();

  r.reconcile(&PodRequest::present(web())).await.unwrap();

  for call in r.runner().calls() {
    assert!(call.env.is_empty());
    assert!(call.acting.is_none());
    assert!(!call.args.iter().any(|a| a == "--user"));
  }
}

#[tokio::test]
async fn unknown_user_fails_before_any_command() {
  let env = TestEnv::new();
  let r = env.reconciler();

  let result = r.reconcile(&PodRequest::present(web()).as_user("nobody-here")).await;

  assert!(matches!(
    result,
    Err(ReconcileError::Dependency(DependencyError::UnknownIdentity { .. }))
  ));
  assert!(r.runner().calls().is_empty());
}

#[tokio::test]
async fn pods_in_one_context_share_the_reload() {
  let env = TestEnv::new();
  let r = env.reconciler();

  r.reconcile(&PodRequest::present(web())).await.unwrap();
  r.reconcile(&PodRequest::present(api())).await.unwrap();
  r.reconcile(&PodRequest::present(api()).as_user(USER)).await.unwrap();

  let system = env.registry.register(ContextKey::System);
  let user = env.registry.register(ContextKey::User {
    name: USER.to_string(),
    uid: env.identity().uid,
  });
  assert_eq!(env.registry.len(), 2);
  assert_eq!(system.reload_count(), 2);
  assert_eq!(user.reload_count(), 1);
  assert!(!Arc::ptr_eq(&system, &user));
}

#[tokio::test]
async fn status_reflects_both_contexts_independently() {
  let env = TestEnv::new();
  let r = env.reconciler();
  r.reconcile(&PodRequest::present(web())).await.unwrap();

  let status = r.status("web", None).await.unwrap();
  assert!(status.exists && status.active);
  assert_eq!(status.context, "system");

  let missing = r.status("api", None).await.unwrap();
  assert!(!missing.exists && !missing.active);
}

#[test]
fn plan_needs_no_host_access() {
  let env = TestEnv::new();
  let r = env.reconciler();

  let plan = r.plan(&PodRequest::absent(web()).as_user(USER)).unwrap();

  assert_eq!(plan.action_ids().first(), Some(&ActionId::StopPod));
  assert!(r.runner().calls().is_empty());
}
