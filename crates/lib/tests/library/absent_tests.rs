//! ensure=Absent passes.

use podsync_lib::execute::{Outcome, SkipReason};
use podsync_lib::manifest::PodFlags;
use podsync_lib::plan::{ActionId, UnitTarget};
use podsync_lib::{DesiredSource, PodRequest};

use super::common::{TestEnv, web};

fn position(lines: &[String], needle: &str) -> usize {
  lines
    .iter()
    .position(|l| l.contains(needle))
    .unwrap_or_else(|| panic!("no command containing {:?} in {:?}", needle, lines))
}

#[tokio::test]
async fn active_pod_is_stopped_then_removed() {
  let env = TestEnv::new();
  let r = env.reconciler();
  r.reconcile(&PodRequest::present(web())).await.unwrap();
  r.runner().clear_calls();

  let report = r.reconcile(&PodRequest::absent(web())).await.unwrap();

  assert!(report.is_success());
  assert_eq!(
    report.ran(),
    vec![
      &ActionId::StopPod,
      &ActionId::RemoveUnitDescriptor(UnitTarget::Pod),
      &ActionId::RemoveUnitDescriptor(UnitTarget::Container("web-app".into())),
      &ActionId::RemoveUnitDescriptor(UnitTarget::Container("web-db".into())),
      &ActionId::SupervisorReload,
      &ActionId::RemovePod,
    ]
  );

  let lines = r.runner().command_lines();
  assert!(position(&lines, "systemctl stop pod-web.service") < position(&lines, "daemon-reload"));
  assert!(position(&lines, "daemon-reload") < position(&lines, "play kube --down"));

  assert!(!r.runner().pod_exists("web"));
  assert!(!r.runner().is_active("pod-web.service"));
  assert!(!env.system_unit("pod-web.service").exists());
  assert!(!env.system_unit("container-web-app.service").exists());
  assert!(!env.system_manifest("web").exists());
}

#[tokio::test]
async fn absent_pod_changes_nothing() {
  let env = TestEnv::new();
  let r = env.reconciler();

  let report = r.reconcile(&PodRequest::absent(web())).await.unwrap();

  assert!(report.is_success());
  assert!(report.changed().is_empty());
  assert_eq!(
    report.outcome_of(&ActionId::StopPod),
    Some(Outcome::Skipped {
      reason: SkipReason::ServiceInactive
    })
  );
  assert_eq!(
    report.outcome_of(&ActionId::RemoveUnitDescriptor(UnitTarget::Pod)),
    Some(Outcome::Ran { changed: false })
  );
  assert_eq!(
    report.outcome_of(&ActionId::SupervisorReload),
    Some(Outcome::Skipped {
      reason: SkipReason::NotTriggered
    })
  );
  assert_eq!(
    report.outcome_of(&ActionId::RemovePod),
    Some(Outcome::Skipped {
      reason: SkipReason::PodMissing
    })
  );
}

#[tokio::test]
async fn failed_stop_keeps_units_and_pod() {
  let env = TestEnv::new();
  let r = env.reconciler();
  r.reconcile(&PodRequest::present(web())).await.unwrap();
  r.runner().fail_on("systemctl stop");

  let report = r.reconcile(&PodRequest::absent(web())).await.unwrap();

  assert!(!report.is_success());
  assert_eq!(report.failed(), vec![&ActionId::StopPod]);
  assert_eq!(report.actions.len(), 1);
  assert!(env.system_unit("pod-web.service").exists());
  assert!(r.runner().pod_exists("web"));
}

#[tokio::test]
async fn missing_manifest_copy_falls_back_to_removal_by_name() {
  let env = TestEnv::new();
  let r = env.reconciler();
  r.reconcile(&PodRequest::present(web())).await.unwrap();
  std::fs::remove_file(env.system_manifest("web")).unwrap();

  let report = r.reconcile(&PodRequest::absent(web())).await.unwrap();

  assert!(report.is_success());
  assert!(r.runner().command_lines().contains(&"podman pod rm --force web".to_string()));
  assert!(!r.runner().pod_exists("web"));
}

#[tokio::test]
async fn flag_pod_is_removed_by_name() {
  let env = TestEnv::new();
  let r = env.reconciler();
  let source = DesiredSource::Flags {
    flags: PodFlags::new(),
    identifier: "proxy".into(),
  };
  r.reconcile(&PodRequest::present(source.clone())).await.unwrap();

  let report = r.reconcile(&PodRequest::absent(source)).await.unwrap();

  assert_eq!(
    report.ran(),
    vec![
      &ActionId::StopPod,
      &ActionId::RemoveUnitDescriptor(UnitTarget::Pod),
      &ActionId::SupervisorReload,
      &ActionId::RemovePod,
    ]
  );
  assert!(r.runner().command_lines().contains(&"podman pod rm --force proxy".to_string()));
  assert!(!r.runner().pod_exists("proxy"));
}

#[tokio::test]
async fn stale_manifest_copy_goes_even_when_the_pod_is_gone() {
  let env = TestEnv::new();
  let r = env.reconciler();
  let persisted = env.system_manifest("web");
  std::fs::create_dir_all(persisted.parent().unwrap()).unwrap();
  std::fs::write(&persisted, "kind: Pod\n").unwrap();

  let report = r.reconcile(&PodRequest::absent(web())).await.unwrap();

  assert!(report.is_success());
  assert_eq!(
    report.outcome_of(&ActionId::RemovePod),
    Some(Outcome::Skipped {
      reason: SkipReason::PodMissing
    })
  );
  assert!(!persisted.exists());
  assert!(!r.runner().command_lines().iter().any(|l| l.contains("pod rm")));
}
