//! Shared helpers for library integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use podsync_lib::context::{Identity, ReloadRegistry, StaticIdentities};
use podsync_lib::manifest::normalize_manifest;
use podsync_lib::{CommandOutput, CommandRunner, CommandSpec, DesiredSource, ReconcileConfig, Reconciler};
use serde_json::{Value, json};
use tempfile::TempDir;

pub const USER: &str = "svcacct";

#[derive(Default)]
struct HostState {
  /// Pod name to qualified container ids.
  pods: BTreeMap<String, Vec<String>>,
  active: BTreeSet<String>,
  fail_on: Option<String>,
}

/// An in-memory podman and systemd.
///
/// Commands mutate the simulated state the way the real tools would, so a
/// second pass observes the effects of the first.
#[derive(Default)]
pub struct FakeHost {
  state: Mutex<HostState>,
  calls: Mutex<Vec<CommandSpec>>,
}

impl FakeHost {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make every command whose line contains `needle` exit 125.
  pub fn fail_on(&self, needle: &str) {
    self.state.lock().unwrap().fail_on = Some(needle.to_string());
  }

  /// Stop failing commands.
  pub fn recover(&self) {
    self.state.lock().unwrap().fail_on = None;
  }

  pub fn pod_exists(&self, pod: &str) -> bool {
    self.state.lock().unwrap().pods.contains_key(pod)
  }

  pub fn is_active(&self, unit: &str) -> bool {
    self.state.lock().unwrap().active.contains(unit)
  }

  pub fn calls(&self) -> Vec<CommandSpec> {
    self.calls.lock().unwrap().clone()
  }

  pub fn command_lines(&self) -> Vec<String> {
    self.calls().iter().map(CommandSpec::command_line).collect()
  }

  pub fn clear_calls(&self) {
    self.calls.lock().unwrap().clear();
  }

  fn answer(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
    let mut state = self.state.lock().unwrap();
    if let Some(needle) = &state.fail_on {
      if spec.command_line().contains(needle.as_str()) {
        return Ok(exit(125, "", "simulated failure"));
      }
    }

    let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();
    let output = match (spec.program.as_str(), args.as_slice()) {
      ("podman", ["--version"]) => exit(0, "podman version 5.2.0", ""),
      ("podman", ["pod", "exists", pod]) => {
        if state.pods.contains_key(*pod) {
          exit(0, "", "")
        } else {
          exit(1, "", "")
        }
      }
      ("podman", ["pod", "create", "--name", pod, ..]) => {
        state.pods.insert(pod.to_string(), Vec::new());
        exit(0, "", "")
      }
      ("podman", ["play", "kube", "--down", path]) => {
        state.pods.remove(&pod_of(path));
        exit(0, "", "")
      }
      ("podman", ["play", "kube", "--replace", path]) => {
        let pod = pod_of(path);
        state.active.remove(&format!("pod-{}.service", pod));
        state.pods.insert(pod, containers_of(path)?);
        exit(0, "", "")
      }
      ("podman", ["play", "kube", path]) => {
        if state.pods.contains_key(&pod_of(path)) {
          exit(125, "", "pod already exists")
        } else {
          state.pods.insert(pod_of(path), containers_of(path)?);
          exit(0, "", "")
        }
      }
      ("podman", ["pod", "rm", "--force", pod]) => {
        state.pods.remove(*pod);
        exit(0, "", "")
      }
      ("podman", ["generate", "systemd", "--files", "--name", pod]) => {
        let dir = spec.cwd.clone().unwrap_or_default();
        let Some(containers) = state.pods.get(*pod) else {
          return Ok(exit(125, "", "no such pod"));
        };
        fs::write(dir.join(format!("pod-{}.service", pod)), "[Unit]\n")?;
        for container in containers {
          fs::write(dir.join(format!("container-{}.service", container)), "[Unit]\n")?;
        }
        exit(0, "", "")
      }
      ("systemctl", rest) => {
        let rest = match rest {
          ["--user", rest @ ..] => rest,
          rest => rest,
        };
        match rest {
          ["daemon-reload"] => exit(0, "", ""),
          ["start", unit] => {
            state.active.insert(unit.to_string());
            exit(0, "", "")
          }
          ["stop", unit] => {
            state.active.remove(*unit);
            exit(0, "", "")
          }
          ["is-active", unit] => {
            if state.active.contains(*unit) {
              exit(0, "active", "")
            } else {
              exit(3, "inactive", "")
            }
          }
          _ => exit(2, "", "unknown systemctl command"),
        }
      }
      _ => exit(127, "", "unknown command"),
    };
    Ok(output)
  }
}

impl CommandRunner for FakeHost {
  async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
    self.calls.lock().unwrap().push(spec.clone());
    self.answer(spec)
  }
}

fn exit(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
  CommandOutput {
    code: Some(code),
    stdout: stdout.to_string(),
    stderr: stderr.to_string(),
  }
}

fn pod_of(path: &str) -> String {
  Path::new(path)
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default()
}

fn containers_of(path: &str) -> io::Result<Vec<String>> {
  let text = fs::read_to_string(path)?;
  let doc: Value = serde_yaml::from_str(&text).map_err(io::Error::other)?;
  let pod = normalize_manifest(&doc).map_err(io::Error::other)?;
  Ok(pod.container_ids().into_iter().map(String::from).collect())
}

pub fn web_manifest() -> Value {
  json!({
    "apiVersion": "v1",
    "kind": "Pod",
    "metadata": { "name": "web" },
    "spec": {
      "containers": [
        { "name": "app", "image": "nginx:1.27" },
        { "name": "db", "image": "postgres:16" }
      ]
    }
  })
}

pub fn web() -> DesiredSource {
  DesiredSource::Manifest(web_manifest())
}

/// Isolated host: temp directories for every path the reconciler writes.
pub struct TestEnv {
  pub temp: TempDir,
  pub config: ReconcileConfig,
  pub registry: Arc<ReloadRegistry>,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let config = ReconcileConfig {
      system_manifest_dir: temp.path().join("etc/podsync/pods"),
      system_unit_dir: temp.path().join("etc/systemd/system"),
      ..ReconcileConfig::default()
    };
    fs::create_dir_all(temp.path().join("home").join(USER)).unwrap();
    Self {
      temp,
      config,
      registry: Arc::new(ReloadRegistry::new()),
    }
  }

  pub fn home(&self) -> PathBuf {
    self.temp.path().join("home").join(USER)
  }

  /// A provisioned identity owning the temp home, so placement needs no chown.
  pub fn identity(&self) -> Identity {
    let meta = fs::metadata(self.home()).unwrap();
    Identity {
      name: USER.to_string(),
      uid: meta.uid(),
      gid: meta.gid(),
      home: self.home(),
    }
  }

  pub fn reconciler(&self) -> Reconciler<FakeHost, StaticIdentities> {
    self.reconciler_with(FakeHost::new())
  }

  pub fn reconciler_with(&self, host: FakeHost) -> Reconciler<FakeHost, StaticIdentities> {
    Reconciler::with_registry(
      host,
      StaticIdentities::new([self.identity()]),
      self.config.clone(),
      Arc::clone(&self.registry),
    )
  }

  pub fn system_manifest(&self, pod: &str) -> PathBuf {
    self.config.system_manifest_dir.join(format!("{}.yaml", pod))
  }

  pub fn system_unit(&self, unit: &str) -> PathBuf {
    self.config.system_unit_dir.join(unit)
  }
}
