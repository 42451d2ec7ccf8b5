//! Shared supervisor-reload registrations.
//!
//! Pods reconciled in the same execution context share a single reload
//! action. The registry hands out one [`SupervisorReload`] per
//! [`ContextKey`]; later requests for the same key get the same handle.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Identity of an execution context for registration purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextKey {
  System,
  User { name: String, uid: u32 },
}

impl fmt::Display for ContextKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ContextKey::System => write!(f, "system"),
      ContextKey::User { name, uid } => write!(f, "user:{}({})", name, uid),
    }
  }
}

/// The reload action registered for one context.
///
/// Reloads through the same handle are serialized.
#[derive(Debug)]
pub struct SupervisorReload {
  key: ContextKey,
  lock: tokio::sync::Mutex<()>,
  reloads: AtomicUsize,
}

impl SupervisorReload {
  fn new(key: ContextKey) -> Self {
    Self {
      key,
      lock: tokio::sync::Mutex::new(()),
      reloads: AtomicUsize::new(0),
    }
  }

  pub fn key(&self) -> &ContextKey {
    &self.key
  }

  /// Number of reloads completed through this handle.
  pub fn reload_count(&self) -> usize {
    self.reloads.load(Ordering::SeqCst)
  }

  /// Hold the reload slot for the duration of one reload.
  pub(crate) async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
    self.lock.lock().await
  }

  pub(crate) fn record_reload(&self) {
    self.reloads.fetch_add(1, Ordering::SeqCst);
  }
}

/// Keyed registry of reload actions.
#[derive(Debug, Default)]
pub struct ReloadRegistry {
  entries: Mutex<HashMap<ContextKey, Arc<SupervisorReload>>>,
}

impl ReloadRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Process-wide registry.
  pub fn global() -> Arc<ReloadRegistry> {
    static GLOBAL: OnceLock<Arc<ReloadRegistry>> = OnceLock::new();
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(ReloadRegistry::new())))
  }

  /// Return the reload action for `key`, registering it on first use.
  pub fn register(&self, key: ContextKey) -> Arc<SupervisorReload> {
    let mut entries = self.entries();
    entries
      .entry(key)
      .or_insert_with_key(|key| Arc::new(SupervisorReload::new(key.clone())))
      .clone()
  }

  pub fn len(&self) -> usize {
    self.entries().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<ContextKey, Arc<SupervisorReload>>> {
    // A panic while holding the lock cannot leave the map half-updated.
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
