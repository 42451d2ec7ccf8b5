//! Typed flag builder for flags-only pods.
//!
//! A flag mapping is an ordered list of `key -> value` pairs. Expansion into
//! runtime arguments is a pure function:
//!
//! | Value | Arguments |
//! |-------|-----------|
//! | scalar `v` | `--key=v` |
//! | list `[a, b]` | `--key=a --key=b` |
//! | `true` | `--key` |
//! | `false` / `null` | nothing |

use serde_json::Value;

use super::types::{ValidationError, validate_name};

/// The flag consumed as the pod name instead of being forwarded.
pub const NAME_FLAG: &str = "name";

/// A single flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
  /// Emitted once as `--key=value`.
  Scalar(String),
  /// Emitted once per element as `--key=element`.
  List(Vec<String>),
  /// A bare `--key` when true, omitted when false.
  Switch(bool),
}

impl FlagValue {
  fn from_json(key: &str, value: &Value) -> Result<Self, ValidationError> {
    match value {
      Value::Null => Ok(FlagValue::Switch(false)),
      Value::Bool(b) => Ok(FlagValue::Switch(*b)),
      Value::String(s) => Ok(FlagValue::Scalar(s.clone())),
      Value::Number(n) => Ok(FlagValue::Scalar(n.to_string())),
      Value::Array(items) => {
        let mut list = Vec::with_capacity(items.len());
        for item in items {
          match item {
            Value::String(s) => list.push(s.clone()),
            Value::Number(n) => list.push(n.to_string()),
            Value::Bool(b) => list.push(b.to_string()),
            _ => {
              return Err(ValidationError::InvalidFlag {
                key: key.to_string(),
                reason: "list elements must be scalars".to_string(),
              });
            }
          }
        }
        Ok(FlagValue::List(list))
      }
      Value::Object(_) => Err(ValidationError::InvalidFlag {
        key: key.to_string(),
        reason: "nested maps are not supported".to_string(),
      }),
    }
  }
}

/// Ordered flags for `pod create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodFlags {
  entries: Vec<(String, FlagValue)>,
}

impl PodFlags {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a flag, replacing any earlier value under the same key.
  pub fn with(mut self, key: impl Into<String>, value: FlagValue) -> Self {
    self.insert(key.into(), value);
    self
  }

  pub fn insert(&mut self, key: String, value: FlagValue) {
    if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
      slot.1 = value;
    } else {
      self.entries.push((key, value));
    }
  }

  /// Parse a flag mapping from a generic tree.
  ///
  /// Keys keep the order of the map they come from.
  pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
    let Value::Object(map) = value else {
      return Err(ValidationError::NotAnObject);
    };

    let mut flags = PodFlags::new();
    for (key, value) in map {
      validate_key(key)?;
      flags.insert(key.clone(), FlagValue::from_json(key, value)?);
    }
    Ok(flags)
  }

  pub fn get(&self, key: &str) -> Option<&FlagValue> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Resolve the pod name: an explicit `name` flag wins over `identifier`.
  pub fn pod_name(&self, identifier: &str) -> Result<String, ValidationError> {
    let name = match self.get(NAME_FLAG) {
      Some(FlagValue::Scalar(name)) => name.as_str(),
      Some(FlagValue::Switch(false)) | None => identifier,
      Some(_) => {
        return Err(ValidationError::InvalidFlag {
          key: NAME_FLAG.to_string(),
          reason: "must be a single string".to_string(),
        });
      }
    };

    if name.trim().is_empty() {
      return Err(ValidationError::MissingName);
    }
    validate_name(name)?;
    Ok(name.to_string())
  }

  /// Expand into runtime arguments, skipping the `name` flag.
  pub fn to_args(&self) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in &self.entries {
      if key == NAME_FLAG {
        continue;
      }
      match value {
        FlagValue::Scalar(v) => args.push(format!("--{}={}", key, v)),
        FlagValue::List(items) => args.extend(items.iter().map(|v| format!("--{}={}", key, v))),
        FlagValue::Switch(true) => args.push(format!("--{}", key)),
        FlagValue::Switch(false) => {}
      }
    }
    args
  }
}

fn validate_key(key: &str) -> Result<(), ValidationError> {
  let reason = if key.is_empty() {
    "key is empty"
  } else if key.starts_with('-') {
    "key must not carry leading dashes"
  } else if key.contains('=') || key.chars().any(char::is_whitespace) {
    "key must not contain '=' or whitespace"
  } else {
    return Ok(());
  };

  Err(ValidationError::InvalidFlag {
    key: key.to_string(),
    reason: reason.to_string(),
  })
}
