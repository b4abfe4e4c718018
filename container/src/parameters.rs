//! The parameter store the placeholder resolver reads from.

use crate::error::{Error, Result};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read access to named parameters. Names are case-insensitive: callers
/// lower-case them before lookup.
pub trait ParameterStore {
  fn has_parameter(&self, name: &str) -> bool;
  fn get_parameter(&self, name: &str) -> Option<Value>;
}

/// The default, thread-safe parameter store.
///
/// Names are lower-cased on insert and on lookup.
#[derive(Debug, Default)]
pub struct ParameterBag {
  parameters: RwLock<HashMap<String, Value>>,
}

impl ParameterBag {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&self, name: &str, value: impl Into<Value>) {
    self.parameters.write().insert(name.to_lowercase(), value.into());
  }

  /// Merges every entry of `parameters`, overwriting existing names.
  pub fn extend<I, K, V>(&self, parameters: I)
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
  {
    let mut guard = self.parameters.write();
    for (name, value) in parameters {
      guard.insert(name.as_ref().to_lowercase(), value.into());
    }
  }

  pub fn remove(&self, name: &str) -> Option<Value> {
    self.parameters.write().remove(&name.to_lowercase())
  }

  pub fn clear(&self) {
    self.parameters.write().clear();
  }

  pub fn len(&self) -> usize {
    self.parameters.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.parameters.read().is_empty()
  }

  /// A copy of all parameters.
  pub fn all(&self) -> HashMap<String, Value> {
    self.parameters.read().clone()
  }

  // --- Configuration loading ---

  /// Loads a YAML mapping of parameters, e.g. `mailer.transport: smtp`.
  pub fn from_yaml_str(source: &str) -> Result<Self> {
    if source.trim().is_empty() {
      return Ok(Self::new());
    }
    let parsed: Option<HashMap<String, Value>> =
      serde_yaml::from_str(source).map_err(|e| Error::ParameterParse(e.to_string()))?;
    Ok(Self::from_map(parsed.unwrap_or_default()))
  }

  /// Loads a JSON object of parameters.
  pub fn from_json_str(source: &str) -> Result<Self> {
    let parsed: HashMap<String, Value> =
      serde_json::from_str(source).map_err(|e| Error::ParameterParse(e.to_string()))?;
    Ok(Self::from_map(parsed))
  }

  /// Loads parameters from a `.json`, `.yaml` or `.yml` file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let source = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => Self::from_json_str(&source),
      Some("yaml") | Some("yml") => Self::from_yaml_str(&source),
      other => Err(Error::ParameterParse(format!(
        "unsupported parameter file extension: {:?}",
        other.unwrap_or("")
      ))),
    }
  }

  fn from_map(map: HashMap<String, Value>) -> Self {
    let bag = Self::new();
    bag.extend(map);
    bag
  }
}

impl ParameterStore for ParameterBag {
  fn has_parameter(&self, name: &str) -> bool {
    self.parameters.read().contains_key(&name.to_lowercase())
  }

  fn get_parameter(&self, name: &str) -> Option<Value> {
    self.parameters.read().get(&name.to_lowercase()).cloned()
  }
}

impl ParameterStore for HashMap<String, Value> {
  fn has_parameter(&self, name: &str) -> bool {
    self.contains_key(name)
  }

  fn get_parameter(&self, name: &str) -> Option<Value> {
    self.get(name).cloned()
  }
}
