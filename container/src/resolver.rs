//! Placeholder substitution: `%name%` markers resolved against a parameter store.

use crate::error::{Error, Result};
use crate::parameters::ParameterStore;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;

// A string that is exactly one placeholder keeps the parameter's native type.
static WHOLE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^%([^%]+)%$").unwrap());

// Leftmost-first alternation: `%%text%%` escapes win over `%name%` at the same
// position, and a lone `%%` collapses to `%`.
static EMBEDDED_PLACEHOLDER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"%%([^%]*)%%|%([^%]+)%|%%").unwrap());

/// Resolves every placeholder inside `value`.
///
/// Lists and maps are walked recursively (map keys included). A string that is
/// entirely one `%name%` placeholder is replaced by the parameter value as-is;
/// placeholders embedded in a longer string are substituted as text. Any
/// other value is returned unchanged.
///
/// ```
/// use fibre_container::{resolve_value, ParameterBag, Value};
///
/// let params = ParameterBag::new();
/// params.set("debug", true);
///
/// assert_eq!(resolve_value(&"%debug%".into(), &params).unwrap(), Value::Bool(true));
/// assert_eq!(resolve_value(&"x=%debug%".into(), &params).unwrap(), Value::from("x=true"));
/// assert_eq!(resolve_value(&"%%debug%%".into(), &params).unwrap(), Value::from("%debug%"));
/// ```
pub fn resolve_value(value: &Value, parameters: &dyn ParameterStore) -> Result<Value> {
  match value {
    Value::List(items) => items
      .iter()
      .map(|item| resolve_value(item, parameters))
      .collect::<Result<Vec<_>>>()
      .map(Value::List),
    Value::Map(map) => {
      let mut resolved = BTreeMap::new();
      for (key, item) in map {
        resolved.insert(resolve_key(key, parameters)?, resolve_value(item, parameters)?);
      }
      Ok(Value::Map(resolved))
    }
    Value::String(s) => resolve_string(s, parameters),
    other => Ok(other.clone()),
  }
}

/// Resolves placeholders in a string, preserving the parameter's type when
/// the whole string is a single placeholder.
pub fn resolve_string(s: &str, parameters: &dyn ParameterStore) -> Result<Value> {
  if let Some(caps) = WHOLE_PLACEHOLDER.captures(s) {
    return lookup(&caps[1], parameters);
  }
  resolve_embedded(s, parameters).map(Value::String)
}

/// Resolves placeholders in a string and always returns text.
pub fn resolve_text(s: &str, parameters: &dyn ParameterStore) -> Result<String> {
  if let Some(caps) = WHOLE_PLACEHOLDER.captures(s) {
    return lookup(&caps[1], parameters).map(|value| value.to_text());
  }
  resolve_embedded(s, parameters)
}

fn resolve_key(key: &str, parameters: &dyn ParameterStore) -> Result<String> {
  resolve_text(key, parameters)
}

fn resolve_embedded(s: &str, parameters: &dyn ParameterStore) -> Result<String> {
  let mut out = String::with_capacity(s.len());
  let mut last = 0;
  for caps in EMBEDDED_PLACEHOLDER.captures_iter(s) {
    let Some(whole) = caps.get(0) else {
      continue;
    };
    out.push_str(&s[last..whole.start()]);
    out.push_str(&substitute(&caps, parameters)?);
    last = whole.end();
  }
  out.push_str(&s[last..]);
  Ok(out)
}

fn substitute(caps: &Captures<'_>, parameters: &dyn ParameterStore) -> Result<String> {
  if let Some(escaped) = caps.get(1) {
    return Ok(format!("%{}%", escaped.as_str()));
  }
  match caps.get(2) {
    Some(name) => lookup(name.as_str(), parameters).map(|value| value.to_text()),
    None => Ok("%".to_string()),
  }
}

fn lookup(name: &str, parameters: &dyn ParameterStore) -> Result<Value> {
  let name = name.to_lowercase();
  parameters
    .get_parameter(&name)
    .ok_or(Error::UndefinedParameter(name))
}
