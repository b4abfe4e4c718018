//! The dynamic value model shared by definitions, parameters and the resolvers.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A built service instance, shared by the container and its callers.
pub type Service = Arc<dyn Any + Send + Sync>;

/// What to do when a [`Reference`] points at a service that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InvalidBehavior {
  /// Fail the build with `Error::ServiceNotFound`.
  #[default]
  Fail,
  /// Substitute `Value::Null`.
  Null,
}

/// A marker meaning "substitute the built instance of service `id` here".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
  id: String,
  invalid_behavior: InvalidBehavior,
}

impl Reference {
  pub fn new(id: impl Into<String>) -> Self {
    Self::with_behavior(id, InvalidBehavior::Fail)
  }

  pub fn with_behavior(id: impl Into<String>, invalid_behavior: InvalidBehavior) -> Self {
    Self {
      id: id.into(),
      invalid_behavior,
    }
  }

  /// A reference that resolves to `Value::Null` when the target is missing.
  pub fn optional(id: impl Into<String>) -> Self {
    Self::with_behavior(id, InvalidBehavior::Null)
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn invalid_behavior(&self) -> InvalidBehavior {
    self.invalid_behavior
  }
}

impl fmt::Display for Reference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.id)
  }
}

/// Any value that can appear in a definition or a parameter.
///
/// Resolution works by explicit case analysis over these variants: strings may
/// carry `%placeholders%`, `Reference`s are replaced by built services, and
/// lists and maps are walked recursively.
#[derive(Clone, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  List(Vec<Value>),
  Map(BTreeMap<String, Value>),
  Reference(Reference),
  Service(Service),
}

impl Value {
  /// A short name for the variant, used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::String(_) => "string",
      Value::List(_) => "list",
      Value::Map(_) => "map",
      Value::Reference(_) => "reference",
      Value::Service(_) => "service",
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Float(f) => Some(*f),
      Value::Int(i) => Some(*i as f64),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
    match self {
      Value::Map(map) => Some(map),
      _ => None,
    }
  }

  pub fn as_service(&self) -> Option<&Service> {
    match self {
      Value::Service(service) => Some(service),
      _ => None,
    }
  }

  /// Downcasts a `Value::Service` to a concrete type.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self.as_service().and_then(|s| s.clone().downcast::<T>().ok())
  }

  /// Text form used for embedded placeholder substitution.
  ///
  /// Lists join their items with `,`, maps render as `key=value` pairs joined
  /// the same way, a reference renders as its target id and a service as the
  /// fixed label `service`.
  pub fn to_text(&self) -> String {
    match self {
      Value::Null => String::new(),
      Value::Bool(b) => b.to_string(),
      Value::Int(i) => i.to_string(),
      Value::Float(f) => f.to_string(),
      Value::String(s) => s.clone(),
      Value::List(items) => items.iter().map(Value::to_text).collect::<Vec<_>>().join(","),
      Value::Map(map) => map
        .iter()
        .map(|(key, value)| format!("{}={}", key, value.to_text()))
        .collect::<Vec<_>>()
        .join(","),
      Value::Reference(reference) => reference.id.clone(),
      Value::Service(_) => "service".to_owned(),
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => f.write_str("Null"),
      Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
      Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
      Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
      Value::String(s) => f.debug_tuple("String").field(s).finish(),
      Value::List(items) => f.debug_tuple("List").field(items).finish(),
      Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
      Value::Reference(r) => f.debug_tuple("Reference").field(&r.id).finish(),
      Value::Service(s) => write!(f, "Service({:p})", Arc::as_ptr(s)),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::List(a), Value::List(b)) => a == b,
      (Value::Map(a), Value::Map(b)) => a == b,
      (Value::Reference(a), Value::Reference(b)) => a == b,
      // Services compare by identity.
      (Value::Service(a), Value::Service(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Int(value)
  }
}

impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Value::Int(value.into())
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Self {
    Value::Float(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_owned())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl From<Reference> for Value {
  fn from(value: Reference) -> Self {
    Value::Reference(value)
  }
}

impl From<Service> for Value {
  fn from(value: Service) -> Self {
    Value::Service(value)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(values: Vec<T>) -> Self {
    Value::List(values.into_iter().map(Into::into).collect())
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map_or(Value::Null, Into::into)
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
  }
}

// Parameters are plain data, so deserialization never produces references or services.
impl<'de> Deserialize<'de> for Value {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct ValueVisitor;

    impl<'de> Visitor<'de> for ValueVisitor {
      type Value = Value;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a parameter value")
      }

      fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
      }

      fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
      }

      fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        match i64::try_from(v) {
          Ok(i) => Ok(Value::Int(i)),
          Err(_) => Ok(Value::Float(v as f64)),
        }
      }

      fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
      }

      fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
      }

      fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
      }

      fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
      }

      fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
      }

      fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Deserialize::deserialize(deserializer)
      }

      fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
          items.push(item);
        }
        Ok(Value::List(items))
      }

      fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
          map.insert(key, value);
        }
        Ok(Value::Map(map))
      }
    }

    deserializer.deserialize_any(ValueVisitor)
  }
}
