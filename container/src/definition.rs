//! Declarative recipes describing how to build one service.

use crate::error::BoxError;
use crate::value::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A plain configurator callable, invoked with the freshly built instance.
pub type Callback = Arc<dyn Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync>;

/// A post-construction hook invoked with the new service instance.
#[derive(Clone)]
pub enum Configurator {
  /// A closure supplied directly by the host.
  Callable(Callback),
  /// The name of a function registered with `Container::register_function`.
  /// The name may carry placeholders.
  Function(String),
  /// A method on a target. The target may be a `Reference` (an instance
  /// configurator on that service), a class name (a static configurator), or
  /// any value that resolves to one of those.
  Method { target: Value, method: String },
}

impl Configurator {
  pub fn callable<F>(f: F) -> Self
  where
    F: Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    Configurator::Callable(Arc::new(f))
  }

  pub fn function(name: impl Into<String>) -> Self {
    Configurator::Function(name.into())
  }

  pub fn method(target: impl Into<Value>, method: impl Into<String>) -> Self {
    Configurator::Method {
      target: target.into(),
      method: method.into(),
    }
  }
}

impl fmt::Debug for Configurator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Configurator::Callable(_) => f.write_str("Callable(..)"),
      Configurator::Function(name) => f.debug_tuple("Function").field(name).finish(),
      Configurator::Method { target, method } => f
        .debug_struct("Method")
        .field("target", target)
        .field("method", method)
        .finish(),
    }
  }
}

/// A method to invoke on the instance after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
  pub method: String,
  pub arguments: Vec<Value>,
}

/// How to build one named service.
///
/// Setters return `&mut Self` so a definition obtained from
/// `Container::register` can be configured fluently:
///
/// ```
/// use fibre_container::{Container, Reference};
///
/// let mut container = Container::new();
/// container
///   .register("mailer", "Mailer")
///   .add_argument("%mailer.transport%")
///   .add_method_call("setLogger", vec![Reference::new("logger").into()])
///   .set_shared(false);
///
/// assert!(!container.get_definition("mailer").unwrap().is_shared());
/// ```
#[derive(Debug, Clone)]
pub struct Definition {
  class: String,
  arguments: Vec<Value>,
  method_calls: Vec<MethodCall>,
  configurator: Option<Configurator>,
  file: Option<String>,
  constructor: Option<String>,
  shared: bool,
  tags: Vec<(String, BTreeMap<String, Value>)>,
}

impl Definition {
  pub fn new(class: impl Into<String>) -> Self {
    Self {
      class: class.into(),
      arguments: Vec::new(),
      method_calls: Vec::new(),
      configurator: None,
      file: None,
      constructor: None,
      shared: true,
      tags: Vec::new(),
    }
  }

  // --- Class ---
  pub fn class(&self) -> &str {
    &self.class
  }
  pub fn set_class(&mut self, class: impl Into<String>) -> &mut Self {
    self.class = class.into();
    self
  }

  // --- Arguments ---
  pub fn arguments(&self) -> &[Value] {
    &self.arguments
  }
  pub fn set_arguments(&mut self, arguments: Vec<Value>) -> &mut Self {
    self.arguments = arguments;
    self
  }
  pub fn add_argument(&mut self, argument: impl Into<Value>) -> &mut Self {
    self.arguments.push(argument.into());
    self
  }
  pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
    self.add_argument(argument);
    self
  }

  // --- Method calls ---
  pub fn method_calls(&self) -> &[MethodCall] {
    &self.method_calls
  }
  pub fn set_method_calls(&mut self, calls: Vec<MethodCall>) -> &mut Self {
    self.method_calls = calls;
    self
  }
  pub fn add_method_call(&mut self, method: impl Into<String>, arguments: Vec<Value>) -> &mut Self {
    self.method_calls.push(MethodCall {
      method: method.into(),
      arguments,
    });
    self
  }
  pub fn with_method_call(mut self, method: impl Into<String>, arguments: Vec<Value>) -> Self {
    self.add_method_call(method, arguments);
    self
  }

  // --- Configurator ---
  pub fn configurator(&self) -> Option<&Configurator> {
    self.configurator.as_ref()
  }
  pub fn set_configurator(&mut self, configurator: Configurator) -> &mut Self {
    self.configurator = Some(configurator);
    self
  }
  pub fn with_configurator(mut self, configurator: Configurator) -> Self {
    self.configurator = Some(configurator);
    self
  }

  // --- File ---
  /// A path loaded once through the container's `FileLoader` before the
  /// service is instantiated. May carry placeholders.
  pub fn file(&self) -> Option<&str> {
    self.file.as_deref()
  }
  pub fn set_file(&mut self, file: impl Into<String>) -> &mut Self {
    self.file = Some(file.into());
    self
  }
  pub fn with_file(mut self, file: impl Into<String>) -> Self {
    self.file = Some(file.into());
    self
  }

  // --- Static factory ---
  /// The name of a factory method on the class used instead of its constructor.
  pub fn constructor(&self) -> Option<&str> {
    self.constructor.as_deref()
  }
  pub fn set_constructor(&mut self, method: impl Into<String>) -> &mut Self {
    self.constructor = Some(method.into());
    self
  }
  pub fn with_constructor(mut self, method: impl Into<String>) -> Self {
    self.constructor = Some(method.into());
    self
  }

  // --- Sharing ---
  pub fn is_shared(&self) -> bool {
    self.shared
  }
  pub fn set_shared(&mut self, shared: bool) -> &mut Self {
    self.shared = shared;
    self
  }
  pub fn with_shared(mut self, shared: bool) -> Self {
    self.shared = shared;
    self
  }

  // --- Tags ---
  pub fn tags(&self) -> &[(String, BTreeMap<String, Value>)] {
    &self.tags
  }
  /// Attaches a tag. The same tag may be added several times with different attributes.
  pub fn add_tag(&mut self, name: impl Into<String>, attributes: BTreeMap<String, Value>) -> &mut Self {
    self.tags.push((name.into(), attributes));
    self
  }
  pub fn with_tag(mut self, name: impl Into<String>, attributes: BTreeMap<String, Value>) -> Self {
    self.add_tag(name, attributes);
    self
  }
  /// Returns the attribute sets attached under `name`, in insertion order.
  pub fn tag(&self, name: &str) -> Vec<&BTreeMap<String, Value>> {
    self
      .tags
      .iter()
      .filter(|(tag, _)| tag == name)
      .map(|(_, attributes)| attributes)
      .collect()
  }
  pub fn clear_tags(&mut self) -> &mut Self {
    self.tags.clear();
    self
  }
}
