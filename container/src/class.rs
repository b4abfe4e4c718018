//! Registered classes: the host-supplied construction functions a definition's
//! `class` name is looked up against.

use crate::error::BoxError;
use crate::value::Value;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// An instance under construction. It is only shared once every method call
/// and the configurator have run.
pub type Instance = Box<dyn Any + Send + Sync>;

pub(crate) type Constructor = Arc<dyn Fn(&Arguments) -> Result<Instance, BoxError> + Send + Sync>;
pub(crate) type DefaultConstructor = Arc<dyn Fn() -> Instance + Send + Sync>;
pub(crate) type Method = Arc<dyn Fn(&mut dyn Any, &Arguments) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type InstanceConfigurator =
  Arc<dyn Fn(&dyn Any, &mut dyn Any) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type StaticConfigurator = Arc<dyn Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync>;

/// Errors raised by the typed accessors on [`Arguments`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
  #[error("missing argument at position {0}")]
  Missing(usize),
  #[error("argument {index} must be {expected}, got {actual}")]
  Type {
    index: usize,
    expected: &'static str,
    actual: &'static str,
  },
}

/// Fully resolved positional arguments handed to constructors and methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
  pub fn new(values: Vec<Value>) -> Self {
    Self(values)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn values(&self) -> &[Value] {
    &self.0
  }

  pub fn into_values(self) -> Vec<Value> {
    self.0
  }

  pub fn get(&self, index: usize) -> Result<&Value, ArgumentError> {
    self.0.get(index).ok_or(ArgumentError::Missing(index))
  }

  fn mismatch(&self, index: usize, expected: &'static str) -> ArgumentError {
    ArgumentError::Type {
      index,
      expected,
      actual: self.0[index].kind(),
    }
  }

  pub fn string(&self, index: usize) -> Result<String, ArgumentError> {
    self
      .get(index)?
      .as_str()
      .map(str::to_owned)
      .ok_or_else(|| self.mismatch(index, "string"))
  }

  pub fn bool(&self, index: usize) -> Result<bool, ArgumentError> {
    self
      .get(index)?
      .as_bool()
      .ok_or_else(|| self.mismatch(index, "bool"))
  }

  pub fn int(&self, index: usize) -> Result<i64, ArgumentError> {
    self
      .get(index)?
      .as_i64()
      .ok_or_else(|| self.mismatch(index, "int"))
  }

  pub fn float(&self, index: usize) -> Result<f64, ArgumentError> {
    self
      .get(index)?
      .as_f64()
      .ok_or_else(|| self.mismatch(index, "float"))
  }

  /// Returns the built service at `index`, downcast to `T`.
  pub fn service<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
    self
      .get(index)?
      .downcast::<T>()
      .ok_or_else(|| self.mismatch(index, type_name::<T>()))
  }

  /// Like [`Arguments::service`], but a missing argument or `Value::Null`
  /// yields `None`.
  pub fn optional_service<T: Any + Send + Sync>(
    &self,
    index: usize,
  ) -> Result<Option<Arc<T>>, ArgumentError> {
    match self.0.get(index) {
      None | Some(Value::Null) => Ok(None),
      Some(_) => self.service(index).map(Some),
    }
  }
}

impl From<Vec<Value>> for Arguments {
  fn from(values: Vec<Value>) -> Self {
    Self(values)
  }
}

pub(crate) enum Instantiator {
  /// An explicit constructor receiving the definition's arguments.
  Constructor(Constructor),
  /// No explicit constructor: built with no arguments.
  Default(DefaultConstructor),
}

/// A type-erased class: how to construct, call methods on, and configure with
/// instances of one concrete type.
pub struct Class {
  name: String,
  type_id: TypeId,
  type_name: &'static str,
  pub(crate) instantiator: Option<Instantiator>,
  pub(crate) factories: HashMap<String, Constructor>,
  pub(crate) methods: HashMap<String, Method>,
  pub(crate) configurators: HashMap<String, InstanceConfigurator>,
  pub(crate) static_configurators: HashMap<String, StaticConfigurator>,
}

impl Class {
  /// Starts describing a class named `name` whose instances are of type `T`.
  pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> ClassBuilder<T> {
    ClassBuilder {
      class: Class {
        name: name.into(),
        type_id: TypeId::of::<T>(),
        type_name: type_name::<T>(),
        instantiator: None,
        factories: HashMap::new(),
        methods: HashMap::new(),
        configurators: HashMap::new(),
        static_configurators: HashMap::new(),
      },
      _marker: PhantomData,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn has_constructor(&self) -> bool {
    matches!(self.instantiator, Some(Instantiator::Constructor(_)))
  }

  pub fn has_method(&self, method: &str) -> bool {
    self.methods.contains_key(method)
  }
}

impl fmt::Debug for Class {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Class")
      .field("name", &self.name)
      .field("type", &self.type_name)
      .field("factories", &self.factories.keys().collect::<Vec<_>>())
      .field("methods", &self.methods.keys().collect::<Vec<_>>())
      .finish()
  }
}

fn downcast_mut<T: Any>(instance: &mut dyn Any) -> Result<&mut T, BoxError> {
  instance
    .downcast_mut::<T>()
    .ok_or_else(|| format!("instance is not a {}", type_name::<T>()).into())
}

/// Typed builder for a [`Class`].
///
/// ```
/// use fibre_container::Class;
///
/// struct Mailer { transport: String, name: Option<String> }
///
/// let class = Class::builder::<Mailer>("Mailer")
///   .constructor(|args| Ok(Mailer { transport: args.string(0)?, name: None }))
///   .method("setName", |mailer, args| {
///     mailer.name = Some(args.string(0)?);
///     Ok(())
///   })
///   .build();
///
/// assert!(class.has_method("setName"));
/// ```
pub struct ClassBuilder<T> {
  class: Class,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
  /// An explicit constructor receiving the resolved definition arguments.
  pub fn constructor<F>(mut self, f: F) -> Self
  where
    F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
  {
    self.class.instantiator = Some(Instantiator::Constructor(Arc::new(
      move |args: &Arguments| -> Result<Instance, BoxError> { Ok(Box::new(f(args)?)) },
    )));
    self
  }

  /// Marks the class as having no explicit constructor. Any arguments in the
  /// definition are ignored when it is instantiated.
  pub fn default_constructor<F>(mut self, f: F) -> Self
  where
    F: Fn() -> T + Send + Sync + 'static,
  {
    self.class.instantiator = Some(Instantiator::Default(Arc::new(move || {
      Box::new(f()) as Instance
    })));
    self
  }

  /// A static factory method, selected by `Definition::set_constructor`.
  pub fn factory<F>(mut self, name: impl Into<String>, f: F) -> Self
  where
    F: Fn(&Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
  {
    self.class.factories.insert(
      name.into(),
      Arc::new(move |args: &Arguments| -> Result<Instance, BoxError> {
        Ok(Box::new(f(args)?))
      }),
    );
    self
  }

  /// A method that definitions may list in their method calls.
  pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
  where
    F: Fn(&mut T, &Arguments) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    self.class.methods.insert(
      name.into(),
      Arc::new(
        move |instance: &mut dyn Any, args: &Arguments| -> Result<(), BoxError> {
          f(downcast_mut::<T>(instance)?, args)
        },
      ),
    );
    self
  }

  /// A method on a built `T` that configures other services. Selected by a
  /// `Configurator::Method` whose target is a reference to a `T` service.
  pub fn configurator<F>(mut self, name: impl Into<String>, f: F) -> Self
  where
    F: Fn(&T, &mut dyn Any) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    self.class.configurators.insert(
      name.into(),
      Arc::new(move |target: &dyn Any, instance: &mut dyn Any| -> Result<(), BoxError> {
        let target = target
          .downcast_ref::<T>()
          .ok_or_else(|| BoxError::from(format!("target is not a {}", type_name::<T>())))?;
        f(target, instance)
      }),
    );
    self
  }

  /// A static configurator. Selected by a `Configurator::Method` whose target
  /// resolves to this class's name.
  pub fn static_configurator<F>(mut self, name: impl Into<String>, f: F) -> Self
  where
    F: Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    self.class.static_configurators.insert(name.into(), Arc::new(f));
    self
  }

  pub fn build(self) -> Class {
    self.class
  }
}

/// Classes indexed by name, with a reverse index by concrete type so that a
/// built service can be mapped back to its class.
#[derive(Debug, Default)]
pub(crate) struct ClassRegistry {
  classes: HashMap<String, Arc<Class>>,
  by_type: HashMap<TypeId, String>,
}

impl ClassRegistry {
  pub(crate) fn insert(&mut self, class: Class) {
    let class = Arc::new(class);
    self.by_type.insert(class.type_id, class.name.clone());
    self.classes.insert(class.name.clone(), class);
  }

  pub(crate) fn get(&self, name: &str) -> Option<Arc<Class>> {
    self.classes.get(name).cloned()
  }

  pub(crate) fn contains(&self, name: &str) -> bool {
    self.classes.contains_key(name)
  }

  /// Finds the class of a built instance.
  pub(crate) fn of_instance(&self, instance: &(dyn Any + Send + Sync)) -> Option<Arc<Class>> {
    let type_id = instance.type_id();
    self.by_type.get(&type_id).and_then(|name| self.get(name))
  }
}
