//! The main `Container` struct and its associated methods.

use crate::class::{Class, ClassRegistry};
use crate::core::{LoadingGuard, LoadingSet, ServiceState};
use crate::definition::{Callback, Definition};
use crate::error::{BoxError, Error, Result};
use crate::loader::{FileLoader, FsLoader};
use crate::parameters::{ParameterBag, ParameterStore};
use crate::registry::ServiceRegistry;
use crate::resolver;
use crate::value::{InvalidBehavior, Reference, Service, Value};
use parking_lot::{Mutex, ReentrantMutex};
use std::any::{type_name, Any};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, trace};

/// The service container.
///
/// It owns the definition table and builds services lazily on first request.
/// Registration methods take `&mut self`; lookups take `&self`, so a
/// definition can never be mutated while a build that reads it is in flight.
///
/// Builds are serialized by a container-scoped reentrant lock: the building
/// thread may recursively build dependencies while other threads wait, and a
/// shared service is built at most once.
pub struct Container {
  definitions: HashMap<String, Definition>,
  aliases: HashMap<String, String>,
  pub(crate) classes: ClassRegistry,
  pub(crate) functions: HashMap<String, Callback>,
  pub(crate) parameters: ParameterBag,
  services: ServiceRegistry,
  pub(crate) loader: Arc<dyn FileLoader>,
  pub(crate) loaded_files: Mutex<HashSet<PathBuf>>,
  build_lock: ReentrantMutex<()>,
  loading: LoadingSet,
}

impl Default for Container {
  fn default() -> Self {
    Self {
      definitions: HashMap::new(),
      aliases: HashMap::new(),
      classes: ClassRegistry::default(),
      functions: HashMap::new(),
      parameters: ParameterBag::default(),
      services: ServiceRegistry::default(),
      loader: Arc::new(FsLoader),
      loaded_files: Mutex::new(HashSet::new()),
      build_lock: ReentrantMutex::new(()),
      loading: LoadingSet::default(),
    }
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("definitions", &self.definitions)
      .field("aliases", &self.aliases)
      .field("classes", &self.classes)
      .field("functions", &self.functions.keys().collect::<Vec<_>>())
      .field("parameters", &self.parameters)
      .field("services", &self.services.ids())
      .finish()
  }
}

impl Container {
  /// Creates a new, empty `Container`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a container reading placeholders from `parameters`.
  pub fn with_parameters(parameters: ParameterBag) -> Self {
    Self {
      parameters,
      ..Self::default()
    }
  }

  /// Replaces the loader used for definitions' `file` attribute.
  pub fn with_loader(mut self, loader: impl FileLoader + 'static) -> Self {
    self.loader = Arc::new(loader);
    self
  }

  // --- Classes and functions ---

  /// Registers `class` under its name, replacing any class of the same name.
  pub fn register_class(&mut self, class: Class) -> &mut Self {
    self.classes.insert(class);
    self
  }

  /// Returns `true` if a class named `name` is registered.
  pub fn has_class(&self, name: &str) -> bool {
    self.classes.contains(name)
  }

  /// Registers a named function usable as `Configurator::Function`.
  pub fn register_function<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
  where
    F: Fn(&mut dyn Any) -> Result<(), BoxError> + Send + Sync + 'static,
  {
    self.functions.insert(name.into(), Arc::new(f));
    self
  }

  // --- Parameters ---

  /// The parameter store placeholders are resolved against.
  pub fn parameters(&self) -> &ParameterBag {
    &self.parameters
  }

  /// Sets the parameter `name` (lower-cased) to `value`.
  pub fn set_parameter(&self, name: &str, value: impl Into<Value>) {
    self.parameters.set(name, value);
  }

  /// Returns `true` if the parameter `name` is defined, ignoring case.
  pub fn has_parameter(&self, name: &str) -> bool {
    self.parameters.has_parameter(name)
  }

  /// Returns the parameter `name`, or `Error::UndefinedParameter`.
  pub fn get_parameter(&self, name: &str) -> Result<Value> {
    self
      .parameters
      .get_parameter(name)
      .ok_or_else(|| Error::UndefinedParameter(name.to_lowercase()))
  }

  // --- Definitions ---

  /// Registers a new definition for `id` and returns it for further
  /// configuration. Any existing definition at `id` is replaced.
  pub fn register(&mut self, id: impl Into<String>, class: impl Into<String>) -> &mut Definition {
    self.set_definition(id, Definition::new(class))
  }

  /// Stores `definition` at `id`, replacing any definition or alias there,
  /// and returns it for further configuration.
  pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) -> &mut Definition {
    let id = id.into();
    self.aliases.remove(&id);
    match self.definitions.entry(id) {
      Entry::Occupied(mut entry) => {
        entry.insert(definition);
        entry.into_mut()
      }
      Entry::Vacant(entry) => entry.insert(definition),
    }
  }

  /// Sets every definition in `definitions`, in iteration order.
  pub fn set_definitions<I, K>(&mut self, definitions: I)
  where
    I: IntoIterator<Item = (K, Definition)>,
    K: Into<String>,
  {
    for (id, definition) in definitions {
      self.set_definition(id, definition);
    }
  }

  /// Returns `true` if a definition exists at `id`. Aliases are not followed.
  pub fn has_definition(&self, id: &str) -> bool {
    self.definitions.contains_key(id)
  }

  /// Returns the definition at `id`, or `Error::DefinitionNotFound`.
  pub fn get_definition(&self, id: &str) -> Result<&Definition> {
    self
      .definitions
      .get(id)
      .ok_or_else(|| Error::DefinitionNotFound(id.to_owned()))
  }

  /// Mutable access to the definition at `id`. Changes apply to later builds only.
  pub fn get_definition_mut(&mut self, id: &str) -> Result<&mut Definition> {
    self
      .definitions
      .get_mut(id)
      .ok_or_else(|| Error::DefinitionNotFound(id.to_owned()))
  }

  /// Removes and returns the definition at `id`. An already-built instance stays cached.
  pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
    self.definitions.remove(id)
  }

  /// A snapshot of the definition table. Changes to it do not affect the container.
  pub fn definitions(&self) -> HashMap<String, Definition> {
    self.definitions.clone()
  }

  // --- Aliases ---

  /// Makes `alias` resolve to the service `id`.
  pub fn set_alias(&mut self, alias: impl Into<String>, id: impl Into<String>) -> &mut Self {
    self.aliases.insert(alias.into(), id.into());
    self
  }

  /// Returns `true` if `alias` is a registered alias.
  pub fn has_alias(&self, alias: &str) -> bool {
    self.aliases.contains_key(alias)
  }

  /// Every alias and the id it points to.
  pub fn aliases(&self) -> &HashMap<String, String> {
    &self.aliases
  }

  fn resolve_alias<'a>(&'a self, id: &'a str) -> &'a str {
    self.aliases.get(id).map_or(id, String::as_str)
  }

  // --- Tags ---

  /// Returns the ids of every definition tagged `tag`, with the attribute
  /// sets attached to each.
  pub fn find_tagged_service_ids(&self, tag: &str) -> BTreeMap<String, Vec<BTreeMap<String, Value>>> {
    self
      .definitions
      .iter()
      .filter_map(|(id, definition)| {
        let attributes: Vec<_> = definition.tag(tag).into_iter().cloned().collect();
        (!attributes.is_empty()).then(|| (id.clone(), attributes))
      })
      .collect()
  }

  // --- Services ---

  /// Returns `true` if `id` (after following aliases) has a definition or a
  /// built instance.
  pub fn has_service(&self, id: &str) -> bool {
    let id = self.resolve_alias(id);
    self.definitions.contains_key(id) || self.services.has(id)
  }

  /// Stores an already-built instance under `id`, bypassing definitions.
  pub fn set_service(&self, id: impl Into<String>, service: Service) {
    self.services.set(id, service);
  }

  /// Convenience for `set_service` with a value that is not yet in an `Arc`.
  pub fn add_instance<T: Any + Send + Sync>(&self, id: impl Into<String>, instance: T) {
    self.services.set(id, Arc::new(instance));
  }

  /// Returns the service `id`, building it on first request.
  ///
  /// Shared services are cached and returned as the same instance on every
  /// call; non-shared services are built fresh each time.
  pub fn get_service(&self, id: &str) -> Result<Service> {
    let id = self.resolve_alias(id);
    if let Some(service) = self.services.get(id) {
      trace!(service = id, "service already built");
      return Ok(service);
    }

    let _build = self.build_lock.lock();
    // Another thread may have built it while we waited for the lock.
    if let Some(service) = self.services.get(id) {
      return Ok(service);
    }

    let definition = self
      .definitions
      .get(id)
      .ok_or_else(|| Error::ServiceNotFound(id.to_owned()))?;

    let _guard = LoadingGuard::enter(&self.loading, id)?;
    debug!(service = id, class = definition.class(), "building service");
    let service = self.create_service(definition)?;

    if definition.is_shared() {
      self.services.set(id, service.clone());
    }
    debug!(service = id, shared = definition.is_shared(), "service built");
    Ok(service)
  }

  /// Returns the service `id` downcast to `T`.
  pub fn get<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
    self
      .get_service(id)?
      .downcast::<T>()
      .map_err(|_| Error::TypeMismatch {
        id: id.to_owned(),
        expected: type_name::<T>(),
      })
  }

  /// Builds every defined service and returns them together with every
  /// already-built instance.
  ///
  /// This is expensive and meant for diagnostics and tests.
  pub fn get_services(&self) -> Result<HashMap<String, Service>> {
    let mut services = self.services.snapshot();
    for id in self.definitions.keys() {
      services.insert(id.clone(), self.get_service(id)?);
    }
    Ok(services)
  }

  /// Every known id: definitions, aliases and built services, sorted.
  pub fn service_ids(&self) -> Vec<String> {
    let mut ids: BTreeSet<String> = self.definitions.keys().cloned().collect();
    ids.extend(self.aliases.keys().cloned());
    ids.extend(self.services.ids());
    ids.into_iter().collect()
  }

  /// Reports whether `id` is built, under construction or neither.
  ///
  /// This never waits for an in-flight build, so other threads observe
  /// `Building` while the build runs.
  pub fn service_state(&self, id: &str) -> ServiceState {
    let id = self.resolve_alias(id);
    if self.services.has(id) {
      ServiceState::Built
    } else if self.loading.lock().contains(id) {
      ServiceState::Building
    } else {
      ServiceState::Unbuilt
    }
  }

  // --- Resolution ---

  /// Resolves `%placeholders%` in `value` against this container's parameters.
  pub fn resolve_value(&self, value: &Value) -> Result<Value> {
    resolver::resolve_value(value, &self.parameters)
  }

  /// Replaces every `Reference` in `value` with the built service it names.
  /// Map keys are left untouched.
  pub fn resolve_services(&self, value: Value) -> Result<Value> {
    match value {
      Value::List(items) => items
        .into_iter()
        .map(|item| self.resolve_services(item))
        .collect::<Result<Vec<_>>>()
        .map(Value::List),
      Value::Map(map) => map
        .into_iter()
        .map(|(key, item)| Ok((key, self.resolve_services(item)?)))
        .collect::<Result<BTreeMap<_, _>>>()
        .map(Value::Map),
      Value::Reference(reference) => self.resolve_reference(&reference),
      other => Ok(other),
    }
  }

  pub(crate) fn resolve_reference(&self, reference: &Reference) -> Result<Value> {
    match self.get_service(reference.id()) {
      Ok(service) => Ok(Value::Service(service)),
      Err(Error::ServiceNotFound(_))
        if reference.invalid_behavior() == InvalidBehavior::Null
          && !self.has_service(reference.id()) =>
      {
        Ok(Value::Null)
      }
      Err(e) => Err(e),
    }
  }

  /// Runs both resolution passes: placeholders first, then references.
  pub(crate) fn resolve_arguments(&self, arguments: &[Value]) -> Result<Vec<Value>> {
    arguments
      .iter()
      .map(|argument| self.resolve_services(self.resolve_value(argument)?))
      .collect()
  }
}
