//! The instantiation engine: turns one `Definition` into one service instance.

use crate::class::{Arguments, Class, Instance, Instantiator};
use crate::container::Container;
use crate::definition::{Configurator, Definition};
use crate::error::{Error, Result};
use crate::resolver::resolve_text;
use crate::value::{Service, Value};
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{trace, warn};

impl Container {
  /// Builds a fresh instance from `definition`.
  ///
  /// The steps run in order: load the file, resolve the class, resolve the
  /// arguments (placeholders, then references), instantiate, apply method
  /// calls, apply the configurator. Any failure aborts the build; side effects
  /// of earlier steps are not rolled back.
  pub(crate) fn create_service(&self, definition: &Definition) -> Result<Service> {
    if let Some(file) = definition.file() {
      self.load_file(file)?;
    }

    let class_name = match self.resolve_value(&Value::from(definition.class()))? {
      Value::String(name) => name,
      other => return Err(Error::InvalidClassName(other.kind().to_owned())),
    };
    let class = self
      .classes
      .get(&class_name)
      .ok_or_else(|| Error::UnknownClass(class_name.clone()))?;

    let arguments = Arguments::new(self.resolve_arguments(definition.arguments())?);
    let mut instance = self.instantiate(&class, definition.constructor(), &arguments)?;

    for call in definition.method_calls() {
      let arguments = Arguments::new(self.resolve_arguments(&call.arguments)?);
      let method = class.methods.get(&call.method).ok_or_else(|| Error::UnknownMethod {
        class: class_name.clone(),
        method: call.method.clone(),
      })?;
      method(&mut *instance, &arguments)
        .map_err(|source| Error::invocation(&class_name, &call.method, source))?;
    }

    if let Some(configurator) = definition.configurator() {
      self.configure(&class, configurator, &mut *instance)?;
    }

    Ok(Arc::from(instance))
  }

  fn instantiate(&self, class: &Class, factory: Option<&str>, arguments: &Arguments) -> Result<Instance> {
    if let Some(method) = factory {
      let factory = class.factories.get(method).ok_or_else(|| Error::UnknownFactory {
        class: class.name().to_owned(),
        method: method.to_owned(),
      })?;
      return factory(arguments).map_err(|source| Error::invocation(class.name(), method, source));
    }

    match &class.instantiator {
      Some(Instantiator::Constructor(constructor)) => {
        constructor(arguments).map_err(|source| Error::invocation(class.name(), "new", source))
      }
      Some(Instantiator::Default(make)) => {
        if !arguments.is_empty() {
          warn!(
            class = class.name(),
            ignored = arguments.len(),
            "class has no constructor; ignoring definition arguments"
          );
        }
        Ok(make())
      }
      None => Err(Error::NotInstantiable(class.name().to_owned())),
    }
  }

  fn configure(&self, class: &Class, configurator: &Configurator, instance: &mut dyn Any) -> Result<()> {
    let invalid = || Error::InvalidConfigurator(class.name().to_owned());

    match configurator {
      Configurator::Callable(callback) => {
        callback(instance).map_err(|source| Error::invocation(class.name(), "configurator", source))
      }
      Configurator::Function(name) => {
        let name = resolve_text(name, &self.parameters)?;
        let function = self.functions.get(&name).ok_or_else(invalid)?;
        function(instance).map_err(|source| Error::invocation(class.name(), &name, source))
      }
      Configurator::Method { target, method } => {
        let target = match target {
          Value::Reference(reference) => self.resolve_reference(reference)?,
          other => self.resolve_value(other)?,
        };
        match target {
          Value::Service(service) => {
            let target_class = self.classes.of_instance(&*service).ok_or_else(invalid)?;
            let configure = target_class.configurators.get(method).ok_or_else(invalid)?;
            configure(&*service, instance)
              .map_err(|source| Error::invocation(target_class.name(), method, source))
          }
          Value::String(target_name) => {
            let target_class = self.classes.get(&target_name).ok_or_else(invalid)?;
            let configure = target_class.static_configurators.get(method).ok_or_else(invalid)?;
            configure(instance).map_err(|source| Error::invocation(&target_name, method, source))
          }
          _ => Err(invalid()),
        }
      }
    }
  }

  /// Loads `file` through the container's loader unless that path was
  /// already loaded.
  fn load_file(&self, file: &str) -> Result<()> {
    let path = PathBuf::from(resolve_text(file, &self.parameters)?);
    let mut loaded = self.loaded_files.lock();
    if loaded.contains(&path) {
      return Ok(());
    }
    trace!(path = %path.display(), "loading file");
    self.loader.load(&path).map_err(|source| Error::FileLoad {
      path: path.display().to_string(),
      source,
    })?;
    loaded.insert(path);
    Ok(())
  }
}
