use thiserror::Error;

/// A boxed error returned by host-supplied constructors, methods and configurators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the `fibre_container` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Service \"{0}\" does not exist")]
  ServiceNotFound(String),

  #[error("Service definition \"{0}\" does not exist")]
  DefinitionNotFound(String),

  #[error("Circular reference detected for service \"{0}\"")]
  CircularReference(String),

  #[error("Parameter \"{0}\" must be defined")]
  UndefinedParameter(String),

  #[error("The configure callable for class \"{0}\" is not a callable")]
  InvalidConfigurator(String),

  #[error("Class name must resolve to a string, got {0}")]
  InvalidClassName(String),

  #[error("Class \"{0}\" is not registered")]
  UnknownClass(String),

  #[error("Class \"{0}\" has no constructor")]
  NotInstantiable(String),

  #[error("Class \"{class}\" has no factory method \"{method}\"")]
  UnknownFactory { class: String, method: String },

  #[error("Class \"{class}\" has no method \"{method}\"")]
  UnknownMethod { class: String, method: String },

  #[error("Call to {class}::{method} failed: {source}")]
  Invocation {
    class: String,
    method: String,
    #[source]
    source: BoxError,
  },

  #[error("Service \"{id}\" is not of type {expected}")]
  TypeMismatch { id: String, expected: &'static str },

  #[error("Failed to load file \"{path}\": {source}")]
  FileLoad {
    path: String,
    #[source]
    source: BoxError,
  },

  #[error("Failed to read parameter file: {0}")]
  ParameterRead(#[from] std::io::Error),

  #[error("Failed to parse parameters: {0}")]
  ParameterParse(String),
}

impl Error {
  pub(crate) fn invocation(class: &str, method: &str, source: BoxError) -> Self {
    Error::Invocation {
      class: class.to_owned(),
      method: method.to_owned(),
      source,
    }
  }
}

/// A specialized `Result` type for `fibre_container` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
