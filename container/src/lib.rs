//! # Fibre Container
//!
//! A deferred service container for Rust.
//!
//! Services are described by [`Definition`]s: which registered [`Class`]
//! builds them, with which arguments, which methods to call afterwards and
//! which configurator to run. Nothing is built until a service is requested;
//! shared services are then cached for the lifetime of the container.
//!
//! ## Core Concepts
//!
//! - **Definition**: a declarative recipe for one service id.
//! - **Class**: the host-supplied constructors, factory methods and methods a
//!   definition's class name refers to.
//! - **Placeholders**: `%name%` in any string value is replaced by the parameter
//!   `name`. A string that is exactly one placeholder keeps the parameter's
//!   type; `%%text%%` is an escape for the literal `%text%`.
//! - **References**: a [`Reference`] in an argument is replaced by the built
//!   service it names, building it on demand.
//! - **Cycles**: a service that needs itself to be built fails with
//!   [`Error::CircularReference`] instead of recursing forever.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_container::{Class, Container, Reference};
//! use std::sync::Arc;
//!
//! struct Transport {
//!   host: String,
//! }
//!
//! struct Mailer {
//!   transport: Arc<Transport>,
//!   sender: Option<String>,
//! }
//!
//! let mut container = Container::new();
//! container.set_parameter("mailer.host", "smtp.example.com");
//! container.set_parameter("mailer.sender", "noreply@example.com");
//!
//! container
//!   .register_class(
//!     Class::builder::<Transport>("Transport")
//!       .constructor(|args| Ok(Transport { host: args.string(0)? }))
//!       .build(),
//!   )
//!   .register_class(
//!     Class::builder::<Mailer>("Mailer")
//!       .constructor(|args| Ok(Mailer { transport: args.service(0)?, sender: None }))
//!       .method("setSender", |mailer, args| {
//!         mailer.sender = Some(args.string(0)?);
//!         Ok(())
//!       })
//!       .build(),
//!   );
//!
//! container.register("transport", "Transport").add_argument("%mailer.host%");
//! container
//!   .register("mailer", "Mailer")
//!   .add_argument(Reference::new("transport"))
//!   .add_method_call("setSender", vec!["%mailer.sender%".into()]);
//!
//! let mailer = container.get::<Mailer>("mailer").unwrap();
//! assert_eq!(mailer.transport.host, "smtp.example.com");
//! assert_eq!(mailer.sender.as_deref(), Some("noreply@example.com"));
//!
//! // Shared by default: the dependency is the same instance the container holds.
//! let transport = container.get::<Transport>("transport").unwrap();
//! assert!(Arc::ptr_eq(&mailer.transport, &transport));
//! ```

mod class;
mod container;
mod core;
mod definition;
mod engine;
mod error;
mod loader;
mod macros;
mod parameters;
mod registry;
mod resolver;
mod value;

pub use class::{ArgumentError, Arguments, Class, ClassBuilder, Instance};
pub use container::Container;
pub use crate::core::ServiceState;
pub use definition::{Callback, Configurator, Definition, MethodCall};
pub use error::{BoxError, Error, Result};
pub use loader::{FileLoader, FsLoader};
pub use parameters::{ParameterBag, ParameterStore};
pub use resolver::{resolve_string, resolve_text, resolve_value};
pub use value::{InvalidBehavior, Reference, Service, Value};
