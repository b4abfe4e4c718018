#![allow(dead_code)]

use fibre_container::{Class, Container};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

/// A leaf service configured from a single string argument.
#[derive(Debug)]
pub struct Dependency {
  pub value: String,
}

/// A service that holds another service and has a setter.
pub struct Consumer {
  pub dependency: Arc<Dependency>,
  pub name: Option<String>,
}

/// A service without an explicit constructor.
#[derive(Default)]
pub struct Counter {
  pub hits: usize,
}

/// A service whose constructor takes an optional reference to another `Node`.
pub struct Node {
  pub next: Option<Arc<Node>>,
}

/// A service recording everything that configured it.
#[derive(Default)]
pub struct Configurable {
  pub configured_by: Vec<String>,
}

/// A service used as the target of instance configurators.
pub struct Configurer {
  pub label: String,
}

pub fn dependency_class() -> Class {
  Class::builder::<Dependency>("Dependency")
    .constructor(|args| {
      Ok(Dependency {
        value: args.string(0)?,
      })
    })
    .factory("fromInt", |args| {
      Ok(Dependency {
        value: format!("int:{}", args.int(0)?),
      })
    })
    .build()
}

pub fn consumer_class() -> Class {
  Class::builder::<Consumer>("Consumer")
    .constructor(|args| {
      Ok(Consumer {
        dependency: args.service(0)?,
        name: None,
      })
    })
    .method("setName", |consumer, args| {
      consumer.name = Some(args.string(0)?);
      Ok(())
    })
    .method("fail", |_, _| Err("method failed".into()))
    .build()
}

pub fn counter_class() -> Class {
  Class::builder::<Counter>("Counter")
    .default_constructor(Counter::default)
    .method("hit", |counter, _| {
      counter.hits += 1;
      Ok(())
    })
    .build()
}

pub fn node_class() -> Class {
  Class::builder::<Node>("Node")
    .constructor(|args| {
      Ok(Node {
        next: args.optional_service(0)?,
      })
    })
    .build()
}

pub fn configurable_class() -> Class {
  Class::builder::<Configurable>("Configurable")
    .default_constructor(Configurable::default)
    .static_configurator("configureStatically", |instance| {
      let target = instance
        .downcast_mut::<Configurable>()
        .ok_or("not a Configurable")?;
      target.configured_by.push("static".to_string());
      Ok(())
    })
    .build()
}

pub fn configurer_class() -> Class {
  Class::builder::<Configurer>("Configurer")
    .constructor(|args| {
      Ok(Configurer {
        label: args.string(0)?,
      })
    })
    .configurator("configure", |configurer, instance| {
      let target = instance
        .downcast_mut::<Configurable>()
        .ok_or("not a Configurable")?;
      target.configured_by.push(configurer.label.clone());
      Ok(())
    })
    .build()
}

/// A container with every fixture class registered.
pub fn container() -> Container {
  let mut container = Container::new();
  container
    .register_class(dependency_class())
    .register_class(consumer_class())
    .register_class(counter_class())
    .register_class(node_class())
    .register_class(configurable_class())
    .register_class(configurer_class());
  container
}

/// Registers a `Dependency` class whose constructor counts its invocations.
pub fn counting_dependency_class(name: &str, counter: Arc<AtomicUsize>) -> Class {
  Class::builder::<Dependency>(name)
    .constructor(move |args| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(Dependency {
        value: args.string(0)?,
      })
    })
    .build()
}
