mod common;

use common::{
  container, counting_dependency_class, Configurable, Consumer, Counter, Dependency, Node,
};
use fibre_container::{
  BoxError, Configurator, Container, Definition, Error, ParameterBag, Reference, ServiceState,
  Value,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

// --- Reference Resolution Tests ---

#[test]
fn test_reference_argument_is_the_shared_instance() {
  // Arrange
  let mut container = container();
  container.register("dep", "Dependency").add_argument("db");
  container
    .register("consumer", "Consumer")
    .add_argument(Reference::new("dep"));

  // Act
  let consumer = container.get::<Consumer>("consumer").unwrap();
  let dependency = container.get::<Dependency>("dep").unwrap();

  // Assert
  assert_eq!(consumer.dependency.value, "db");
  assert!(Arc::ptr_eq(&consumer.dependency, &dependency));
}

#[test]
fn test_missing_reference_fails_the_build() {
  let mut container = container();
  container
    .register("consumer", "Consumer")
    .add_argument(Reference::new("nowhere"));

  assert!(matches!(
    container.get_service("consumer"),
    Err(Error::ServiceNotFound(id)) if id == "nowhere"
  ));
}

#[test]
fn test_optional_reference_resolves_to_null() {
  let mut container = container();
  container
    .register("node", "Node")
    .add_argument(Reference::optional("nowhere"));

  let node = container.get::<Node>("node").unwrap();

  assert!(node.next.is_none());
}

#[test]
fn test_optional_reference_still_propagates_nested_failures() {
  // The optional target exists but cannot be built: that is not "missing".
  let mut container = container();
  container
    .register("broken", "Consumer")
    .add_argument(Reference::new("nowhere"));
  container
    .register("node", "Node")
    .add_argument(Reference::optional("broken"));

  assert!(matches!(
    container.get_service("node"),
    Err(Error::ServiceNotFound(id)) if id == "nowhere"
  ));
}

#[test]
fn test_references_inside_nested_values() {
  let mut container = container();
  container.register("dep", "Dependency").add_argument("nested");
  let nested: Value = [(
    "deps",
    Value::List(vec![Reference::new("dep").into(), "%name%".into()]),
  )]
  .into_iter()
  .collect();
  container.set_parameter("name", "plain");

  let resolved = container
    .resolve_services(container.resolve_value(&nested).unwrap())
    .unwrap();

  let deps = resolved.as_map().unwrap()["deps"].as_list().unwrap().to_vec();
  assert_eq!(
    deps[0].downcast::<Dependency>().unwrap().value,
    "nested".to_string()
  );
  assert_eq!(deps[1], Value::from("plain"));
}

// --- Circular Reference Tests ---

#[test]
fn test_direct_circular_reference_fails() {
  let mut container = container();
  container
    .register("self", "Node")
    .add_argument(Reference::new("self"));

  assert!(matches!(
    container.get_service("self"),
    Err(Error::CircularReference(id)) if id == "self"
  ));
}

#[test]
fn test_transitive_circular_reference_fails_without_leaking_state() {
  // Arrange: A -> B -> A, plus an unrelated C.
  let mut container = container();
  container.register("a", "Node").add_argument(Reference::new("b"));
  container.register("b", "Node").add_argument(Reference::new("a"));
  container.register("c", "Node");

  // Act
  let result = container.get_service("a");

  // Assert
  assert!(matches!(result, Err(Error::CircularReference(id)) if id == "a"));
  assert_eq!(container.service_state("a"), ServiceState::Unbuilt);
  assert_eq!(container.service_state("b"), ServiceState::Unbuilt);

  // An unrelated service still builds normally.
  let c = container.get::<Node>("c").unwrap();
  assert!(c.next.is_none());

  // And the cycle is reported the same way again, not as something else.
  assert!(matches!(
    container.get_service("b"),
    Err(Error::CircularReference(id)) if id == "b"
  ));
}

#[test]
fn test_failed_build_does_not_poison_later_lookups() {
  let mut container = container();
  container.register("dep", "Dependency").add_argument("%late%");

  assert!(matches!(
    container.get_service("dep"),
    Err(Error::UndefinedParameter(name)) if name == "late"
  ));

  container.set_parameter("late", "now defined");
  assert_eq!(
    container.get::<Dependency>("dep").unwrap().value,
    "now defined"
  );
}

// --- Placeholder Tests ---

#[test]
fn test_method_call_arguments_resolve_placeholders() {
  // Arrange
  let mut container = container();
  container.set_parameter("app_name", "demo");
  container.register("dep", "Dependency").add_argument("x");
  container
    .register("consumer", "Consumer")
    .add_argument(Reference::new("dep"))
    .add_method_call("setName", vec!["%app_name%".into()]);

  // Act
  let consumer = container.get::<Consumer>("consumer").unwrap();

  // Assert
  assert_eq!(consumer.name.as_deref(), Some("demo"));
}

#[test]
fn test_class_name_may_be_a_placeholder() {
  let parameters = ParameterBag::new();
  parameters.set("dep.class", "Dependency");
  let mut container = Container::with_parameters(parameters);
  container.register_class(common::dependency_class());
  container.register("dep", "%dep.class%").add_argument("by parameter");

  assert_eq!(
    container.get::<Dependency>("dep").unwrap().value,
    "by parameter"
  );
}

#[test]
fn test_class_placeholder_must_resolve_to_a_string() {
  let mut container = container();
  container.set_parameter("dep.class", 7);
  container.register("dep", "%dep.class%");

  assert!(matches!(
    container.get_service("dep"),
    Err(Error::InvalidClassName(kind)) if kind == "int"
  ));
}

#[test]
fn test_parameters_loaded_from_yaml() {
  let parameters = ParameterBag::from_yaml_str("App_Name: from-yaml\n").unwrap();
  let mut container = Container::with_parameters(parameters);
  container.register_class(common::dependency_class());
  container
    .register("dep", "Dependency")
    .add_argument("name=%app_name%");

  assert_eq!(
    container.get::<Dependency>("dep").unwrap().value,
    "name=from-yaml"
  );
}

// --- Instantiation Tests ---

#[test]
fn test_static_factory_method() {
  let mut container = container();
  container
    .register("dep", "Dependency")
    .set_constructor("fromInt")
    .add_argument(7);

  assert_eq!(container.get::<Dependency>("dep").unwrap().value, "int:7");
}

#[test]
fn test_unknown_factory_method_fails() {
  let mut container = container();
  container.register("dep", "Dependency").set_constructor("nope");

  assert!(matches!(
    container.get_service("dep"),
    Err(Error::UnknownFactory { class, method }) if class == "Dependency" && method == "nope"
  ));
}

#[test]
fn test_class_without_constructor_ignores_arguments() {
  let mut container = container();
  container
    .register("counter", "Counter")
    .add_argument("ignored")
    .add_method_call("hit", vec![])
    .add_method_call("hit", vec![]);

  let counter = container.get::<Counter>("counter").unwrap();

  assert_eq!(counter.hits, 2);
}

#[test]
fn test_unknown_class_and_uninstantiable_class() {
  struct Bare;
  let mut container = container();
  container.register_class(fibre_container::Class::builder::<Bare>("Bare").build());
  container.register("ghost", "Ghost");
  container.register("bare", "Bare");

  assert!(matches!(
    container.get_service("ghost"),
    Err(Error::UnknownClass(class)) if class == "Ghost"
  ));
  assert!(matches!(
    container.get_service("bare"),
    Err(Error::NotInstantiable(class)) if class == "Bare"
  ));
}

#[test]
fn test_constructor_errors_carry_context() {
  let mut container = container();
  // Dependency's constructor needs a string argument.
  container.register("dep", "Dependency");

  let err = container.get_service("dep").unwrap_err();

  assert!(matches!(&err, Error::Invocation { class, method, .. } if class == "Dependency" && method == "new"));
  assert!(err.to_string().contains("missing argument at position 0"));
}

#[test]
fn test_unknown_and_failing_method_calls() {
  let mut container = container();
  container.register("dep", "Dependency").add_argument("x");
  container
    .register("unknown", "Consumer")
    .add_argument(Reference::new("dep"))
    .add_method_call("setNothing", vec![]);
  container
    .register("failing", "Consumer")
    .add_argument(Reference::new("dep"))
    .add_method_call("fail", vec![]);

  assert!(matches!(
    container.get_service("unknown"),
    Err(Error::UnknownMethod { method, .. }) if method == "setNothing"
  ));
  assert!(matches!(
    container.get_service("failing"),
    Err(Error::Invocation { method, .. }) if method == "fail"
  ));
}

// --- Configurator Tests ---

#[test]
fn test_callable_configurator() {
  let mut container = container();
  container
    .register("configurable", "Configurable")
    .set_configurator(Configurator::callable(|instance| {
      let target = instance
        .downcast_mut::<Configurable>()
        .ok_or("not a Configurable")?;
      target.configured_by.push("closure".to_string());
      Ok(())
    }));

  let configurable = container.get::<Configurable>("configurable").unwrap();

  assert_eq!(configurable.configured_by, vec!["closure"]);
}

#[test]
fn test_named_function_configurator() {
  let mut container = container();
  container.set_parameter("configure.fn", "mark");
  container.register_function("mark", |instance| {
    let target = instance
      .downcast_mut::<Configurable>()
      .ok_or("not a Configurable")?;
    target.configured_by.push("function".to_string());
    Ok(())
  });
  container
    .register("configurable", "Configurable")
    .set_configurator(Configurator::function("%configure.fn%"));

  let configurable = container.get::<Configurable>("configurable").unwrap();

  assert_eq!(configurable.configured_by, vec!["function"]);
}

#[test]
fn test_method_configurator_on_referenced_service() {
  // Arrange
  let mut container = container();
  container
    .register("configurer", "Configurer")
    .add_argument("by-service");
  container
    .register("configurable", "Configurable")
    .set_configurator(Configurator::method(Reference::new("configurer"), "configure"));

  // Act
  let configurable = container.get::<Configurable>("configurable").unwrap();

  // Assert
  assert_eq!(configurable.configured_by, vec!["by-service"]);
  // The configurator's target was built and cached as a regular service.
  assert_eq!(container.service_state("configurer"), ServiceState::Built);
}

#[test]
fn test_static_method_configurator_by_class_name() {
  let mut container = container();
  container.set_parameter("configurable.class", "Configurable");
  container
    .register("configurable", "Configurable")
    .set_configurator(Configurator::method("%configurable.class%", "configureStatically"));

  let configurable = container.get::<Configurable>("configurable").unwrap();

  assert_eq!(configurable.configured_by, vec!["static"]);
}

#[test]
fn test_invalid_configurators() {
  let mut container = container();
  container.register("configurer", "Configurer").add_argument("x");
  let cases = vec![
    Configurator::function("unregistered"),
    Configurator::method(Reference::new("configurer"), "missing"),
    Configurator::method("Ghost", "configure"),
    Configurator::method(Value::Int(3), "configure"),
    Configurator::method(Reference::optional("nowhere"), "configure"),
  ];

  for (i, configurator) in cases.into_iter().enumerate() {
    let id = format!("configurable{i}");
    container
      .register(id.clone(), "Configurable")
      .set_configurator(configurator);

    assert!(
      matches!(
        container.get_service(&id),
        Err(Error::InvalidConfigurator(class)) if class == "Configurable"
      ),
      "case {i} should be an invalid configurator"
    );
  }
}

// --- File Loading Tests ---

#[test]
fn test_file_is_loaded_once_per_path() {
  // Arrange
  let loaded = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
  let log = loaded.clone();
  let mut container = container().with_loader(move |path: &Path| -> Result<(), BoxError> {
    log.lock().unwrap().push(path.to_path_buf());
    Ok(())
  });
  container.set_parameter("lib.dir", "/opt/lib");
  container
    .register("a", "Counter")
    .set_file("%lib.dir%/counter.rs")
    .set_shared(false);
  container.register("b", "Counter").set_file("/opt/lib/counter.rs");

  // Act
  container.get_service("a").unwrap();
  container.get_service("a").unwrap();
  container.get_service("b").unwrap();

  // Assert
  assert_eq!(
    *loaded.lock().unwrap(),
    vec![PathBuf::from("/opt/lib/counter.rs")]
  );
}

#[test]
fn test_default_loader_requires_an_existing_file() {
  let file = tempfile::NamedTempFile::new().unwrap();
  let mut container = container();
  container
    .register("present", "Counter")
    .set_file(file.path().to_string_lossy().into_owned());
  container
    .register("absent", "Counter")
    .set_file("/definitely/not/here.rs");

  assert!(container.get_service("present").is_ok());
  assert!(matches!(
    container.get_service("absent"),
    Err(Error::FileLoad { path, .. }) if path == "/definitely/not/here.rs"
  ));
}

#[test]
fn test_failed_build_keeps_earlier_side_effects() {
  // The file is loaded before the method call fails; it is not "unloaded".
  let loads = Arc::new(AtomicUsize::new(0));
  let counter = loads.clone();
  let mut container = container().with_loader(move |_: &Path| -> Result<(), BoxError> {
    counter.fetch_add(1, Ordering::SeqCst);
    Ok(())
  });
  container.register("dep", "Dependency").add_argument("x");
  container
    .register("failing", "Consumer")
    .set_file("consumer.rs")
    .add_argument(Reference::new("dep"))
    .add_method_call("fail", vec![]);

  assert!(container.get_service("failing").is_err());
  assert!(container.get_service("failing").is_err());

  assert_eq!(loads.load(Ordering::SeqCst), 1);
  // The dependency built before the failure stays cached.
  assert_eq!(container.service_state("dep"), ServiceState::Built);
}

// --- Tag Tests ---

#[test]
fn test_find_tagged_service_ids() {
  let mut container = container();
  let priority: BTreeMap<String, Value> = [("priority".to_string(), Value::Int(10))].into();
  container
    .register("first", "Counter")
    .add_tag("listener", priority.clone());
  container
    .register("second", "Counter")
    .add_tag("listener", BTreeMap::new())
    .add_tag("other", BTreeMap::new());
  container.register("untagged", "Counter");

  let tagged = container.find_tagged_service_ids("listener");

  assert_eq!(tagged.keys().collect::<Vec<_>>(), vec!["first", "second"]);
  assert_eq!(tagged["first"], vec![priority]);
  assert!(container.find_tagged_service_ids("missing").is_empty());
}

// --- Concurrency Tests ---

#[test]
fn test_shared_service_is_built_once_under_concurrency() {
  // Arrange
  let constructions = Arc::new(AtomicUsize::new(0));
  let mut container = Container::new();
  container.register_class(counting_dependency_class(
    "CountedDependency",
    constructions.clone(),
  ));
  container.register_class(common::consumer_class());
  container.set_definition(
    "dep",
    Definition::new("CountedDependency").with_argument("concurrent"),
  );
  container.set_definition(
    "consumer",
    Definition::new("Consumer")
      .with_argument(Reference::new("dep"))
      .with_shared(false),
  );

  // Act
  // Spawn multiple threads that all build services depending on `dep`.
  thread::scope(|s| {
    for _ in 0..16 {
      s.spawn(|| {
        let consumer = container.get::<Consumer>("consumer").unwrap();
        assert_eq!(consumer.dependency.value, "concurrent");
      });
    }
  });

  // Assert
  assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_building_state_is_visible_from_other_threads() {
  let started = Arc::new(Barrier::new(2));
  let release = Arc::new(Barrier::new(2));
  let mut container = Container::new();
  container.register_class({
    let (started, release) = (started.clone(), release.clone());
    fibre_container::Class::builder::<Counter>("SlowCounter")
      .constructor(move |_| {
        started.wait();
        release.wait();
        Ok(Counter::default())
      })
      .build()
  });
  container.register("slow", "SlowCounter");

  thread::scope(|s| {
    let builder = s.spawn(|| container.get::<Counter>("slow").map(|_| ()));

    started.wait();
    // The build is parked inside the constructor on the other thread.
    assert_eq!(container.service_state("slow"), ServiceState::Building);
    release.wait();

    builder.join().unwrap().unwrap();
  });

  assert_eq!(container.service_state("slow"), ServiceState::Built);
}
