use fibre_container::{Class, Container, ParameterBag, Reference};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
  label: String,
}

// Holds a reference to the shared tracker.
struct Handler {
  tracker: Arc<RequestTracker>,
}

// A global, thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let parameters = ParameterBag::from_yaml_str("tracker.label: requests\n")?;
  let mut container = Container::with_parameters(parameters);

  container
    .register_class(
      Class::builder::<RequestTracker>("RequestTracker")
        .constructor(|args| {
          println!("Creating RequestTracker...");
          Ok(RequestTracker {
            id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
            label: args.string(0)?,
          })
        })
        .build(),
    )
    .register_class(
      Class::builder::<Handler>("Handler")
        .constructor(|args| Ok(Handler { tracker: args.service(0)? }))
        .build(),
    );

  // --- Shared ---
  // Built once, on first request.
  container
    .register("shared_tracker", "RequestTracker")
    .add_argument("%tracker.label%");

  // --- Not shared ---
  // Built again on every request.
  container
    .register("fresh_tracker", "RequestTracker")
    .add_argument("fresh %tracker.label%")
    .set_shared(false);

  container
    .register("handler", "Handler")
    .add_argument(Reference::new("shared_tracker"))
    .set_shared(false);

  println!("--- Resolving shared services ---");
  let s1 = container.get::<RequestTracker>("shared_tracker")?;
  let s2 = container.get::<RequestTracker>("shared_tracker")?;
  println!("Shared 1: {} #{}, Shared 2: {} #{}", s1.label, s1.id, s2.label, s2.id);
  assert!(Arc::ptr_eq(&s1, &s2), "Shared instances should be identical");

  println!("--- Resolving non-shared services ---");
  let t1 = container.get::<RequestTracker>("fresh_tracker")?;
  let t2 = container.get::<RequestTracker>("fresh_tracker")?;
  println!("Fresh 1: {} #{}, Fresh 2: {} #{}", t1.label, t1.id, t2.label, t2.id);
  assert!(!Arc::ptr_eq(&t1, &t2), "Non-shared instances should differ");

  println!("--- Resolving a service with a reference ---");
  let handler = container.get::<Handler>("handler")?;
  assert!(Arc::ptr_eq(&handler.tracker, &s1));
  println!("Handler uses the shared tracker #{}", handler.tracker.id);

  Ok(())
}
