//! Public macros for ergonomic service resolution.

/// Resolves a service from a container, panicking if it cannot be built.
///
/// This is the shorthand for required dependencies at a composition root.
/// For a non-panicking version, call `Container::get` or
/// `Container::get_service` directly.
///
/// # Panics
///
/// Panics if the service is missing, fails to build, or (in the typed form)
/// is not of the requested type.
///
/// # Examples
///
/// ```
/// use fibre_container::{service, Container};
///
/// let container = Container::new();
/// container.add_instance("greeting", String::from("hello"));
///
/// // Typed: returns `Arc<String>`.
/// let greeting = service!(container, "greeting" => String);
/// assert_eq!(*greeting, "hello");
///
/// // Untyped: returns the `Service` handle.
/// let handle = service!(container, "greeting");
/// assert!(handle.downcast_ref::<String>().is_some());
/// ```
#[macro_export]
macro_rules! service {
    // Typed arm: service!(container, "id" => MyService)
    ($container:expr, $id:expr => $type:ty) => {
        $container
            .get::<$type>($id)
            .unwrap_or_else(|err| {
                panic!(
                    "Failed to resolve required service '{}' as {}: {}",
                    $id,
                    std::any::type_name::<$type>(),
                    err
                )
            })
    };

    // Untyped arm: service!(container, "id")
    ($container:expr, $id:expr) => {
        $container
            .get_service($id)
            .unwrap_or_else(|err| panic!("Failed to resolve required service '{}': {}", $id, err))
    };
}
