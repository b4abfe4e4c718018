//! Build-state bookkeeping for cycle detection.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;

/// The build state of a single service id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
  /// Not built yet (or not shared, so never cached).
  Unbuilt,
  /// Currently under construction on some thread.
  Building,
  /// Built and cached in the service registry.
  Built,
}

/// The set of ids currently under construction.
///
/// It is locked only for single inserts, removals and lookups, never across a
/// build, so any thread can read it while a build is in flight.
pub(crate) type LoadingSet = Mutex<HashSet<String>>;

/// An RAII guard marking one service id as under construction.
///
/// Creating it fails with `CircularReference` when the id is already being
/// built further up the stack. Dropping it removes the id again, whether the
/// build succeeded or unwound with an error.
pub(crate) struct LoadingGuard<'a> {
  loading: &'a LoadingSet,
  id: String,
}

impl<'a> LoadingGuard<'a> {
  pub(crate) fn enter(loading: &'a LoadingSet, id: &str) -> Result<Self> {
    // `insert` returns `false` if the id was already present.
    if !loading.lock().insert(id.to_owned()) {
      return Err(Error::CircularReference(id.to_owned()));
    }
    Ok(Self {
      loading,
      id: id.to_owned(),
    })
  }
}

impl Drop for LoadingGuard<'_> {
  fn drop(&mut self) {
    self.loading.lock().remove(&self.id);
  }
}
