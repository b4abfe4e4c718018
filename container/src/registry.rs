//! The base registry of already-built services.

use crate::value::Service;
use dashmap::DashMap;
use std::collections::HashMap;

/// Already-built service instances keyed by id.
///
/// Shared services land here after their first build; hosts may also put
/// pre-built instances here directly with `Container::set_service`.
#[derive(Debug, Default)]
pub(crate) struct ServiceRegistry {
  services: DashMap<String, Service>,
}

impl ServiceRegistry {
  pub(crate) fn has(&self, id: &str) -> bool {
    self.services.contains_key(id)
  }

  pub(crate) fn get(&self, id: &str) -> Option<Service> {
    self.services.get(id).map(|entry| entry.value().clone())
  }

  pub(crate) fn set(&self, id: impl Into<String>, service: Service) {
    self.services.insert(id.into(), service);
  }

  pub(crate) fn ids(&self) -> Vec<String> {
    self.services.iter().map(|entry| entry.key().clone()).collect()
  }

  /// A copy of every built service.
  pub(crate) fn snapshot(&self) -> HashMap<String, Service> {
    self
      .services
      .iter()
      .map(|entry| (entry.key().clone(), entry.value().clone()))
      .collect()
  }
}
