//! The immutable callable registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::builder::SpecificationBuilder;
use crate::callable::{CallableSpec, ConverterSpec};
use crate::graph::TypeGraph;

/// Every registered action, function and converter plus the resolved type
/// graph. Built once per engine and shared read-only.
pub struct Specification {
  actions: BTreeMap<String, Arc<CallableSpec>>,
  functions: BTreeMap<String, Arc<CallableSpec>>,
  converters: BTreeMap<String, Arc<ConverterSpec>>,
  graph: TypeGraph,
  providers: Vec<String>,
}

impl Specification {
  pub(crate) fn new(
    actions: BTreeMap<String, Arc<CallableSpec>>,
    functions: BTreeMap<String, Arc<CallableSpec>>,
    converters: BTreeMap<String, Arc<ConverterSpec>>,
    graph: TypeGraph,
    providers: Vec<String>,
  ) -> Self {
    Self {
      actions,
      functions,
      converters,
      graph,
      providers,
    }
  }

  pub fn builder() -> SpecificationBuilder {
    SpecificationBuilder::new()
  }

  pub fn action(&self, name: &str) -> Option<&Arc<CallableSpec>> {
    self.actions.get(name)
  }

  pub fn function(&self, name: &str) -> Option<&Arc<CallableSpec>> {
    self.functions.get(name)
  }

  pub fn converter(&self, name: &str) -> Option<&Arc<ConverterSpec>> {
    self.converters.get(name)
  }

  /// Actions ordered by name.
  pub fn actions(&self) -> impl Iterator<Item = &Arc<CallableSpec>> {
    self.actions.values()
  }

  pub fn functions(&self) -> impl Iterator<Item = &Arc<CallableSpec>> {
    self.functions.values()
  }

  pub fn converters(&self) -> impl Iterator<Item = &Arc<ConverterSpec>> {
    self.converters.values()
  }

  pub fn graph(&self) -> &TypeGraph {
    &self.graph
  }

  /// Provider names in registration order.
  pub fn providers(&self) -> &[String] {
    &self.providers
  }
}

impl std::fmt::Debug for Specification {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Specification")
      .field("actions", &self.actions.keys().collect::<Vec<_>>())
      .field("functions", &self.functions.keys().collect::<Vec<_>>())
      .field("converters", &self.converters.keys().collect::<Vec<_>>())
      .field("providers", &self.providers)
      .finish()
  }
}
