//! Trellis Standard Provider
//!
//! The operations every engine ships with:
//!
//! - functions over text, integers and booleans (`concat`, `add`, `equals`, ...)
//! - converters between the built-in value types (`integer_to_text`, ...)
//! - actions for logging, waiting, process variables and repetition

use std::sync::Arc;

use trellis_spec::{Operation, Provider};

mod actions;
mod converters;
mod functions;

/// Provider name used in registration logs and exports.
pub const PROVIDER_NAME: &str = "std";

/// The standard provider.
#[derive(Debug, Default)]
pub struct StandardProvider;

impl StandardProvider {
  pub fn new() -> Self {
    Self
  }
}

impl Provider for StandardProvider {
  fn name(&self) -> &str {
    PROVIDER_NAME
  }

  fn operations(self: Arc<Self>) -> Vec<Operation> {
    let mut operations = functions::operations();
    operations.extend(converters::operations());
    operations.extend(actions::operations());
    operations
  }
}
