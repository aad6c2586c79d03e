//! The registration API providers use to describe callables.
//!
//! A [`Provider`] lists [`Operation`]s. Each operation carries markers saying
//! whether it is an action, a function or a converter, an ordered parameter
//! list mixing computed inputs with injected capabilities, a return shape and
//! a [`Body`] that does the work.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::capability::{ChildActions, MutableContext, ReadOnlyContext};
use crate::error::CallError;
use crate::types::{TypeDescriptor, TypeKey};
use crate::value::Value;

/// Kind marker on an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
  Action,
  Function,
  Converter,
}

impl fmt::Display for Marker {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Marker::Action => "action",
      Marker::Function => "function",
      Marker::Converter => "converter",
    })
  }
}

/// A runtime facility injected into a callable instead of a computed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
  /// Read and write named variables. Actions only.
  MutableContext,
  /// Read variables and outputs. Actions and functions.
  ReadOnlyContext,
  /// Run the action's child block. Actions only.
  ChildActions,
}

impl Capability {
  pub fn allowed_for(self, marker: Marker) -> bool {
    match (self, marker) {
      (_, Marker::Action) => true,
      (Capability::ReadOnlyContext, Marker::Function) => true,
      _ => false,
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Capability::MutableContext => "the mutable context",
      Capability::ReadOnlyContext => "the read-only context",
      Capability::ChildActions => "child actions",
    })
  }
}

/// One parameter slot of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
  Input {
    name: String,
    rename: Option<String>,
    type_key: TypeKey,
    multiple: bool,
    narrows_output: bool,
  },
  Injected(Capability),
}

impl Param {
  /// A computed, single-valued input.
  pub fn input(name: impl Into<String>, type_key: impl Into<TypeKey>) -> Self {
    Param::Input {
      name: name.into(),
      rename: None,
      type_key: type_key.into(),
      multiple: false,
      narrows_output: false,
    }
  }

  pub fn injected(capability: Capability) -> Self {
    Param::Injected(capability)
  }

  /// Accept a list of values of the declared element type.
  pub fn multiple(mut self) -> Self {
    if let Param::Input { multiple, .. } = &mut self {
      *multiple = true;
    }
    self
  }

  /// Override the name used to bind arguments to this input.
  pub fn named(mut self, alias: impl Into<String>) -> Self {
    if let Param::Input { rename, .. } = &mut self {
      *rename = Some(alias.into());
    }
    self
  }

  /// The callable's output takes this input's (compile-time) type.
  pub fn narrows_output(mut self) -> Self {
    if let Param::Input { narrows_output, .. } = &mut self {
      *narrows_output = true;
    }
    self
  }
}

/// What an operation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Returns {
  Void,
  Value { type_key: TypeKey, multiple: bool },
}

impl Returns {
  pub fn value(type_key: impl Into<TypeKey>) -> Self {
    Returns::Value {
      type_key: type_key.into(),
      multiple: false,
    }
  }

  pub fn list(type_key: impl Into<TypeKey>) -> Self {
    Returns::Value {
      type_key: type_key.into(),
      multiple: true,
    }
  }
}

pub type ImmediateFn = dyn Fn(CallArgs) -> Result<Value, CallError> + Send + Sync;
pub type DeferredFn = dyn Fn(CallArgs) -> BoxFuture<'static, Result<Value, CallError>> + Send + Sync;

/// The code behind an operation.
///
/// Immediate bodies return their result directly. Deferred bodies return a
/// future the engine awaits; only actions may be deferred.
#[derive(Clone)]
pub enum Body {
  Immediate(Arc<ImmediateFn>),
  Deferred(Arc<DeferredFn>),
}

impl Body {
  pub fn immediate<F>(f: F) -> Self
  where
    F: Fn(CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
  {
    Body::Immediate(Arc::new(f))
  }

  pub fn deferred<F, Fut>(f: F) -> Self
  where
    F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
  {
    Body::Deferred(Arc::new(move |args| Box::pin(f(args))))
  }

  pub fn is_deferred(&self) -> bool {
    matches!(self, Body::Deferred(_))
  }
}

impl fmt::Debug for Body {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Body::Immediate(_) => f.write_str("Body::Immediate"),
      Body::Deferred(_) => f.write_str("Body::Deferred"),
    }
  }
}

/// One operation as declared by a provider.
#[derive(Debug, Clone)]
pub struct Operation {
  pub name: String,
  pub rename: Option<String>,
  pub markers: Vec<Marker>,
  pub params: Vec<Param>,
  pub returns: Returns,
  pub body: Body,
  pub default_timeout: Option<Duration>,
}

impl Operation {
  fn with_marker(name: impl Into<String>, marker: Marker, body: Body) -> Self {
    Self {
      name: name.into(),
      rename: None,
      markers: vec![marker],
      params: Vec::new(),
      returns: Returns::Void,
      body,
      default_timeout: None,
    }
  }

  pub fn action(name: impl Into<String>, body: Body) -> Self {
    Self::with_marker(name, Marker::Action, body)
  }

  pub fn function(name: impl Into<String>, body: Body) -> Self {
    Self::with_marker(name, Marker::Function, body)
  }

  pub fn converter(name: impl Into<String>, body: Body) -> Self {
    Self::with_marker(name, Marker::Converter, body)
  }

  /// An operation with no markers; it is skipped at registration.
  pub fn unmarked(name: impl Into<String>, body: Body) -> Self {
    let mut op = Self::with_marker(name, Marker::Action, body);
    op.markers.clear();
    op
  }

  /// Add another marker. Operations with more than one distinct marker are
  /// rejected at registration.
  pub fn marker(mut self, marker: Marker) -> Self {
    self.markers.push(marker);
    self
  }

  pub fn renamed(mut self, name: impl Into<String>) -> Self {
    self.rename = Some(name.into());
    self
  }

  pub fn param(mut self, param: Param) -> Self {
    self.params.push(param);
    self
  }

  pub fn returns(mut self, returns: Returns) -> Self {
    self.returns = returns;
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.default_timeout = Some(timeout);
    self
  }

  /// The name callers use.
  pub fn registered_name(&self) -> &str {
    self.rename.as_deref().unwrap_or(&self.name)
  }
}

/// A source of operations and types.
pub trait Provider: Send + Sync {
  /// Identifier used in diagnostics and exports.
  fn name(&self) -> &str;

  /// The provider's operations. Bodies may capture the provider.
  fn operations(self: Arc<Self>) -> Vec<Operation>;

  /// Types the provider declares.
  fn types(&self) -> Vec<TypeDescriptor> {
    Vec::new()
  }
}

/// A capability handed to a callable body.
#[derive(Clone)]
pub enum Injected {
  MutableContext(Arc<dyn MutableContext>),
  ReadOnlyContext(Arc<dyn ReadOnlyContext>),
  ChildActions(Arc<dyn ChildActions>),
}

/// Arguments passed to a callable body.
///
/// `inputs` holds one value per computed input in declaration order; a
/// multi-valued input is a [`Value::List`]. Injected capabilities are kept
/// separately in declaration order.
#[derive(Clone, Default)]
pub struct CallArgs {
  inputs: Vec<Value>,
  injected: Vec<Injected>,
}

impl CallArgs {
  pub fn new(inputs: Vec<Value>) -> Self {
    Self {
      inputs,
      injected: Vec::new(),
    }
  }

  pub fn with_injected(mut self, injected: Vec<Injected>) -> Self {
    self.injected = injected;
    self
  }

  pub fn inputs(&self) -> &[Value] {
    &self.inputs
  }

  pub fn into_inputs(self) -> Vec<Value> {
    self.inputs
  }

  pub fn value(&self, index: usize) -> Result<&Value, CallError> {
    self
      .inputs
      .get(index)
      .ok_or_else(|| CallError::failed(format!("missing input #{}", index)))
  }

  pub fn text(&self, index: usize) -> Result<&str, CallError> {
    let value = self.value(index)?;
    value.as_text().ok_or_else(|| mismatch(index, "text", value))
  }

  pub fn integer(&self, index: usize) -> Result<i64, CallError> {
    let value = self.value(index)?;
    value.as_integer().ok_or_else(|| mismatch(index, "integer", value))
  }

  pub fn float(&self, index: usize) -> Result<f64, CallError> {
    let value = self.value(index)?;
    value.as_float().ok_or_else(|| mismatch(index, "float", value))
  }

  pub fn boolean(&self, index: usize) -> Result<bool, CallError> {
    let value = self.value(index)?;
    value.as_boolean().ok_or_else(|| mismatch(index, "boolean", value))
  }

  pub fn list(&self, index: usize) -> Result<&[Value], CallError> {
    let value = self.value(index)?;
    value.as_list().ok_or_else(|| mismatch(index, "list", value))
  }

  pub fn mutable_context(&self) -> Result<&Arc<dyn MutableContext>, CallError> {
    self
      .injected
      .iter()
      .find_map(|i| match i {
        Injected::MutableContext(ctx) => Some(ctx),
        _ => None,
      })
      .ok_or_else(|| CallError::failed("mutable context was not injected"))
  }

  pub fn read_only_context(&self) -> Result<&Arc<dyn ReadOnlyContext>, CallError> {
    self
      .injected
      .iter()
      .find_map(|i| match i {
        Injected::ReadOnlyContext(ctx) => Some(ctx),
        _ => None,
      })
      .ok_or_else(|| CallError::failed("read-only context was not injected"))
  }

  pub fn child_actions(&self) -> Result<&Arc<dyn ChildActions>, CallError> {
    self
      .injected
      .iter()
      .find_map(|i| match i {
        Injected::ChildActions(children) => Some(children),
        _ => None,
      })
      .ok_or_else(|| CallError::failed("child actions were not injected"))
  }
}

fn mismatch(index: usize, expected: &str, found: &Value) -> CallError {
  CallError::failed(format!(
    "input #{} is a {}, expected {}",
    index,
    found.kind_name(),
    expected
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_capability_rules() {
    assert!(Capability::ChildActions.allowed_for(Marker::Action));
    assert!(Capability::ReadOnlyContext.allowed_for(Marker::Function));
    assert!(!Capability::MutableContext.allowed_for(Marker::Function));
    assert!(!Capability::ReadOnlyContext.allowed_for(Marker::Converter));
  }

  #[test]
  fn test_call_args_accessors() {
    let args = CallArgs::new(vec![Value::from("a"), Value::from(2i64)]);
    assert_eq!(args.text(0).unwrap(), "a");
    assert_eq!(args.integer(1).unwrap(), 2);
    assert!(args.integer(0).is_err());
    assert!(args.value(2).is_err());
    assert!(args.mutable_context().is_err());
  }

  #[test]
  fn test_registered_name_prefers_rename() {
    let op = Operation::function("plus", Body::immediate(|_| Ok(Value::Null))).renamed("add");
    assert_eq!(op.registered_name(), "add");
  }
}
