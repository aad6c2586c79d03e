//! Validated callables as stored in the registry.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::CallError;
use crate::operation::{Body, CallArgs, Capability, Marker};
use crate::types::TypeKey;
use crate::value::Value;

/// A computed input of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
  pub name: String,
  pub type_key: TypeKey,
  pub multiple: bool,
  pub narrows_output: bool,
}

/// The declared output of a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
  pub type_key: TypeKey,
  pub multiple: bool,
}

/// A registered action, function or converter.
#[derive(Debug, Clone)]
pub struct CallableSpec {
  pub name: String,
  pub kind: Marker,
  pub provider: String,
  pub inputs: Vec<InputSpec>,
  /// Injected capabilities in declaration order.
  pub injected: Vec<Capability>,
  /// `None` for void actions.
  pub output: Option<OutputSpec>,
  pub default_timeout: Option<Duration>,
  pub(crate) body: Body,
}

impl CallableSpec {
  pub fn input(&self, name: &str) -> Option<(usize, &InputSpec)> {
    self.inputs.iter().enumerate().find(|(_, i)| i.name == name)
  }

  /// Index of the input whose type narrows the output, if any.
  pub fn narrowing_input(&self) -> Option<usize> {
    self.inputs.iter().position(|i| i.narrows_output)
  }

  pub fn accepts(&self, capability: Capability) -> bool {
    self.injected.contains(&capability)
  }

  pub fn is_deferred(&self) -> bool {
    self.body.is_deferred()
  }

  /// Run an immediate body on the calling thread.
  pub fn call_immediate(&self, args: CallArgs) -> Result<Value, CallError> {
    match &self.body {
      Body::Immediate(f) => f(args),
      Body::Deferred(_) => Err(CallError::failed(format!(
        "'{}' completes asynchronously and cannot be called immediately",
        self.name
      ))),
    }
  }

  /// Run the body, awaiting deferred results.
  pub fn call(&self, args: CallArgs) -> BoxFuture<'static, Result<Value, CallError>> {
    match &self.body {
      Body::Immediate(f) => {
        let f = Arc::clone(f);
        Box::pin(async move { f(args) })
      }
      Body::Deferred(f) => f(args),
    }
  }
}

/// A converter: a one-input, one-output callable that makes its input type
/// substitutable for its output type.
#[derive(Debug, Clone)]
pub struct ConverterSpec {
  pub callable: Arc<CallableSpec>,
  pub from: TypeKey,
  pub to: TypeKey,
}

impl ConverterSpec {
  pub fn name(&self) -> &str {
    &self.callable.name
  }

  pub fn convert(&self, value: Value) -> Result<Value, CallError> {
    self.callable.call_immediate(CallArgs::new(vec![value]))
  }
}
