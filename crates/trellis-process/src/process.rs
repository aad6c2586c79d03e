use std::sync::Arc;

use async_trait::async_trait;
use trellis_config::ProcessContract;
use trellis_runtime::ExecutionContext;
use trellis_spec::{ExecutionError, TypeGraph, TypeKey, Value};

/// The outcome of one successful invocation.
pub struct ProcessResult {
  pub execution_id: String,
  /// `None` for void processes.
  pub output: Option<Value>,
  /// Variables and action outputs of this invocation.
  pub context: Arc<ExecutionContext>,
}

impl std::fmt::Debug for ProcessResult {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProcessResult")
      .field("execution_id", &self.execution_id)
      .field("output", &self.output)
      .finish_non_exhaustive()
  }
}

/// A loaded process: the runtime realization of its contract.
///
/// Each invocation owns a fresh [`ExecutionContext`]; concurrent invocations
/// of the same process never share state.
#[async_trait]
pub trait Process: Send + Sync {
  fn process_id(&self) -> &str;

  fn contract(&self) -> &ProcessContract;

  /// Invoke with one value per contract parameter, in order.
  async fn invoke(&self, args: Vec<Value>) -> Result<ProcessResult, ExecutionError>;
}

/// Decode JSON arguments against `contract`.
pub fn decode_arguments(
  contract: &ProcessContract,
  args: &[serde_json::Value],
  graph: &TypeGraph,
) -> Result<Vec<Value>, ExecutionError> {
  check_arity(contract, args.len())?;

  contract
    .parameters
    .iter()
    .zip(args)
    .map(|(param, json)| {
      Value::from_json(
        json,
        &TypeKey::new(param.ty.type_id.as_str()),
        param.ty.multiple,
        graph,
      )
      .map_err(|e| ExecutionError::InvalidArguments {
        message: format!("parameter '{}': {}", param.name, e),
      })
    })
    .collect()
}

/// Check already-decoded arguments against `contract`.
pub(crate) fn check_arguments(
  contract: &ProcessContract,
  args: &[Value],
  graph: &TypeGraph,
) -> Result<(), ExecutionError> {
  check_arity(contract, args.len())?;

  for (param, value) in contract.parameters.iter().zip(args) {
    let type_key = TypeKey::new(param.ty.type_id.as_str());
    if !graph.check_value(value, &type_key, param.ty.multiple) {
      return Err(ExecutionError::InvalidArguments {
        message: format!(
          "parameter '{}' expects {}{}, got {}",
          param.name,
          type_key,
          if param.ty.multiple { " list" } else { "" },
          value.kind_name()
        ),
      });
    }
  }
  Ok(())
}

fn check_arity(contract: &ProcessContract, given: usize) -> Result<(), ExecutionError> {
  if given == contract.parameters.len() {
    return Ok(());
  }
  Err(ExecutionError::InvalidArguments {
    message: format!(
      "'{}' takes {} argument(s), got {}",
      contract.name,
      contract.parameters.len(),
      given
    ),
  })
}
