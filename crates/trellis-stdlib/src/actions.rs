//! Side-effecting actions.

use std::time::Duration;

use tracing::info;
use trellis_spec::{
  Body, CallArgs, CallError, Capability, ExecutionError, Operation, Param, Returns, Value, builtin,
};

pub(crate) fn operations() -> Vec<Operation> {
  vec![
    Operation::action("log", Body::immediate(log))
      .param(Param::input("message", builtin::TEXT))
      .param(Param::injected(Capability::ReadOnlyContext)),
    Operation::action("sleep", Body::deferred(sleep)).param(Param::input("millis", builtin::INTEGER)),
    Operation::action("echo", Body::immediate(echo))
      .param(Param::input("value", builtin::ANY).narrows_output())
      .returns(Returns::value(builtin::ANY)),
    Operation::action("fail", Body::immediate(fail)).param(Param::input("message", builtin::TEXT)),
    Operation::action("set_variable", Body::immediate(set_variable))
      .param(Param::input("name", builtin::TEXT))
      .param(Param::input("value", builtin::ANY).narrows_output())
      .param(Param::injected(Capability::MutableContext))
      .returns(Returns::value(builtin::ANY)),
    Operation::action("get_variable", Body::immediate(get_variable))
      .param(Param::input("name", builtin::TEXT))
      .param(Param::injected(Capability::ReadOnlyContext))
      .returns(Returns::value(builtin::ANY)),
    Operation::action("repeat", Body::deferred(repeat))
      .param(Param::input("times", builtin::INTEGER))
      .param(Param::injected(Capability::ChildActions))
      .returns(Returns::value(builtin::INTEGER)),
  ]
}

fn log(args: CallArgs) -> Result<Value, CallError> {
  let message = args.text(0)?;
  let context = args.read_only_context()?;
  info!(execution_id = %context.execution_id(), message = %message, "process_log");
  Ok(Value::Null)
}

async fn sleep(args: CallArgs) -> Result<Value, CallError> {
  let millis = args.integer(0)?;
  let millis = u64::try_from(millis)
    .map_err(|_| CallError::failed(format!("cannot sleep for {}ms", millis)))?;
  tokio::time::sleep(Duration::from_millis(millis)).await;
  Ok(Value::Null)
}

fn echo(args: CallArgs) -> Result<Value, CallError> {
  Ok(args.value(0)?.clone())
}

fn fail(args: CallArgs) -> Result<Value, CallError> {
  Err(CallError::failed(args.text(0)?))
}

fn set_variable(args: CallArgs) -> Result<Value, CallError> {
  let name = args.text(0)?;
  let value = args.value(1)?.clone();
  args.mutable_context()?.set_variable(name, value.clone());
  Ok(value)
}

fn get_variable(args: CallArgs) -> Result<Value, CallError> {
  let name = args.text(0)?;
  args
    .read_only_context()?
    .variable(name)
    .ok_or_else(|| {
      ExecutionError::MissingNamedVariable {
        name: name.to_string(),
      }
      .into()
    })
}

/// Run the child block `times` times, returning the number of completed
/// iterations.
async fn repeat(args: CallArgs) -> Result<Value, CallError> {
  let times = args.integer(0)?;
  let children = args.child_actions()?;
  for _ in 0..times.max(0) {
    children.run().await?;
  }
  Ok(Value::Integer(times.max(0)))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use async_trait::async_trait;
  use trellis_spec::{ChildActions, Injected};

  use super::*;
  use crate::testing::specification;

  struct CountingChildren(AtomicUsize);

  #[async_trait]
  impl ChildActions for CountingChildren {
    async fn run(&self) -> Result<(), ExecutionError> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(())
    }

    fn len(&self) -> usize {
      1
    }
  }

  #[tokio::test]
  async fn test_repeat_runs_children() {
    let spec = specification();
    let repeat = spec.action("repeat").unwrap().clone();
    let children = Arc::new(CountingChildren(AtomicUsize::new(0)));
    let args = CallArgs::new(vec![Value::Integer(3)])
      .with_injected(vec![Injected::ChildActions(children.clone())]);
    assert_eq!(repeat.call(args).await.unwrap(), Value::Integer(3));
    assert_eq!(children.0.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_sleep_rejects_negative_duration() {
    let spec = specification();
    let sleep = spec.action("sleep").unwrap().clone();
    assert!(sleep.call(CallArgs::new(vec![Value::Integer(-1)])).await.is_err());
    assert!(sleep.call(CallArgs::new(vec![Value::Integer(1)])).await.is_ok());
  }

  #[test]
  fn test_fail_reports_message() {
    let spec = specification();
    let fail = spec.action("fail").unwrap().clone();
    let err = fail.call_immediate(CallArgs::new(vec![Value::from("boom")])).unwrap_err();
    assert_eq!(err.to_string(), "boom");
  }
}
