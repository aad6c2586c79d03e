//! Pure functions.

use trellis_spec::{
  Body, CallArgs, CallError, Capability, Operation, Param, Returns, Value, builtin,
};

pub(crate) fn operations() -> Vec<Operation> {
  vec![
    Operation::function("concat", Body::immediate(concat))
      .param(Param::input("values", builtin::TEXT).multiple())
      .returns(Returns::value(builtin::TEXT)),
    Operation::function("length", Body::immediate(length))
      .param(Param::input("value", builtin::TEXT))
      .returns(Returns::value(builtin::INTEGER)),
    binary_integer("add", i64::checked_add),
    binary_integer("subtract", i64::checked_sub),
    binary_integer("multiply", i64::checked_mul),
    Operation::function("sum", Body::immediate(sum))
      .param(Param::input("values", builtin::INTEGER).multiple())
      .returns(Returns::value(builtin::INTEGER)),
    Operation::function("greater_than", Body::immediate(greater_than))
      .param(Param::input("left", builtin::INTEGER))
      .param(Param::input("right", builtin::INTEGER))
      .returns(Returns::value(builtin::BOOLEAN)),
    Operation::function("equals", Body::immediate(equals))
      .param(Param::input("left", builtin::ANY))
      .param(Param::input("right", builtin::ANY))
      .returns(Returns::value(builtin::BOOLEAN)),
    Operation::function("not", Body::immediate(not))
      .param(Param::input("value", builtin::BOOLEAN))
      .returns(Returns::value(builtin::BOOLEAN)),
    Operation::function("and", Body::immediate(|args| fold_booleans(args, true, |a, b| a && b)))
      .param(Param::input("values", builtin::BOOLEAN).multiple())
      .returns(Returns::value(builtin::BOOLEAN)),
    Operation::function("or", Body::immediate(|args| fold_booleans(args, false, |a, b| a || b)))
      .param(Param::input("values", builtin::BOOLEAN).multiple())
      .returns(Returns::value(builtin::BOOLEAN)),
    Operation::function("coalesce", Body::immediate(coalesce))
      .param(Param::input("values", builtin::ANY).multiple().narrows_output())
      .returns(Returns::value(builtin::ANY)),
    Operation::function("is_set", Body::immediate(is_set))
      .param(Param::input("name", builtin::TEXT))
      .param(Param::injected(Capability::ReadOnlyContext))
      .returns(Returns::value(builtin::BOOLEAN)),
  ]
}

fn concat(args: CallArgs) -> Result<Value, CallError> {
  let mut out = String::new();
  for value in args.list(0)? {
    match value {
      Value::Null => {}
      Value::Text(s) => out.push_str(s),
      other => {
        return Err(CallError::failed(format!(
          "concat expects text, found {}",
          other.kind_name()
        )));
      }
    }
  }
  Ok(Value::Text(out))
}

fn length(args: CallArgs) -> Result<Value, CallError> {
  Ok(Value::Integer(args.text(0)?.chars().count() as i64))
}

fn binary_integer(name: &'static str, op: fn(i64, i64) -> Option<i64>) -> Operation {
  Operation::function(
    name,
    Body::immediate(move |args: CallArgs| {
      let (left, right) = (args.integer(0)?, args.integer(1)?);
      op(left, right)
        .map(Value::Integer)
        .ok_or_else(|| CallError::failed(format!("{}({}, {}) overflows", name, left, right)))
    }),
  )
  .param(Param::input("left", builtin::INTEGER))
  .param(Param::input("right", builtin::INTEGER))
  .returns(Returns::value(builtin::INTEGER))
}

fn sum(args: CallArgs) -> Result<Value, CallError> {
  let mut total: i64 = 0;
  for value in args.list(0)? {
    let n = value
      .as_integer()
      .ok_or_else(|| CallError::failed(format!("sum expects integers, found {}", value.kind_name())))?;
    total = total
      .checked_add(n)
      .ok_or_else(|| CallError::failed("sum overflows"))?;
  }
  Ok(Value::Integer(total))
}

fn greater_than(args: CallArgs) -> Result<Value, CallError> {
  Ok(Value::Boolean(args.integer(0)? > args.integer(1)?))
}

fn equals(args: CallArgs) -> Result<Value, CallError> {
  Ok(Value::Boolean(args.value(0)? == args.value(1)?))
}

fn not(args: CallArgs) -> Result<Value, CallError> {
  Ok(Value::Boolean(!args.boolean(0)?))
}

fn fold_booleans(args: CallArgs, init: bool, f: fn(bool, bool) -> bool) -> Result<Value, CallError> {
  let mut acc = init;
  for value in args.list(0)? {
    let b = value
      .as_boolean()
      .ok_or_else(|| CallError::failed(format!("expected boolean, found {}", value.kind_name())))?;
    acc = f(acc, b);
  }
  Ok(Value::Boolean(acc))
}

fn coalesce(args: CallArgs) -> Result<Value, CallError> {
  Ok(
    args
      .list(0)?
      .iter()
      .find(|v| !v.is_null())
      .cloned()
      .unwrap_or(Value::Null),
  )
}

fn is_set(args: CallArgs) -> Result<Value, CallError> {
  let name = args.text(0)?;
  Ok(Value::Boolean(args.read_only_context()?.contains_variable(name)))
}
