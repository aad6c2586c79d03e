//! Converters between the built-in value types.

use trellis_spec::{Body, CallArgs, CallError, Operation, Param, Returns, Value, builtin};

pub(crate) fn operations() -> Vec<Operation> {
  vec![
    converter("integer_to_text", builtin::INTEGER, builtin::TEXT, |args| {
      Ok(Value::Text(args.integer(0)?.to_string()))
    }),
    converter("float_to_text", builtin::FLOAT, builtin::TEXT, |args| {
      Ok(Value::Text(args.float(0)?.to_string()))
    }),
    converter("boolean_to_text", builtin::BOOLEAN, builtin::TEXT, |args| {
      Ok(Value::Text(args.boolean(0)?.to_string()))
    }),
    converter("character_to_text", builtin::CHARACTER, builtin::TEXT, |args| {
      match args.value(0)? {
        Value::Character(c) => Ok(Value::Text(c.to_string())),
        other => Err(CallError::failed(format!(
          "expected character, found {}",
          other.kind_name()
        ))),
      }
    }),
    converter("integer_to_float", builtin::INTEGER, builtin::FLOAT, |args| {
      Ok(Value::Float(args.integer(0)? as f64))
    }),
    converter("text_to_integer", builtin::TEXT, builtin::INTEGER, |args| {
      let text = args.text(0)?;
      text
        .trim()
        .parse::<i64>()
        .map(Value::Integer)
        .map_err(|e| CallError::failed(format!("'{}' is not an integer: {}", text, e)))
    }),
  ]
}

fn converter(
  name: &str,
  from: &str,
  to: &str,
  f: fn(CallArgs) -> Result<Value, CallError>,
) -> Operation {
  Operation::converter(name, Body::immediate(f))
    .param(Param::input("value", from))
    .returns(Returns::value(to))
}

#[cfg(test)]
mod tests {
  use trellis_spec::TypeKey;

  use super::*;
  use crate::testing::{call, specification};

  #[test]
  fn test_conversions() {
    assert_eq!(
      call("integer_to_text", vec![Value::Integer(42)]).unwrap(),
      Value::from("42")
    );
    assert_eq!(
      call("integer_to_float", vec![Value::Integer(2)]).unwrap(),
      Value::Float(2.0)
    );
    assert_eq!(
      call("character_to_text", vec![Value::Character('x')]).unwrap(),
      Value::from("x")
    );
    assert_eq!(
      call("text_to_integer", vec![Value::from(" 16 ")]).unwrap(),
      Value::Integer(16)
    );
  }

  #[test]
  fn test_malformed_text_fails_conversion() {
    assert!(call("text_to_integer", vec![Value::from("sixteen")]).is_err());
  }

  #[test]
  fn test_direct_path_preferred() {
    let spec = specification();
    let path = spec
      .graph()
      .conversion_path(&TypeKey::integer(), &TypeKey::text())
      .unwrap();
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].name(), "integer_to_text");
  }
}
