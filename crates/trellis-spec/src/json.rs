//! Bridging [`Value`] and plain JSON.
//!
//! Process arguments arrive as JSON and outputs are reported as JSON, so the
//! conversion is driven by the declared type rather than by tags.

use serde_json::{Map, Number};

use crate::error::ValueError;
use crate::graph::{TypeGraph, TypeSpec};
use crate::literal::decode_literal;
use crate::types::{TypeKey, TypeKind, builtin};
use crate::value::{Record, Value};

impl Value {
  /// Plain JSON rendering. Non-finite floats become null.
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Value::Null => serde_json::Value::Null,
      Value::Boolean(b) => serde_json::Value::Bool(*b),
      Value::Integer(n) => serde_json::Value::Number((*n).into()),
      Value::Float(n) => Number::from_f64(*n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null),
      Value::Character(c) => serde_json::Value::String(c.to_string()),
      Value::Text(s) => serde_json::Value::String(s.clone()),
      Value::Enum(e) => serde_json::Value::String(e.literal.clone()),
      Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
      Value::Record(record) => {
        let mut map = Map::new();
        for (name, value) in &record.fields {
          map.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
      }
    }
  }

  /// Interpret `json` as a value of `type_key` (a list of them when
  /// `multiple`).
  pub fn from_json(
    json: &serde_json::Value,
    type_key: &TypeKey,
    multiple: bool,
    graph: &TypeGraph,
  ) -> Result<Value, ValueError> {
    if json.is_null() {
      return Ok(Value::Null);
    }
    if multiple {
      let items = json.as_array().ok_or_else(|| mismatch("array", json))?;
      return items
        .iter()
        .map(|item| Value::from_json(item, type_key, false, graph))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List);
    }

    let spec = graph.get(type_key).ok_or_else(|| ValueError::UnknownType {
      type_key: type_key.clone(),
    })?;

    match type_key.as_str() {
      builtin::ANY => Ok(infer(json)),
      builtin::TEXT => json
        .as_str()
        .map(Value::from)
        .ok_or_else(|| mismatch("text", json)),
      builtin::INTEGER => json
        .as_i64()
        .map(Value::Integer)
        .ok_or_else(|| mismatch("integer", json)),
      builtin::FLOAT => json
        .as_f64()
        .map(Value::Float)
        .ok_or_else(|| mismatch("float", json)),
      builtin::BOOLEAN => json
        .as_bool()
        .map(Value::Boolean)
        .ok_or_else(|| mismatch("boolean", json)),
      builtin::CHARACTER => {
        let text = json.as_str().ok_or_else(|| mismatch("character", json))?;
        decode_literal(spec, text)
      }
      _ => from_json_structured(json, spec, graph),
    }
  }
}

fn from_json_structured(
  json: &serde_json::Value,
  spec: &TypeSpec,
  graph: &TypeGraph,
) -> Result<Value, ValueError> {
  match &spec.kind {
    TypeKind::Enumeration { .. } => {
      let literal = json
        .as_str()
        .ok_or_else(|| mismatch(spec.key.as_str(), json))?;
      decode_literal(spec, literal)
    }
    TypeKind::Compound { .. } => {
      let object = json
        .as_object()
        .ok_or_else(|| mismatch(spec.key.as_str(), json))?;
      let mut record = Record::new(spec.key.clone());
      for (name, value) in object {
        let property = spec.property(name).ok_or_else(|| ValueError::Mismatch {
          expected: format!("a property of {}", spec.key),
          found: format!("'{}'", name),
        })?;
        let converted = Value::from_json(value, &property.target, property.multiple, graph)?;
        record.fields.insert(name.clone(), converted);
      }
      Ok(Value::Record(record))
    }
    TypeKind::Value | TypeKind::Opaque => Err(ValueError::NotLiteral {
      type_key: spec.key.clone(),
    }),
  }
}

/// Best-effort value for an untyped (`any`) slot.
fn infer(json: &serde_json::Value) -> Value {
  match json {
    serde_json::Value::Null => Value::Null,
    serde_json::Value::Bool(b) => Value::Boolean(*b),
    serde_json::Value::Number(n) => match n.as_i64() {
      Some(i) => Value::Integer(i),
      None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    },
    serde_json::Value::String(s) => Value::Text(s.clone()),
    serde_json::Value::Array(items) => Value::List(items.iter().map(infer).collect()),
    serde_json::Value::Object(map) => {
      let mut record = Record::new(TypeKey::any());
      for (name, value) in map {
        record.fields.insert(name.clone(), infer(value));
      }
      Value::Record(record)
    }
  }
}

fn mismatch(expected: &str, found: &serde_json::Value) -> ValueError {
  let found = match found {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "boolean",
    serde_json::Value::Number(_) => "number",
    serde_json::Value::String(_) => "string",
    serde_json::Value::Array(_) => "array",
    serde_json::Value::Object(_) => "object",
  };
  ValueError::Mismatch {
    expected: expected.to_string(),
    found: found.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::specification::Specification;
  use crate::types::{PropertyDescriptor, TypeDescriptor};

  fn graph_spec() -> Specification {
    Specification::builder()
      .with_type(
        TypeDescriptor::compound("demo.Pair")
          .property("text", "text")
          .with_property(PropertyDescriptor::new("numbers", "integer").multiple()),
      )
      .with_type(TypeDescriptor::enumeration("Color", ["RED", "GREEN"]))
      .build()
      .unwrap()
  }

  #[test]
  fn test_from_json_scalars() {
    let spec = graph_spec();
    let graph = spec.graph();
    assert_eq!(
      Value::from_json(&json!(16), &TypeKey::integer(), false, graph).unwrap(),
      Value::Integer(16)
    );
    assert_eq!(
      Value::from_json(&json!("x"), &TypeKey::character(), false, graph).unwrap(),
      Value::Character('x')
    );
    assert!(Value::from_json(&json!("16"), &TypeKey::integer(), false, graph).is_err());
  }

  #[test]
  fn test_from_json_record_and_list() {
    let spec = graph_spec();
    let value = Value::from_json(
      &json!([{"text": "a", "numbers": [1, 2]}]),
      &TypeKey::new("demo.Pair"),
      true,
      spec.graph(),
    )
    .unwrap();
    let expected = Value::List(vec![Value::Record(
      Record::new("demo.Pair")
        .field("text", "a")
        .field("numbers", Value::List(vec![Value::Integer(1), Value::Integer(2)])),
    )]);
    assert_eq!(value, expected);
    assert_eq!(
      value.to_json(),
      json!([{"text": "a", "numbers": [1, 2]}])
    );
  }

  #[test]
  fn test_from_json_rejects_unknown_property_and_literal() {
    let spec = graph_spec();
    assert!(
      Value::from_json(&json!({"other": 1}), &TypeKey::new("demo.Pair"), false, spec.graph())
        .is_err()
    );
    assert!(Value::from_json(&json!("BLUE"), &TypeKey::new("Color"), false, spec.graph()).is_err());
  }
}
