//! Runtime values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::TypeKey;

/// A literal of an enumeration type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
  pub type_key: TypeKey,
  pub literal: String,
}

/// An instance of a compound type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub type_key: TypeKey,
  pub fields: BTreeMap<String, Value>,
}

impl Record {
  pub fn new(type_key: impl Into<TypeKey>) -> Self {
    Self {
      type_key: type_key.into(),
      fields: BTreeMap::new(),
    }
  }

  pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.insert(name.into(), value.into());
    self
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }
}

/// A value flowing through a process.
///
/// Multi-valued inputs and outputs are carried as [`Value::List`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
  Null,
  Boolean(bool),
  Integer(i64),
  Float(f64),
  Character(char),
  Text(String),
  Enum(EnumValue),
  List(Vec<Value>),
  Record(Record),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  /// Short name of the value's variant, used in error messages.
  pub fn kind_name(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Boolean(_) => "boolean",
      Value::Integer(_) => "integer",
      Value::Float(_) => "float",
      Value::Character(_) => "character",
      Value::Text(_) => "text",
      Value::Enum(_) => "enum",
      Value::List(_) => "list",
      Value::Record(_) => "record",
    }
  }

  /// The concrete type of a single value. `None` for null and lists.
  pub fn runtime_type(&self) -> Option<TypeKey> {
    match self {
      Value::Null | Value::List(_) => None,
      Value::Boolean(_) => Some(TypeKey::boolean()),
      Value::Integer(_) => Some(TypeKey::integer()),
      Value::Float(_) => Some(TypeKey::float()),
      Value::Character(_) => Some(TypeKey::character()),
      Value::Text(_) => Some(TypeKey::text()),
      Value::Enum(e) => Some(e.type_key.clone()),
      Value::Record(r) => Some(r.type_key.clone()),
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Value::Integer(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_float(&self) -> Option<f64> {
    match self {
      Value::Float(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_boolean(&self) -> Option<bool> {
    match self {
      Value::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_character(&self) -> Option<char> {
    match self {
      Value::Character(c) => Some(*c),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_record(&self) -> Option<&Record> {
    match self {
      Value::Record(r) => Some(r),
      _ => None,
    }
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Boolean(b)
  }
}

impl From<i64> for Value {
  fn from(n: i64) -> Self {
    Value::Integer(n)
  }
}

impl From<f64> for Value {
  fn from(n: f64) -> Self {
    Value::Float(n)
  }
}

impl From<char> for Value {
  fn from(c: char) -> Self {
    Value::Character(c)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Text(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Text(s)
  }
}

impl From<Vec<Value>> for Value {
  fn from(items: Vec<Value>) -> Self {
    Value::List(items)
  }
}

impl From<Record> for Value {
  fn from(record: Record) -> Self {
    Value::Record(record)
  }
}

impl From<EnumValue> for Value {
  fn from(value: EnumValue) -> Self {
    Value::Enum(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_runtime_type() {
    assert_eq!(Value::from(3i64).runtime_type(), Some(TypeKey::integer()));
    assert_eq!(Value::Null.runtime_type(), None);
    let record = Record::new("demo.Pair").field("text", "a");
    assert_eq!(
      Value::from(record).runtime_type(),
      Some(TypeKey::new("demo.Pair"))
    );
  }

  #[test]
  fn test_serde_shape() {
    let json = serde_json::to_value(Value::from(7i64)).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "integer", "value": 7}));
    let back: Value = serde_json::from_value(json).unwrap();
    assert_eq!(back, Value::Integer(7));
  }
}
