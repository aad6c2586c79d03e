//! Text encoding of literal values.
//!
//! Decoding accepts the forms process documents use (`42`, `42i64`, `1.5f`,
//! `'c'`, `TRUE`). Rendering produces Rust-style literals for listings.

use crate::error::ValueError;
use crate::graph::TypeSpec;
use crate::types::builtin;
use crate::value::{EnumValue, Value};

/// Decode `text` as a literal of the type described by `spec`.
pub fn decode_literal(spec: &TypeSpec, text: &str) -> Result<Value, ValueError> {
  let malformed = |reason: &str| ValueError::Malformed {
    type_key: spec.key.clone(),
    text: text.to_string(),
    reason: reason.to_string(),
  };

  match spec.key.as_str() {
    builtin::TEXT => Ok(Value::Text(text.to_string())),
    builtin::INTEGER => {
      let trimmed = text.trim();
      let digits = trimmed
        .strip_suffix("i64")
        .or_else(|| trimmed.strip_suffix(['L', 'l']))
        .unwrap_or(trimmed);
      digits
        .parse::<i64>()
        .map(Value::Integer)
        .map_err(|e| malformed(&e.to_string()))
    }
    builtin::FLOAT => {
      let trimmed = text.trim();
      // `inf` ends in `f`, so the unsuffixed form is tried first.
      if let Ok(n) = trimmed.parse::<f64>() {
        return Ok(Value::Float(n));
      }
      let digits = trimmed
        .strip_suffix("f64")
        .or_else(|| trimmed.strip_suffix(['f', 'F', 'd', 'D']))
        .unwrap_or(trimmed);
      digits
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|e| malformed(&e.to_string()))
    }
    builtin::BOOLEAN => {
      let trimmed = text.trim();
      if trimmed.eq_ignore_ascii_case("true") {
        Ok(Value::Boolean(true))
      } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(Value::Boolean(false))
      } else {
        Err(malformed("expected true or false"))
      }
    }
    builtin::CHARACTER => {
      let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .filter(|t| !t.is_empty())
        .unwrap_or(text);
      let mut chars = inner.chars();
      match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Character(c)),
        _ => Err(malformed("expected exactly one character")),
      }
    }
    _ => match spec.literals() {
      Some(literals) if literals.iter().any(|l| l == text) => Ok(Value::Enum(EnumValue {
        type_key: spec.key.clone(),
        literal: text.to_string(),
      })),
      Some(_) => Err(ValueError::UnknownLiteral {
        type_key: spec.key.clone(),
        literal: text.to_string(),
      }),
      None => Err(ValueError::NotLiteral {
        type_key: spec.key.clone(),
      }),
    },
  }
}

/// Render `value` as a source literal.
pub fn render_literal(value: &Value) -> String {
  match value {
    Value::Null => "None".to_string(),
    Value::Boolean(b) => b.to_string(),
    Value::Integer(n) => format!("{}i64", n),
    Value::Float(n) => render_float(*n),
    Value::Character(c) => format!("{:?}", c),
    Value::Text(s) => format!("{:?}", s),
    Value::Enum(e) => format!("{}::{}", e.type_key, e.literal),
    Value::List(items) => {
      let rendered: Vec<String> = items.iter().map(render_literal).collect();
      format!("vec![{}]", rendered.join(", "))
    }
    Value::Record(record) => {
      let fields: Vec<String> = record
        .fields
        .iter()
        .map(|(name, v)| format!("{}: {}", name, render_literal(v)))
        .collect();
      format!("{} {{ {} }}", record.type_key, fields.join(", "))
    }
  }
}

fn render_float(n: f64) -> String {
  if n.is_nan() {
    "f64::NAN".to_string()
  } else if n == f64::INFINITY {
    "f64::INFINITY".to_string()
  } else if n == f64::NEG_INFINITY {
    "f64::NEG_INFINITY".to_string()
  } else {
    let mut digits = format!("{:?}", n);
    if !digits.contains('.') {
      match digits.find('e') {
        Some(exponent) => digits.insert_str(exponent, ".0"),
        None => digits.push_str(".0"),
      }
    }
    format!("{}f64", digits)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::specification::Specification;
  use crate::types::{TypeDescriptor, TypeKey};

  fn decode(type_id: &str, text: &str) -> Result<Value, ValueError> {
    let spec = Specification::builder()
      .with_type(TypeDescriptor::enumeration("Color", ["RED", "GREEN"]))
      .build()
      .unwrap();
    let type_spec = spec.graph().get(&TypeKey::new(type_id)).unwrap().clone();
    decode_literal(&type_spec, text)
  }

  #[test]
  fn test_decode_integers() {
    assert_eq!(decode("integer", "42").unwrap(), Value::Integer(42));
    assert_eq!(decode("integer", "-7i64").unwrap(), Value::Integer(-7));
    assert_eq!(decode("integer", "12L").unwrap(), Value::Integer(12));
    assert!(matches!(
      decode("integer", "4.2"),
      Err(ValueError::Malformed { .. })
    ));
  }

  #[test]
  fn test_decode_floats() {
    assert_eq!(decode("float", "1.5").unwrap(), Value::Float(1.5));
    assert_eq!(decode("float", "2f").unwrap(), Value::Float(2.0));
    assert_eq!(decode("float", "0.25d").unwrap(), Value::Float(0.25));
    assert_eq!(decode("float", "3.0f64").unwrap(), Value::Float(3.0));
  }

  #[test]
  fn test_decode_non_finite_floats() {
    assert_eq!(decode("float", "inf").unwrap(), Value::Float(f64::INFINITY));
    assert_eq!(decode("float", "-inf").unwrap(), Value::Float(f64::NEG_INFINITY));
    assert_eq!(decode("float", "infinity").unwrap(), Value::Float(f64::INFINITY));
    assert_eq!(decode("float", "inff").unwrap(), Value::Float(f64::INFINITY));
    assert!(matches!(decode("float", "NaN").unwrap(), Value::Float(n) if n.is_nan()));
    assert!(decode("float", "in").is_err());
  }

  #[test]
  fn test_decode_booleans_ignore_case() {
    assert_eq!(decode("boolean", "TRUE").unwrap(), Value::Boolean(true));
    assert_eq!(decode("boolean", "False").unwrap(), Value::Boolean(false));
    assert!(decode("boolean", "yes").is_err());
  }

  #[test]
  fn test_decode_characters() {
    assert_eq!(decode("character", "x").unwrap(), Value::Character('x'));
    assert_eq!(decode("character", "'y'").unwrap(), Value::Character('y'));
    assert_eq!(decode("character", "'").unwrap(), Value::Character('\''));
    assert!(decode("character", "xy").is_err());
    assert!(decode("character", "").is_err());
  }

  #[test]
  fn test_decode_text_is_verbatim() {
    assert_eq!(decode("text", " a b ").unwrap(), Value::from(" a b "));
  }

  #[test]
  fn test_decode_enumeration() {
    let value = decode("Color", "GREEN").unwrap();
    assert_eq!(render_literal(&value), "Color::GREEN");
    assert!(matches!(
      decode("Color", "green"),
      Err(ValueError::UnknownLiteral { .. })
    ));
    assert!(matches!(
      decode("any", "x"),
      Err(ValueError::NotLiteral { .. })
    ));
  }

  #[test]
  fn test_render_literals() {
    assert_eq!(render_literal(&Value::Integer(42)), "42i64");
    assert_eq!(render_literal(&Value::Float(1.5)), "1.5f64");
    assert_eq!(render_literal(&Value::Float(2.0)), "2.0f64");
    assert_eq!(render_literal(&Value::Float(1e300)), "1.0e300f64");
    assert_eq!(render_literal(&Value::Float(f64::NAN)), "f64::NAN");
    assert_eq!(render_literal(&Value::Float(f64::NEG_INFINITY)), "f64::NEG_INFINITY");
    assert_eq!(render_literal(&Value::Character('\n')), "'\\n'");
    assert_eq!(render_literal(&Value::from("say \"hi\"")), "\"say \\\"hi\\\"\"");
    assert_eq!(render_literal(&Value::Boolean(true)), "true");
  }
}
