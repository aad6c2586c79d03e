use serde::{Deserialize, Serialize};

use crate::executable::Arguments;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionConfig {
  Function(FunctionConfig),
  Value(ValueConfig),
  Reference(ReferenceConfig),
}

impl ExpressionConfig {
  /// A literal of the given type, e.g. `value("integer", "42")`.
  pub fn value(type_id: impl Into<String>, value: impl Into<String>) -> Self {
    ExpressionConfig::Value(ValueConfig::new(type_id, value))
  }

  /// The value stored at `coordinates`.
  pub fn reference(coordinates: Vec<i32>) -> Self {
    ExpressionConfig::Reference(ReferenceConfig::new(coordinates))
  }
}

/// A call to a registered function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
  pub name: String,
  #[serde(default)]
  pub arguments: Arguments,
}

impl FunctionConfig {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      arguments: Arguments::new(),
    }
  }

  pub fn argument(mut self, name: impl Into<String>, expression: ExpressionConfig) -> Self {
    self
      .arguments
      .entry(name.into())
      .or_default()
      .push(expression);
    self
  }
}

impl From<FunctionConfig> for ExpressionConfig {
  fn from(function: FunctionConfig) -> Self {
    ExpressionConfig::Function(function)
  }
}

/// A literal: text plus the type id it is decoded as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueConfig {
  pub type_id: String,
  pub value: String,
}

impl ValueConfig {
  pub fn new(type_id: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      type_id: type_id.into(),
      value: value.into(),
    }
  }
}

/// A read of a stored variable, optionally walking into its properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceConfig {
  pub coordinates: Vec<i32>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub path: Vec<String>,
  /// Used when the coordinate or path is unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallback: Option<ValueConfig>,
}

impl ReferenceConfig {
  pub fn new(coordinates: Vec<i32>) -> Self {
    Self {
      coordinates,
      path: Vec::new(),
      fallback: None,
    }
  }

  pub fn property(mut self, name: impl Into<String>) -> Self {
    self.path.push(name.into());
    self
  }

  pub fn fallback(mut self, fallback: ValueConfig) -> Self {
    self.fallback = Some(fallback);
    self
  }
}

impl From<ReferenceConfig> for ExpressionConfig {
  fn from(reference: ReferenceConfig) -> Self {
    ExpressionConfig::Reference(reference)
  }
}
