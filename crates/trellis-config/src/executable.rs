use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expression::ExpressionConfig;

/// Named argument lists. Single-valued inputs take exactly one expression,
/// multi-valued inputs take any number.
pub type Arguments = BTreeMap<String, Vec<ExpressionConfig>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutableConfig {
  Block(BlockConfig),
  Action(ActionConfig),
  Control(ControlStatementConfig),
}

/// An ordered list of executables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
  #[serde(default)]
  pub executables: Vec<ExecutableConfig>,
  /// Run the executables concurrently. Only in-block references order them.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub concurrent: bool,
}

impl BlockConfig {
  pub fn new(executables: Vec<ExecutableConfig>) -> Self {
    Self {
      executables,
      concurrent: false,
    }
  }

  pub fn concurrent(executables: Vec<ExecutableConfig>) -> Self {
    Self {
      executables,
      concurrent: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
  /// Registered action name.
  pub name: String,
  #[serde(default)]
  pub arguments: Arguments,
  /// Also publish the result as a named process variable.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_variable: Option<String>,
  /// Overrides the action's default timeout. `0` means unbounded.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Nested executables handed to the action as its child-action group.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub children: Option<BlockConfig>,
}

impl ActionConfig {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      arguments: Arguments::new(),
      output_variable: None,
      timeout_ms: None,
      children: None,
    }
  }

  /// Append an expression to the named argument list.
  pub fn argument(mut self, name: impl Into<String>, expression: ExpressionConfig) -> Self {
    self
      .arguments
      .entry(name.into())
      .or_default()
      .push(expression);
    self
  }

  pub fn output_variable(mut self, name: impl Into<String>) -> Self {
    self.output_variable = Some(name.into());
    self
  }

  pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
    self.timeout_ms = Some(timeout_ms);
    self
  }

  pub fn children(mut self, block: BlockConfig) -> Self {
    self.children = Some(block);
    self
  }
}

impl From<ActionConfig> for ExecutableConfig {
  fn from(action: ActionConfig) -> Self {
    ExecutableConfig::Action(action)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlStatementConfig {
  Conditional(ConditionalConfig),
}

/// `if condition { then_block } else { else_block }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalConfig {
  pub condition: ExpressionConfig,
  pub then_block: BlockConfig,
  #[serde(default)]
  pub else_block: BlockConfig,
}

impl From<ConditionalConfig> for ExecutableConfig {
  fn from(conditional: ConditionalConfig) -> Self {
    ExecutableConfig::Control(ControlStatementConfig::Conditional(conditional))
  }
}

impl From<BlockConfig> for ExecutableConfig {
  fn from(block: BlockConfig) -> Self {
    ExecutableConfig::Block(block)
  }
}
