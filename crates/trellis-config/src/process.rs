use serde::{Deserialize, Serialize};

use crate::contract::ProcessContract;
use crate::executable::BlockConfig;
use crate::expression::ExpressionConfig;

/// A complete process definition: contract, body and return expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
  pub process_id: String,
  pub contract: ProcessContract,
  pub root: BlockConfig,
  /// Compiled against the contract's output type. `None` for void processes.
  #[serde(default, rename = "return", skip_serializing_if = "Option::is_none")]
  pub returns: Option<ExpressionConfig>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    ActionConfig, ConditionalConfig, ExecutableConfig, FunctionConfig, ReferenceConfig, TypeUse,
    ValueConfig,
  };

  fn sample() -> ProcessConfig {
    ProcessConfig {
      process_id: "greeter".to_string(),
      contract: ProcessContract::new("greet")
        .parameter("name", TypeUse::single("text"))
        .returns(TypeUse::single("text")),
      root: BlockConfig::new(vec![
        ActionConfig::new("log")
          .argument("message", ExpressionConfig::reference(vec![-1]))
          .into(),
        ConditionalConfig {
          condition: ExpressionConfig::value("boolean", "true"),
          then_block: BlockConfig::default(),
          else_block: BlockConfig::default(),
        }
        .into(),
      ]),
      returns: Some(
        FunctionConfig::new("concat")
          .argument("values", ExpressionConfig::value("text", "Hi "))
          .argument(
            "values",
            ReferenceConfig::new(vec![-1])
              .fallback(ValueConfig::new("text", "nobody"))
              .into(),
          )
          .into(),
      ),
    }
  }

  #[test]
  fn test_wire_shape_uses_type_discriminators() {
    let value = serde_json::to_value(sample()).unwrap();

    assert_eq!(value["root"]["executables"][0]["type"], "ACTION");
    assert_eq!(value["root"]["executables"][1]["type"], "CONTROL");
    assert_eq!(value["root"]["executables"][1]["control"], "CONDITIONAL");
    assert_eq!(value["return"]["type"], "FUNCTION");
    assert_eq!(
      value["return"]["arguments"]["values"][1],
      json!({
        "type": "REFERENCE",
        "coordinates": [-1],
        "fallback": { "type_id": "text", "value": "nobody" }
      })
    );
    assert_eq!(
      value["return"]["arguments"]["values"][0],
      json!({ "type": "VALUE", "type_id": "text", "value": "Hi " })
    );
  }

  #[test]
  fn test_round_trip() {
    let config = sample();
    let text = serde_json::to_string(&config).unwrap();
    let parsed: ProcessConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, config);
  }

  #[test]
  fn test_parse_minimal_document() {
    let parsed: ProcessConfig = serde_json::from_value(json!({
      "process_id": "noop",
      "contract": { "name": "run" },
      "root": {
        "executables": [
          { "type": "ACTION", "name": "sleep", "timeout_ms": 5 },
          { "type": "BLOCK", "concurrent": true }
        ]
      }
    }))
    .unwrap();

    assert!(parsed.returns.is_none());
    assert!(parsed.contract.output.is_none());
    match &parsed.root.executables[0] {
      ExecutableConfig::Action(action) => {
        assert_eq!(action.name, "sleep");
        assert_eq!(action.timeout_ms, Some(5));
        assert!(action.arguments.is_empty());
      }
      other => panic!("expected action, got {:?}", other),
    }
    assert!(matches!(
      &parsed.root.executables[1],
      ExecutableConfig::Block(block) if block.concurrent && block.executables.is_empty()
    ));
  }
}
