//! Integration tests for ProcessCompiler.

use std::sync::Arc;

use trellis_compiler::{BlockMode, ConstructionError, ExprNode, ProcessCompiler, StepNode};
use trellis_config::{
  ActionConfig, BlockConfig, ConditionalConfig, ExpressionConfig, FunctionConfig, ProcessConfig,
  ProcessContract, ReferenceConfig, TypeUse, ValueConfig,
};
use trellis_coordinate::CoordinateTable;
use trellis_spec::{
  Body, CallArgs, Operation, Param, Provider, Record, Returns, Specification, TypeDescriptor, Value,
};
use trellis_stdlib::StandardProvider;

/// Fixture provider with a compound pair type.
struct PairProvider;

impl Provider for PairProvider {
  fn name(&self) -> &str {
    "demo"
  }

  fn operations(self: Arc<Self>) -> Vec<Operation> {
    vec![
      Operation::action(
        "record_pair",
        Body::immediate(|args: CallArgs| {
          Ok(Value::Record(
            Record::new("demo.Pair")
              .field("text", args.text(0)?)
              .field("number", args.integer(1)?),
          ))
        }),
      )
      .param(Param::input("text", "text"))
      .param(Param::input("number", "integer"))
      .returns(Returns::value("demo.Pair")),
      Operation::action("touch", Body::immediate(|_| Ok(Value::Null))),
    ]
  }

  fn types(&self) -> Vec<TypeDescriptor> {
    vec![
      TypeDescriptor::compound("demo.Pair")
        .property("text", "text")
        .property("number", "integer"),
    ]
  }
}

fn specification() -> Specification {
  Specification::builder()
    .with_provider(Arc::new(StandardProvider::new()))
    .unwrap()
    .with_provider(Arc::new(PairProvider))
    .unwrap()
    .build()
    .unwrap()
}

fn compile(config: &ProcessConfig) -> Result<trellis_compiler::CompiledUnit, ConstructionError> {
  let spec = specification();
  let table = CoordinateTable::new();
  ProcessCompiler::new(&spec, &table).compile(config)
}

fn text(value: &str) -> ExpressionConfig {
  ExpressionConfig::value("text", value)
}

fn integer(value: &str) -> ExpressionConfig {
  ExpressionConfig::value("integer", value)
}

fn pair_action(prefix: &str, offset: &str) -> ActionConfig {
  ActionConfig::new("record_pair")
    .argument(
      "text",
      FunctionConfig::new("concat")
        .argument("values", text(prefix))
        .argument("values", ExpressionConfig::reference(vec![-1]))
        .into(),
    )
    .argument(
      "number",
      FunctionConfig::new("add")
        .argument("left", integer(offset))
        .argument("right", ExpressionConfig::reference(vec![-2]))
        .into(),
    )
}

fn sum_process() -> ProcessConfig {
  ProcessConfig {
    process_id: "sum".to_string(),
    contract: ProcessContract::new("sum")
      .parameter("text", TypeUse::single("text"))
      .parameter("number", TypeUse::single("integer"))
      .returns(TypeUse::single("text")),
    root: BlockConfig::new(vec![
      pair_action("Hello, ", "3").into(),
      pair_action("Hi, ", "7").into(),
    ]),
    returns: Some(
      FunctionConfig::new("concat")
        .argument("values", text("The sum is "))
        .argument(
          "values",
          FunctionConfig::new("add")
            .argument(
              "left",
              ReferenceConfig::new(vec![0]).property("number").into(),
            )
            .argument(
              "right",
              ReferenceConfig::new(vec![1]).property("number").into(),
            )
            .into(),
        )
        .into(),
    ),
  }
}

fn void_process(root: BlockConfig) -> ProcessConfig {
  ProcessConfig {
    process_id: "test".to_string(),
    contract: ProcessContract::new("test").parameter("value", TypeUse::single("integer")),
    root,
    returns: None,
  }
}

#[test]
fn test_converter_inserted_for_integer_in_text_list() {
  let unit = compile(&sum_process()).unwrap();
  let Some(ExprNode::Call { function, arguments }) = &unit.output else {
    panic!("expected a call");
  };
  assert_eq!(function.name, "concat");
  let ExprNode::List(items) = &arguments[0] else {
    panic!("expected a list argument");
  };
  assert!(matches!(
    &items[1],
    ExprNode::Convert { converter, .. } if converter.name() == "integer_to_text"
  ));
  assert!(unit.listing().contains("integer_to_text(add(@[0].number, @[1].number))"));
}

#[test]
fn test_compile_twice_is_deterministic() {
  let first = compile(&sum_process()).unwrap();
  let second = compile(&sum_process()).unwrap();
  assert_eq!(first.listing(), second.listing());
  assert_eq!(first.root.action_count(), 2);
}

#[test]
fn test_listing_renders_literals() {
  let listing = compile(&sum_process()).unwrap().listing();
  assert!(listing.starts_with("process sum sum(text: text, number: integer) -> text\n"));
  assert!(listing.contains("[0] action record_pair(text = concat([\"Hello, \", @[-1]]), number = add(3i64, @[-2])) -> demo.Pair"));
}

#[test]
fn test_unknown_action_reports_coordinates() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("touch").into(),
    BlockConfig::new(vec![ActionConfig::new("missing").into()]).into(),
  ]));
  let err = compile(&config).unwrap_err();
  assert!(matches!(err, ConstructionError::UnknownAction { ref name, .. } if name == "missing"));
  assert_eq!(err.coordinates().unwrap().as_slice(), &[1, 0]);
}

#[test]
fn test_unknown_function_and_argument() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("log")
      .argument("message", FunctionConfig::new("nope").into())
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::UnknownFunction { .. }
  ));

  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("log")
      .argument("message", text("x"))
      .argument("level", text("x"))
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::UnknownArgument { .. }
  ));
}

#[test]
fn test_single_input_needs_exactly_one_expression() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("log")
      .argument("message", text("a"))
      .argument("message", text("b"))
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::MultiplicityMismatch { .. }
  ));

  let config = void_process(BlockConfig::new(vec![ActionConfig::new("log").into()]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::MultiplicityMismatch { .. }
  ));
}

#[test]
fn test_unsatisfiable_type_fails() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("record_pair")
      .argument("text", text("a"))
      .argument("number", integer("1"))
      .into(),
    ActionConfig::new("log")
      .argument("message", ExpressionConfig::reference(vec![0]))
      .into(),
  ]));
  let err = compile(&config).unwrap_err();
  assert!(matches!(err, ConstructionError::TypeMismatch { .. }));
  assert_eq!(err.coordinates().unwrap().as_slice(), &[1]);
}

#[test]
fn test_condition_must_be_boolean() {
  let config = void_process(BlockConfig::new(vec![
    ConditionalConfig {
      condition: integer("1"),
      then_block: BlockConfig::default(),
      else_block: BlockConfig::default(),
    }
    .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::TypeMismatch { .. }
  ));
}

#[test]
fn test_invalid_literal() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("sleep")
      .argument("millis", integer("soon"))
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::InvalidLiteral { .. }
  ));
}

#[test]
fn test_reference_checks() {
  let void_reference = void_process(BlockConfig::new(vec![
    ActionConfig::new("touch").into(),
    ActionConfig::new("log")
      .argument("message", ExpressionConfig::reference(vec![0]))
      .into(),
  ]));
  assert!(matches!(
    compile(&void_reference).unwrap_err(),
    ConstructionError::UnknownReference { .. }
  ));

  let undeclared = void_process(BlockConfig::new(vec![
    pair_action("a", "1").into(),
    ActionConfig::new("log")
      .argument(
        "message",
        ReferenceConfig::new(vec![0]).property("missing").into(),
      )
      .into(),
  ]));
  assert!(matches!(
    compile(&undeclared).unwrap_err(),
    ConstructionError::UndeclaredProperty { .. }
  ));

  let out_of_range = void_process(BlockConfig::new(vec![
    ActionConfig::new("sleep")
      .argument("millis", ExpressionConfig::reference(vec![-3]))
      .into(),
  ]));
  assert!(matches!(
    compile(&out_of_range).unwrap_err(),
    ConstructionError::UnknownReference { .. }
  ));
}

#[test]
fn test_fallback_must_match_reference_type() {
  let config = void_process(BlockConfig::new(vec![
    pair_action("a", "1").into(),
    ActionConfig::new("log")
      .argument(
        "message",
        ReferenceConfig::new(vec![0])
          .property("text")
          .fallback(ValueConfig::new("text", "none"))
          .into(),
      )
      .into(),
  ]));
  assert!(compile(&config).is_ok());

  let config = void_process(BlockConfig::new(vec![
    pair_action("a", "1").into(),
    ActionConfig::new("sleep")
      .argument(
        "millis",
        ReferenceConfig::new(vec![0])
          .property("number")
          .fallback(ValueConfig::new("boolean", "true"))
          .into(),
      )
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::TypeMismatch { .. }
  ));
}

#[test]
fn test_conditional_blocks_are_addressed_below_the_condition() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("touch").into(),
    ConditionalConfig {
      condition: ExpressionConfig::value("boolean", "true"),
      then_block: BlockConfig::new(vec![ActionConfig::new("touch").into()]),
      else_block: BlockConfig::new(vec![
        ActionConfig::new("touch").into(),
        ActionConfig::new("touch").into(),
      ]),
    }
    .into(),
  ]));
  let unit = compile(&config).unwrap();
  let StepNode::Conditional(conditional) = &unit.root.steps[1] else {
    panic!("expected a conditional");
  };
  assert_eq!(conditional.then_block.coordinates.as_slice(), &[1, 0]);
  assert_eq!(conditional.then_block.steps[0].coordinates().as_slice(), &[1, 0, 0]);
  assert_eq!(conditional.else_block.steps[1].coordinates().as_slice(), &[1, 1, 1]);
}

#[test]
fn test_children_require_capability() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("touch")
      .children(BlockConfig::new(vec![ActionConfig::new("touch").into()]))
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::ChildrenNotAccepted { .. }
  ));

  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("repeat")
      .argument("times", integer("2"))
      .children(BlockConfig::new(vec![ActionConfig::new("touch").into()]))
      .into(),
  ]));
  let unit = compile(&config).unwrap();
  let StepNode::Action(repeat) = &unit.root.steps[0] else {
    panic!("expected an action");
  };
  let children = repeat.children.as_ref().unwrap();
  assert_eq!(children.steps[0].coordinates().as_slice(), &[0, 0, 0]);
}

#[test]
fn test_concurrent_block_waves() {
  let config = void_process(BlockConfig::concurrent(vec![
    pair_action("a", "1").into(),
    ActionConfig::new("log")
      .argument("message", ReferenceConfig::new(vec![0]).property("text").into())
      .into(),
    ActionConfig::new("touch").into(),
  ]));
  let unit = compile(&config).unwrap();
  assert_eq!(
    unit.root.mode,
    BlockMode::Concurrent {
      waves: vec![vec![0, 2], vec![1]]
    }
  );
}

#[test]
fn test_concurrent_reference_cycle_rejected() {
  let config = void_process(BlockConfig::concurrent(vec![
    ActionConfig::new("echo")
      .argument("value", ExpressionConfig::reference(vec![1]))
      .into(),
    ActionConfig::new("echo")
      .argument("value", ExpressionConfig::reference(vec![0]))
      .into(),
  ]));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::ReferenceCycle { .. }
  ));
}

#[test]
fn test_narrowed_output_type() {
  let config = void_process(BlockConfig::new(vec![
    ActionConfig::new("echo").argument("value", integer("5")).into(),
    ActionConfig::new("sleep")
      .argument("millis", ExpressionConfig::reference(vec![0]))
      .into(),
  ]));
  let unit = compile(&config).unwrap();
  let StepNode::Action(echo) = &unit.root.steps[0] else {
    panic!("expected an action");
  };
  assert_eq!(echo.output.as_ref().unwrap().type_key.as_str(), "integer");
}

#[test]
fn test_list_reference_passes_through_multi_valued_input() {
  let config = ProcessConfig {
    process_id: "join".to_string(),
    contract: ProcessContract::new("join")
      .parameter("parts", TypeUse::multiple("text"))
      .returns(TypeUse::single("text")),
    root: BlockConfig::default(),
    returns: Some(
      FunctionConfig::new("concat")
        .argument("values", ExpressionConfig::reference(vec![-1]))
        .into(),
    ),
  };
  let unit = compile(&config).unwrap();
  let Some(ExprNode::Call { arguments, .. }) = &unit.output else {
    panic!("expected a call");
  };
  assert!(matches!(arguments[0], ExprNode::Reference { .. }));
}

#[test]
fn test_return_must_match_contract() {
  let mut config = sum_process();
  config.returns = None;
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::MissingReturn { .. }
  ));

  let mut config = void_process(BlockConfig::default());
  config.returns = Some(text("x"));
  assert!(matches!(
    compile(&config).unwrap_err(),
    ConstructionError::UnexpectedReturn { .. }
  ));
}

#[test]
fn test_unknown_contract_type() {
  let config = ProcessConfig {
    process_id: "bad".to_string(),
    contract: ProcessContract::new("bad").parameter("x", TypeUse::single("demo.Missing")),
    root: BlockConfig::default(),
    returns: None,
  };
  let err = compile(&config).unwrap_err();
  assert!(matches!(err, ConstructionError::UnknownType { .. }));
  assert_eq!(err.coordinates().unwrap().as_slice(), &[-1]);
}
