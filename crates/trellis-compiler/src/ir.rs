//! The compiled representation of a process.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use trellis_config::ProcessContract;
use trellis_coordinate::Coordinates;
use trellis_spec::{CallableSpec, Capability, ConverterSpec, TypeKey, Value};

/// Compile-time type of an expression or slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticType {
  pub type_key: TypeKey,
  pub multiple: bool,
}

impl StaticType {
  pub fn single(type_key: TypeKey) -> Self {
    Self {
      type_key,
      multiple: false,
    }
  }

  pub fn multiple(type_key: TypeKey) -> Self {
    Self {
      type_key,
      multiple: true,
    }
  }
}

impl fmt::Display for StaticType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.multiple {
      write!(f, "[{}]", self.type_key)
    } else {
      write!(f, "{}", self.type_key)
    }
  }
}

/// A typed expression.
#[derive(Debug, Clone)]
pub enum ExprNode {
  Literal(Value),
  /// Presence-checked read of a stored value.
  Reference {
    coordinates: Coordinates,
    path: Vec<String>,
    fallback: Option<Value>,
  },
  /// Call of a pure function.
  Call {
    function: Arc<CallableSpec>,
    arguments: Vec<ExprNode>,
  },
  /// Converter applied to a single value.
  Convert {
    converter: Arc<ConverterSpec>,
    operand: Box<ExprNode>,
  },
  /// Converter applied to each element of a list.
  ConvertEach {
    converter: Arc<ConverterSpec>,
    operand: Box<ExprNode>,
  },
  /// Values collected into a list for a multi-valued input.
  List(Vec<ExprNode>),
}

/// A process parameter and the initial-variable coordinate it is stored at.
#[derive(Debug, Clone)]
pub struct ParameterSlot {
  pub name: String,
  pub ty: StaticType,
  pub coordinates: Coordinates,
}

#[derive(Debug, Clone)]
pub struct ActionNode {
  pub coordinates: Coordinates,
  pub action: Arc<CallableSpec>,
  /// One expression per declared input, in declaration order.
  pub arguments: Vec<ExprNode>,
  pub injected: Vec<Capability>,
  /// Explicit override, then the action's default. Zero means unbounded.
  pub timeout: Option<Duration>,
  pub output_variable: Option<String>,
  /// Static type of the stored output; `None` for void actions.
  pub output: Option<StaticType>,
  pub children: Option<BlockNode>,
}

#[derive(Debug, Clone)]
pub struct ConditionalNode {
  pub coordinates: Coordinates,
  pub condition: ExprNode,
  pub then_block: BlockNode,
  pub else_block: BlockNode,
}

#[derive(Debug, Clone)]
pub enum StepNode {
  Action(ActionNode),
  Conditional(ConditionalNode),
  Block(BlockNode),
}

impl StepNode {
  pub fn coordinates(&self) -> &Coordinates {
    match self {
      StepNode::Action(a) => &a.coordinates,
      StepNode::Conditional(c) => &c.coordinates,
      StepNode::Block(b) => &b.coordinates,
    }
  }
}

/// How the steps of a block are run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMode {
  /// One after another in list order.
  Sequential,
  /// In waves of step indices; a step only starts once every sibling it
  /// references has completed.
  Concurrent { waves: Vec<Vec<usize>> },
}

#[derive(Debug, Clone)]
pub struct BlockNode {
  pub coordinates: Coordinates,
  pub mode: BlockMode,
  pub steps: Vec<StepNode>,
}

impl BlockNode {
  /// Number of actions in this block and every nested block.
  pub fn action_count(&self) -> usize {
    self
      .steps
      .iter()
      .map(|step| match step {
        StepNode::Action(a) => 1 + a.children.as_ref().map_or(0, BlockNode::action_count),
        StepNode::Conditional(c) => c.then_block.action_count() + c.else_block.action_count(),
        StepNode::Block(b) => b.action_count(),
      })
      .sum()
  }
}

/// A fully resolved and type-checked process.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
  pub process_id: String,
  pub contract: ProcessContract,
  pub parameters: Vec<ParameterSlot>,
  pub root: BlockNode,
  pub output: Option<ExprNode>,
  pub output_type: Option<StaticType>,
}
