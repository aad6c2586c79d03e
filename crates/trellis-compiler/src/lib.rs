//! Trellis Compiler
//!
//! Turns a [`ProcessConfig`](trellis_config::ProcessConfig) into a
//! [`CompiledUnit`]: a coordinate-addressed tree of resolved actions,
//! conditionals and typed expressions. Every callable name is resolved against
//! the [`Specification`](trellis_spec::Specification), every argument is
//! checked against its input type and converters are inserted wherever a
//! value has to change type on the way.
//!
//! The unit carries no execution strategy of its own; a backend turns it
//! into an invocable process.

mod compiler;
mod error;
mod ir;
mod listing;
mod schedule;

pub use compiler::ProcessCompiler;
pub use error::ConstructionError;
pub use ir::{
  ActionNode, BlockMode, BlockNode, CompiledUnit, ConditionalNode, ExprNode, ParameterSlot,
  StaticType, StepNode,
};
