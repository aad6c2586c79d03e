//! Trellis Config
//!
//! This crate contains the serializable process configuration types for
//! Trellis. These types describe a process tree before it is compiled against
//! a callable registry.
//!
//! Configuration is authored outside the engine (a visual editor, a document
//! store, a JSON file) and is an immutable input to compilation. Each node
//! kind carries a `type` discriminator on the wire:
//!
//! - executables: `"BLOCK"`, `"ACTION"`, `"CONTROL"` (with `"control": "CONDITIONAL"`)
//! - expressions: `"FUNCTION"`, `"VALUE"`, `"REFERENCE"`

mod contract;
mod executable;
mod expression;
mod process;

pub use contract::{ParameterDef, ProcessContract, TypeUse};
pub use executable::{
  ActionConfig, Arguments, BlockConfig, ConditionalConfig, ControlStatementConfig,
  ExecutableConfig,
};
pub use expression::{ExpressionConfig, FunctionConfig, ReferenceConfig, ValueConfig};
pub use process::ProcessConfig;
