//! Trellis Process
//!
//! Turns a [`CompiledUnit`](trellis_compiler::CompiledUnit) into something
//! invocable. A [`Backend`] loads a unit for one [`CompilationStrategy`]; the
//! result is a [`Process`] that accepts the contract's arguments and returns
//! its output.
//!
//! The only strategy implemented today is [`CompilationStrategy::Interpreted`]:
//! a tree-walking interpreter over the compiled tree that hands every action
//! to the shared [`ActionExecutor`](trellis_runtime::ActionExecutor).

mod backend;
mod events;
mod interpreter;
mod plan;
mod process;

pub use backend::{Backend, BackendRegistry, CompilationStrategy, Dependencies};
pub use events::{ChannelNotifier, ExecutionNotifier, NoopNotifier, ProcessEvent};
pub use interpreter::{InterpretedProcess, InterpreterBackend};
pub use process::{Process, ProcessResult, decode_arguments};
