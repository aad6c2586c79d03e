//! Trellis Runtime
//!
//! The pieces a running process needs:
//!
//! - [`ExecutionContext`]: one invocation's named variables and
//!   coordinate-indexed action outputs
//! - [`ActionExecutor`]: runs actions on the tokio runtime with per-action
//!   timeouts and a `NOT_STARTED -> RUNNING -> SHUTTING_DOWN -> STOPPED`
//!   lifecycle

mod context;
mod executor;
mod job;

pub use context::{ContextView, ExecutionContext};
pub use executor::{ActionExecutor, ExecutorConfig, ExecutorState};
pub use job::{ActionJob, GroupHandle};
