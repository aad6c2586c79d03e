//! Trellis Spec
//!
//! The specification layer of the process engine:
//!
//! - [`Value`]: the runtime value model and its literal encoding
//! - [`TypeDescriptor`] / [`TypeGraph`]: registered types, their properties
//!   and the supertype closure (inheritance plus converter-implied
//!   substitution)
//! - [`Provider`] / [`Operation`]: the explicit registration API providers use
//!   to describe their actions, functions and converters
//! - [`SpecificationBuilder`] / [`Specification`]: validation and the
//!   immutable callable registry built once per engine
//!
//! The registry and graph are read-only after [`SpecificationBuilder::build`]
//! and can be shared across threads without locking.

mod builder;
mod callable;
mod capability;
mod error;
mod export;
mod graph;
mod json;
mod literal;
mod operation;
mod specification;
mod types;
mod value;

pub use builder::SpecificationBuilder;
pub use callable::{CallableSpec, ConverterSpec, InputSpec, OutputSpec};
pub use capability::{ChildActions, MutableContext, ReadOnlyContext};
pub use error::{CallError, ConfigurationError, ExecutionError, ExecutionErrorKind, ValueError};
pub use export::{
  CallableExport, ConverterExport, InputExport, OutputExport, PropertyExport,
  SpecificationExport, TypeExport,
};
pub use graph::{PropertySpec, TypeGraph, TypeSpec};
pub use literal::{decode_literal, render_literal};
pub use operation::{
  Body, CallArgs, Capability, Injected, Marker, Operation, Param, Provider, Returns,
};
pub use specification::Specification;
pub use types::{PropertyDescriptor, TypeDescriptor, TypeKey, TypeKind, builtin};
pub use value::{EnumValue, Record, Value};
