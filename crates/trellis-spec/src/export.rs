//! Serializable projection of a [`Specification`], for tooling.

use serde::Serialize;

use crate::callable::{CallableSpec, ConverterSpec};
use crate::graph::TypeSpec;
use crate::specification::Specification;
use crate::types::TypeKind;

#[derive(Debug, Clone, Serialize)]
pub struct InputExport {
  pub name: String,
  pub type_id: String,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub multiple: bool,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub narrows_output: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputExport {
  pub type_id: String,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub multiple: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallableExport {
  pub name: String,
  pub provider: String,
  pub inputs: Vec<InputExport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output: Option<OutputExport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConverterExport {
  pub name: String,
  pub provider: String,
  pub from: String,
  pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyExport {
  pub name: String,
  pub type_id: String,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub multiple: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeExport {
  pub type_id: String,
  pub value_type: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub literals: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub properties: Vec<PropertyExport>,
  pub supertypes: Vec<String>,
}

/// Everything a process author can call and every type they can use.
#[derive(Debug, Clone, Serialize)]
pub struct SpecificationExport {
  pub providers: Vec<String>,
  pub actions: Vec<CallableExport>,
  pub functions: Vec<CallableExport>,
  pub converters: Vec<ConverterExport>,
  pub types: Vec<TypeExport>,
}

impl Specification {
  pub fn export(&self) -> SpecificationExport {
    SpecificationExport {
      providers: self.providers().to_vec(),
      actions: self.actions().map(|c| export_callable(c)).collect(),
      functions: self.functions().map(|c| export_callable(c)).collect(),
      converters: self.converters().map(|c| export_converter(c)).collect(),
      types: self.graph().types().map(export_type).collect(),
    }
  }
}

fn export_callable(callable: &CallableSpec) -> CallableExport {
  CallableExport {
    name: callable.name.clone(),
    provider: callable.provider.clone(),
    inputs: callable
      .inputs
      .iter()
      .map(|i| InputExport {
        name: i.name.clone(),
        type_id: i.type_key.to_string(),
        multiple: i.multiple,
        narrows_output: i.narrows_output,
      })
      .collect(),
    output: callable.output.as_ref().map(|o| OutputExport {
      type_id: o.type_key.to_string(),
      multiple: o.multiple,
    }),
    default_timeout_ms: callable.default_timeout.map(|t| t.as_millis() as u64),
  }
}

fn export_converter(converter: &ConverterSpec) -> ConverterExport {
  ConverterExport {
    name: converter.name().to_string(),
    provider: converter.callable.provider.clone(),
    from: converter.from.to_string(),
    to: converter.to.to_string(),
  }
}

fn export_type(spec: &TypeSpec) -> TypeExport {
  TypeExport {
    type_id: spec.key.to_string(),
    value_type: spec.is_value_type(),
    literals: spec.literals().map(<[String]>::to_vec),
    properties: match &spec.kind {
      TypeKind::Compound { .. } => spec
        .properties
        .values()
        .map(|p| PropertyExport {
          name: p.name.clone(),
          type_id: p.target.to_string(),
          multiple: p.multiple,
        })
        .collect(),
      _ => Vec::new(),
    },
    supertypes: spec.supertypes.iter().map(ToString::to_string).collect(),
  }
}
