use serde::{Deserialize, Serialize};

/// A type as used by a parameter or an output: a type id plus multiplicity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeUse {
  pub type_id: String,
  /// `true` for a homogeneous array of `type_id`.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub multiple: bool,
}

impl TypeUse {
  pub fn single(type_id: impl Into<String>) -> Self {
    Self {
      type_id: type_id.into(),
      multiple: false,
    }
  }

  pub fn multiple(type_id: impl Into<String>) -> Self {
    Self {
      type_id: type_id.into(),
      multiple: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDef {
  pub name: String,
  #[serde(flatten)]
  pub ty: TypeUse,
}

/// The functional contract a process realizes: a single entry point with
/// ordered typed parameters and an optional return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessContract {
  pub name: String,
  #[serde(default)]
  pub parameters: Vec<ParameterDef>,
  /// `None` for void processes.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<TypeUse>,
}

impl ProcessContract {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      parameters: Vec::new(),
      output: None,
    }
  }

  pub fn parameter(mut self, name: impl Into<String>, ty: TypeUse) -> Self {
    self.parameters.push(ParameterDef {
      name: name.into(),
      ty,
    });
    self
  }

  pub fn returns(mut self, ty: TypeUse) -> Self {
    self.output = Some(ty);
    self
  }
}
