//! Provider registration and validation.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::callable::{CallableSpec, ConverterSpec, InputSpec, OutputSpec};
use crate::error::ConfigurationError;
use crate::graph::TypeGraph;
use crate::operation::{Marker, Operation, Param, Provider, Returns};
use crate::specification::Specification;
use crate::types::{TypeDescriptor, TypeKey, builtin};

/// Collects providers and types, then validates them into a
/// [`Specification`].
///
/// Each provider is validated as a unit: if any of its operations is
/// rejected, nothing from that provider is registered. A later registration
/// under an existing name replaces the earlier one.
pub struct SpecificationBuilder {
  declared: BTreeMap<TypeKey, TypeDescriptor>,
  references: Vec<(TypeKey, String)>,
  actions: BTreeMap<String, Arc<CallableSpec>>,
  functions: BTreeMap<String, Arc<CallableSpec>>,
  converters: BTreeMap<String, Arc<ConverterSpec>>,
  providers: Vec<String>,
}

impl SpecificationBuilder {
  pub fn new() -> Self {
    Self {
      declared: BTreeMap::new(),
      references: Vec::new(),
      actions: BTreeMap::new(),
      functions: BTreeMap::new(),
      converters: BTreeMap::new(),
      providers: Vec::new(),
    }
  }

  /// Declare a type outside of any provider.
  pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
    self.declare_type(descriptor);
    self
  }

  pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Result<Self, ConfigurationError> {
    self.register(provider)?;
    Ok(self)
  }

  /// Validate and register every operation and type of `provider`.
  pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<(), ConfigurationError> {
    let provider_name = provider.name().to_string();
    let types = provider.types();
    let operations = Arc::clone(&provider).operations();

    let mut staged = Vec::with_capacity(operations.len());
    for operation in operations {
      if let Some(callable) = validate_operation(&provider_name, operation)? {
        staged.push(callable);
      }
    }

    for descriptor in types {
      self.declare_type(descriptor);
    }

    let mut counts = (0usize, 0usize, 0usize);
    for callable in staged {
      let referenced_by = format!("{} '{}'", callable.kind, callable.name);
      for input in &callable.inputs {
        self
          .references
          .push((input.type_key.clone(), referenced_by.clone()));
      }
      if let Some(output) = &callable.output {
        self
          .references
          .push((output.type_key.clone(), referenced_by.clone()));
      }

      let name = callable.name.clone();
      let replaced = match callable.kind {
        Marker::Action => {
          counts.0 += 1;
          self.actions.insert(name.clone(), Arc::new(callable)).is_some()
        }
        Marker::Function => {
          counts.1 += 1;
          self.functions.insert(name.clone(), Arc::new(callable)).is_some()
        }
        Marker::Converter => {
          counts.2 += 1;
          let from = callable.inputs[0].type_key.clone();
          let to = callable
            .output
            .as_ref()
            .map(|o| o.type_key.clone())
            .unwrap_or_else(TypeKey::any);
          let converter = ConverterSpec {
            callable: Arc::new(callable),
            from,
            to,
          };
          self.converters.insert(name.clone(), Arc::new(converter)).is_some()
        }
      };
      if replaced {
        warn!(provider = %provider_name, name = %name, "callable_replaced");
      }
    }

    info!(
      provider = %provider_name,
      actions = counts.0,
      functions = counts.1,
      converters = counts.2,
      "provider_registered"
    );
    self.providers.push(provider_name);
    Ok(())
  }

  /// Resolve the type graph and freeze the registry.
  pub fn build(self) -> Result<Specification, ConfigurationError> {
    let mut descriptors = builtin_descriptors();
    for (key, descriptor) in self.declared {
      if descriptors.contains_key(&key) {
        return Err(ConfigurationError::MalformedType {
          type_key: key,
          reason: "built-in types cannot be redeclared".to_string(),
        });
      }
      descriptors.insert(key, descriptor);
    }

    for (type_key, referenced_by) in self.references {
      if !descriptors.contains_key(&type_key) {
        return Err(ConfigurationError::UnknownType {
          type_key,
          referenced_by,
        });
      }
    }

    let converters: Vec<Arc<ConverterSpec>> = self.converters.values().cloned().collect();
    let graph = TypeGraph::build(&descriptors, &converters)?;

    debug!(
      types = descriptors.len(),
      actions = self.actions.len(),
      functions = self.functions.len(),
      converters = converters.len(),
      "specification_built"
    );

    Ok(Specification::new(
      self.actions,
      self.functions,
      self.converters,
      graph,
      self.providers,
    ))
  }

  fn declare_type(&mut self, descriptor: TypeDescriptor) {
    let key = descriptor.key.clone();
    if self.declared.insert(key.clone(), descriptor).is_some() {
      warn!(type_key = %key, "type_replaced");
    }
  }
}

impl Default for SpecificationBuilder {
  fn default() -> Self {
    Self::new()
  }
}

fn builtin_descriptors() -> BTreeMap<TypeKey, TypeDescriptor> {
  let mut descriptors = BTreeMap::new();
  descriptors.insert(TypeKey::any(), TypeDescriptor::opaque(builtin::ANY));
  for key in builtin::VALUE_TYPES {
    descriptors.insert(TypeKey::new(key), TypeDescriptor::value(key));
  }
  descriptors
}

/// Check one operation. `Ok(None)` for operations without a marker.
fn validate_operation(
  provider: &str,
  operation: Operation,
) -> Result<Option<CallableSpec>, ConfigurationError> {
  let name = operation.registered_name().to_string();

  let mut markers = operation.markers.clone();
  markers.sort();
  markers.dedup();
  let marker = match markers.as_slice() {
    [] => {
      debug!(provider = %provider, operation = %name, "operation_skipped");
      return Ok(None);
    }
    [marker] => *marker,
    many => {
      let rendered: Vec<String> = many.iter().map(ToString::to_string).collect();
      return Err(ConfigurationError::ConflictingMarkers {
        provider: provider.to_string(),
        operation: name,
        markers: rendered.join(" and "),
      });
    }
  };

  if name.is_empty() {
    return Err(ConfigurationError::EmptyName {
      provider: provider.to_string(),
    });
  }

  if operation.body.is_deferred() && marker != Marker::Action {
    return Err(ConfigurationError::DeferredBody {
      provider: provider.to_string(),
      operation: name,
      marker,
    });
  }

  let mut inputs: Vec<InputSpec> = Vec::new();
  let mut injected = Vec::new();
  for param in operation.params {
    match param {
      Param::Input {
        name: declared,
        rename,
        type_key,
        multiple,
        narrows_output,
      } => {
        let input_name = rename.unwrap_or(declared);
        if inputs.iter().any(|i| i.name == input_name) {
          return Err(ConfigurationError::DuplicateInput {
            provider: provider.to_string(),
            operation: name,
            input: input_name,
          });
        }
        inputs.push(InputSpec {
          name: input_name,
          type_key,
          multiple,
          narrows_output,
        });
      }
      Param::Injected(capability) => {
        if !capability.allowed_for(marker) {
          return Err(ConfigurationError::IllegalInjection {
            provider: provider.to_string(),
            operation: name,
            marker,
            capability,
          });
        }
        injected.push(capability);
      }
    }
  }

  let output = match operation.returns {
    Returns::Void => None,
    Returns::Value { type_key, multiple } => Some(OutputSpec { type_key, multiple }),
  };

  match marker {
    Marker::Function if output.is_none() => {
      return Err(ConfigurationError::VoidFunction {
        provider: provider.to_string(),
        operation: name,
      });
    }
    Marker::Converter => {
      let invalid = |reason: &str| ConfigurationError::InvalidConverter {
        provider: provider.to_string(),
        operation: name.clone(),
        reason: reason.to_string(),
      };
      let [input] = inputs.as_slice() else {
        return Err(invalid("a converter takes exactly one input"));
      };
      if input.multiple {
        return Err(invalid("a converter input cannot be multi-valued"));
      }
      match &output {
        None => return Err(invalid("a converter must return a value")),
        Some(out) if out.multiple => {
          return Err(invalid("a converter output cannot be multi-valued"));
        }
        Some(out) if out.type_key == input.type_key => {
          return Err(invalid("a converter must change the type"));
        }
        Some(_) => {}
      }
    }
    _ => {}
  }

  Ok(Some(CallableSpec {
    name,
    kind: marker,
    provider: provider.to_string(),
    inputs,
    injected,
    output,
    default_timeout: operation.default_timeout.filter(|t| !t.is_zero()),
    body: operation.body,
  }))
}
