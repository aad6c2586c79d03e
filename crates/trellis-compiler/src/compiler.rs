//! Tree-to-IR compilation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};
use trellis_config::{
  ActionConfig, Arguments, BlockConfig, ConditionalConfig, ControlStatementConfig,
  ExecutableConfig, ExpressionConfig, ProcessConfig, ReferenceConfig, TypeUse, ValueConfig,
};
use trellis_coordinate::{CoordinateTable, Coordinates};
use trellis_spec::{CallableSpec, Capability, Specification, TypeKey, Value, decode_literal};

use crate::error::ConstructionError;
use crate::ir::{
  ActionNode, BlockMode, BlockNode, CompiledUnit, ConditionalNode, ExprNode, ParameterSlot,
  StaticType, StepNode,
};
use crate::schedule::{sibling_dependencies, waves};

/// Compiles process configurations against a specification.
///
/// Compilation is a pure function of the configuration and the
/// specification: compiling the same configuration twice yields equivalent
/// units.
pub struct ProcessCompiler<'a> {
  spec: &'a Specification,
  table: &'a CoordinateTable,
}

impl<'a> ProcessCompiler<'a> {
  pub fn new(spec: &'a Specification, table: &'a CoordinateTable) -> Self {
    Self { spec, table }
  }

  #[instrument(name = "compile_process", skip(self, config), fields(process_id = %config.process_id))]
  pub fn compile(&self, config: &ProcessConfig) -> Result<CompiledUnit, ConstructionError> {
    let root = self.table.root();

    let mut parameters = Vec::with_capacity(config.contract.parameters.len());
    for (index, parameter) in config.contract.parameters.iter().enumerate() {
      let coordinates = self.table.initial(index);
      let ty = self.static_type(&parameter.ty, &coordinates)?;
      parameters.push(ParameterSlot {
        name: parameter.name.clone(),
        ty,
        coordinates,
      });
    }

    let output_type = config
      .contract
      .output
      .as_ref()
      .map(|ty| self.static_type(ty, &root))
      .transpose()?;

    let mut session = Session {
      spec: self.spec,
      table: self.table,
      parameters: &parameters,
      outputs: HashMap::new(),
    };
    session.declare_outputs(&config.root, &root)?;
    let (root_block, _) = session.compile_block(&config.root, &root)?;

    let output = match (&output_type, &config.returns) {
      (Some(ty), Some(expression)) => {
        Some(session.compile_expression(expression, ty, &root, &mut Vec::new())?)
      }
      (None, None) => None,
      (Some(_), None) => {
        return Err(ConstructionError::MissingReturn {
          process_id: config.process_id.clone(),
        });
      }
      (None, Some(_)) => {
        return Err(ConstructionError::UnexpectedReturn {
          process_id: config.process_id.clone(),
        });
      }
    };

    info!(
      process_id = %config.process_id,
      actions = root_block.action_count(),
      "process_compiled"
    );

    Ok(CompiledUnit {
      process_id: config.process_id.clone(),
      contract: config.contract.clone(),
      parameters,
      root: root_block,
      output,
      output_type,
    })
  }

  fn static_type(&self, ty: &TypeUse, at: &Coordinates) -> Result<StaticType, ConstructionError> {
    let type_key = TypeKey::from(&ty.type_id);
    if !self.spec.graph().contains(&type_key) {
      return Err(ConstructionError::UnknownType {
        coordinates: at.clone(),
        type_key,
      });
    }
    Ok(StaticType {
      type_key,
      multiple: ty.multiple,
    })
  }
}

/// An expression with its compile-time type, before coercion.
struct Typed {
  node: ExprNode,
  ty: StaticType,
}

/// State for one compilation.
struct Session<'a> {
  spec: &'a Specification,
  table: &'a CoordinateTable,
  parameters: &'a [ParameterSlot],
  /// Output type of every action, `None` for void actions.
  outputs: HashMap<Coordinates, Option<StaticType>>,
}

impl Session<'_> {
  /// Record declared action output types ahead of compilation so that
  /// references to actions later in the tree can be typed.
  fn declare_outputs(&mut self, block: &BlockConfig, at: &Coordinates) -> Result<(), ConstructionError> {
    for (index, executable) in block.executables.iter().enumerate() {
      let coordinates = self.table.child(at, index as i32)?;
      match executable {
        ExecutableConfig::Action(action) => {
          if let Some(spec) = self.spec.action(&action.name) {
            let output = spec.output.as_ref().map(|o| StaticType {
              type_key: o.type_key.clone(),
              multiple: o.multiple,
            });
            self.outputs.insert(coordinates.clone(), output);
          }
          if let Some(children) = &action.children {
            self.declare_outputs(children, &self.table.child(&coordinates, 0)?)?;
          }
        }
        ExecutableConfig::Control(ControlStatementConfig::Conditional(conditional)) => {
          self.declare_outputs(&conditional.then_block, &self.table.child(&coordinates, 0)?)?;
          self.declare_outputs(&conditional.else_block, &self.table.child(&coordinates, 1)?)?;
        }
        ExecutableConfig::Block(nested) => self.declare_outputs(nested, &coordinates)?,
      }
    }
    Ok(())
  }

  /// Compile a block whose steps live one level below `at`. Also returns
  /// every coordinate referenced from inside the block.
  fn compile_block(
    &mut self,
    block: &BlockConfig,
    at: &Coordinates,
  ) -> Result<(BlockNode, Vec<Coordinates>), ConstructionError> {
    let mut steps = Vec::with_capacity(block.executables.len());
    let mut step_references = Vec::with_capacity(block.executables.len());

    for (index, executable) in block.executables.iter().enumerate() {
      let coordinates = self.table.child(at, index as i32)?;
      let mut references = Vec::new();
      let step = self.compile_executable(executable, &coordinates, &mut references)?;
      steps.push(step);
      step_references.push(references);
    }

    let mode = if block.concurrent {
      let positions: Vec<Coordinates> = steps.iter().map(|s| s.coordinates().clone()).collect();
      let dependencies = sibling_dependencies(&positions, &step_references);
      let waves = waves(&dependencies).map_err(|index| ConstructionError::ReferenceCycle {
        coordinates: positions[index].clone(),
      })?;
      BlockMode::Concurrent { waves }
    } else {
      BlockMode::Sequential
    };

    let node = BlockNode {
      coordinates: at.clone(),
      mode,
      steps,
    };
    Ok((node, step_references.concat()))
  }

  fn compile_executable(
    &mut self,
    executable: &ExecutableConfig,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<StepNode, ConstructionError> {
    match executable {
      ExecutableConfig::Action(action) => self
        .compile_action(action, at, references)
        .map(StepNode::Action),
      ExecutableConfig::Control(ControlStatementConfig::Conditional(conditional)) => self
        .compile_conditional(conditional, at, references)
        .map(StepNode::Conditional),
      ExecutableConfig::Block(nested) => {
        let (node, nested_references) = self.compile_block(nested, at)?;
        references.extend(nested_references);
        Ok(StepNode::Block(node))
      }
    }
  }

  fn compile_action(
    &mut self,
    config: &ActionConfig,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<ActionNode, ConstructionError> {
    let action = self
      .spec
      .action(&config.name)
      .cloned()
      .ok_or_else(|| ConstructionError::UnknownAction {
        coordinates: at.clone(),
        name: config.name.clone(),
      })?;

    let (arguments, narrowed) = self.compile_arguments(&action, &config.arguments, at, references)?;
    let output = action.output.as_ref().map(|o| StaticType {
      type_key: narrowed.unwrap_or_else(|| o.type_key.clone()),
      multiple: o.multiple,
    });
    self.outputs.insert(at.clone(), output.clone());

    let children = match &config.children {
      Some(_) if !action.accepts(Capability::ChildActions) => {
        return Err(ConstructionError::ChildrenNotAccepted {
          coordinates: at.clone(),
          action: action.name.clone(),
        });
      }
      Some(block) => {
        let (node, child_references) = self.compile_block(block, &self.table.child(at, 0)?)?;
        references.extend(child_references);
        Some(node)
      }
      None => None,
    };

    debug!(coordinates = %at, action = %action.name, "action_compiled");

    Ok(ActionNode {
      coordinates: at.clone(),
      injected: action.injected.clone(),
      timeout: config
        .timeout_ms
        .map(Duration::from_millis)
        .or(action.default_timeout),
      output_variable: config.output_variable.clone(),
      output,
      children,
      arguments,
      action,
    })
  }

  fn compile_conditional(
    &mut self,
    config: &ConditionalConfig,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<ConditionalNode, ConstructionError> {
    let condition = self.compile_expression(
      &config.condition,
      &StaticType::single(TypeKey::boolean()),
      at,
      references,
    )?;
    let (then_block, then_references) =
      self.compile_block(&config.then_block, &self.table.child(at, 0)?)?;
    let (else_block, else_references) =
      self.compile_block(&config.else_block, &self.table.child(at, 1)?)?;
    references.extend(then_references);
    references.extend(else_references);

    Ok(ConditionalNode {
      coordinates: at.clone(),
      condition,
      then_block,
      else_block,
    })
  }

  /// Compile the arguments of `callable`, one expression per input. Also
  /// returns the narrowed output type when an input narrows it.
  fn compile_arguments(
    &mut self,
    callable: &CallableSpec,
    arguments: &Arguments,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<(Vec<ExprNode>, Option<TypeKey>), ConstructionError> {
    if let Some(unknown) = arguments.keys().find(|name| callable.input(name).is_none()) {
      return Err(ConstructionError::UnknownArgument {
        coordinates: at.clone(),
        callable: callable.name.clone(),
        argument: unknown.clone(),
      });
    }

    let mut nodes = Vec::with_capacity(callable.inputs.len());
    let mut narrowed = None;

    for input in &callable.inputs {
      let expressions = arguments.get(&input.name).map(Vec::as_slice).unwrap_or(&[]);
      let element = StaticType::single(input.type_key.clone());

      let (node, raw_type) = if input.multiple {
        match expressions {
          [only] => {
            let typed = self.compile_raw(only, at, references)?;
            let raw_type = typed.ty.type_key.clone();
            if typed.ty.multiple {
              let required = StaticType::multiple(input.type_key.clone());
              (self.coerce(typed, &required, at)?, raw_type)
            } else {
              (ExprNode::List(vec![self.coerce(typed, &element, at)?]), raw_type)
            }
          }
          many => {
            let mut items = Vec::with_capacity(many.len());
            let mut common: Option<TypeKey> = None;
            let mut uniform = true;
            for expression in many {
              let typed = self.compile_raw(expression, at, references)?;
              if typed.ty.multiple {
                return Err(ConstructionError::MultiplicityMismatch {
                  coordinates: at.clone(),
                  callable: callable.name.clone(),
                  input: input.name.clone(),
                  expected: format!("single {} values", input.type_key),
                  found: format!("a list of {}", typed.ty.type_key),
                });
              }
              match &common {
                None => common = Some(typed.ty.type_key.clone()),
                Some(seen) if *seen != typed.ty.type_key => uniform = false,
                Some(_) => {}
              }
              items.push(self.coerce(typed, &element, at)?);
            }
            let raw_type = common
              .filter(|_| uniform)
              .unwrap_or_else(|| input.type_key.clone());
            (ExprNode::List(items), raw_type)
          }
        }
      } else {
        let [only] = expressions else {
          return Err(ConstructionError::MultiplicityMismatch {
            coordinates: at.clone(),
            callable: callable.name.clone(),
            input: input.name.clone(),
            expected: "exactly one expression".to_string(),
            found: format!("{}", expressions.len()),
          });
        };
        let typed = self.compile_raw(only, at, references)?;
        let raw_type = typed.ty.type_key.clone();
        (self.coerce(typed, &element, at)?, raw_type)
      };

      if input.narrows_output {
        narrowed = Some(raw_type);
      }
      nodes.push(node);
    }

    Ok((nodes, narrowed))
  }

  /// Compile `expression` and coerce it to `required`.
  fn compile_expression(
    &mut self,
    expression: &ExpressionConfig,
    required: &StaticType,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<ExprNode, ConstructionError> {
    let typed = self.compile_raw(expression, at, references)?;
    self.coerce(typed, required, at)
  }

  fn compile_raw(
    &mut self,
    expression: &ExpressionConfig,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<Typed, ConstructionError> {
    match expression {
      ExpressionConfig::Value(value) => {
        let (literal, type_key) = self.decode_value(value, at)?;
        Ok(Typed {
          node: ExprNode::Literal(literal),
          ty: StaticType::single(type_key),
        })
      }
      ExpressionConfig::Reference(reference) => self.compile_reference(reference, at, references),
      ExpressionConfig::Function(function) => {
        let callable = self
          .spec
          .function(&function.name)
          .cloned()
          .ok_or_else(|| ConstructionError::UnknownFunction {
            coordinates: at.clone(),
            name: function.name.clone(),
          })?;
        let (arguments, narrowed) =
          self.compile_arguments(&callable, &function.arguments, at, references)?;
        let ty = callable
          .output
          .as_ref()
          .map(|o| StaticType {
            type_key: narrowed.unwrap_or_else(|| o.type_key.clone()),
            multiple: o.multiple,
          })
          .unwrap_or_else(|| StaticType::single(TypeKey::any()));
        Ok(Typed {
          node: ExprNode::Call {
            function: callable,
            arguments,
          },
          ty,
        })
      }
    }
  }

  fn compile_reference(
    &mut self,
    reference: &ReferenceConfig,
    at: &Coordinates,
    references: &mut Vec<Coordinates>,
  ) -> Result<Typed, ConstructionError> {
    let target = self.table.intern(&reference.coordinates);
    let unknown = || ConstructionError::UnknownReference {
      coordinates: at.clone(),
      target: target.to_string(),
    };

    let mut ty = match target.initial_index() {
      Some(index) => self
        .parameters
        .get(index)
        .map(|p| p.ty.clone())
        .ok_or_else(unknown)?,
      None => match self.outputs.get(&target) {
        Some(Some(ty)) => ty.clone(),
        _ => return Err(unknown()),
      },
    };

    for segment in &reference.path {
      if ty.multiple {
        return Err(ConstructionError::TypeMismatch {
          coordinates: at.clone(),
          expected: "a single compound value".to_string(),
          found: ty.to_string(),
        });
      }
      let property = self
        .spec
        .graph()
        .property(&ty.type_key, segment)
        .ok_or_else(|| ConstructionError::UndeclaredProperty {
          coordinates: at.clone(),
          type_key: ty.type_key.clone(),
          property: segment.clone(),
        })?;
      ty = StaticType {
        type_key: property.target.clone(),
        multiple: property.multiple,
      };
    }

    let fallback = match &reference.fallback {
      Some(value) => {
        let (literal, type_key) = self.decode_value(value, at)?;
        if ty.multiple || !self.spec.graph().is_assignable(&type_key, &ty.type_key) {
          return Err(ConstructionError::TypeMismatch {
            coordinates: at.clone(),
            expected: ty.to_string(),
            found: format!("fallback of type {}", type_key),
          });
        }
        Some(literal)
      }
      None => None,
    };

    references.push(target.clone());
    Ok(Typed {
      node: ExprNode::Reference {
        coordinates: target,
        path: reference.path.clone(),
        fallback,
      },
      ty,
    })
  }

  fn decode_value(
    &self,
    value: &ValueConfig,
    at: &Coordinates,
  ) -> Result<(Value, TypeKey), ConstructionError> {
    let type_key = TypeKey::from(&value.type_id);
    let spec = self
      .spec
      .graph()
      .get(&type_key)
      .ok_or_else(|| ConstructionError::UnknownType {
        coordinates: at.clone(),
        type_key: type_key.clone(),
      })?;
    let literal =
      decode_literal(spec, &value.value).map_err(|source| ConstructionError::InvalidLiteral {
        coordinates: at.clone(),
        source,
      })?;
    Ok((literal, type_key))
  }

  /// Insert the converters needed to turn `typed` into `required`.
  fn coerce(
    &self,
    typed: Typed,
    required: &StaticType,
    at: &Coordinates,
  ) -> Result<ExprNode, ConstructionError> {
    let mismatch = || ConstructionError::TypeMismatch {
      coordinates: at.clone(),
      expected: required.to_string(),
      found: typed.ty.to_string(),
    };
    if typed.ty.multiple != required.multiple {
      return Err(mismatch());
    }

    let graph = self.spec.graph();
    if graph.is_assignable(&typed.ty.type_key, &required.type_key) {
      return Ok(typed.node);
    }

    let path = graph
      .conversion_path(&typed.ty.type_key, &required.type_key)
      .ok_or_else(mismatch)?;
    let mut node = typed.node;
    for converter in path {
      let converter = Arc::clone(converter);
      let operand = Box::new(node);
      node = if required.multiple {
        ExprNode::ConvertEach { converter, operand }
      } else {
        ExprNode::Convert { converter, operand }
      };
    }
    Ok(node)
  }
}
