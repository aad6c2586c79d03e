//! Tree-walking interpreter over compiled units.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tracing::{debug, error, info, instrument};
use trellis_compiler::{
  ActionNode, BlockNode, CompiledUnit, ConditionalNode, ConstructionError, ExprNode, StepNode,
};
use trellis_config::ProcessContract;
use trellis_runtime::{ActionJob, ExecutionContext};
use trellis_spec::{
  CallArgs, CallError, Capability, ChildActions, ConverterSpec, ExecutionError, Injected,
  MutableContext, ReadOnlyContext, Value,
};
use uuid::Uuid;

use crate::backend::{Backend, CompilationStrategy, Dependencies};
use crate::events::ProcessEvent;
use crate::plan::{Batch, Plan};
use crate::process::{Process, ProcessResult, check_arguments};

/// Backend for [`CompilationStrategy::Interpreted`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterBackend;

impl Backend for InterpreterBackend {
  fn strategy(&self) -> CompilationStrategy {
    CompilationStrategy::Interpreted
  }

  fn load(
    &self,
    unit: CompiledUnit,
    deps: Dependencies,
  ) -> Result<Arc<dyn Process>, ConstructionError> {
    debug!(
      process_id = %unit.process_id,
      actions = unit.root.action_count(),
      "process_loaded"
    );
    Ok(Arc::new(InterpretedProcess::new(unit, deps)))
  }
}

/// A compiled unit executed by walking its tree.
pub struct InterpretedProcess {
  unit: Arc<CompiledUnit>,
  deps: Dependencies,
  plan: OnceLock<Arc<Plan>>,
}

impl InterpretedProcess {
  pub fn new(unit: CompiledUnit, deps: Dependencies) -> Self {
    Self {
      unit: Arc::new(unit),
      deps,
      plan: OnceLock::new(),
    }
  }

  pub fn unit(&self) -> &CompiledUnit {
    &self.unit
  }

  /// The plan is derived on first invocation. Concurrent first invocations
  /// block on the same initialization.
  fn plan(&self) -> Arc<Plan> {
    let plan = self.plan.get_or_init(|| {
      let plan = Plan::build(&self.unit.root);
      debug!(
        process_id = %self.unit.process_id,
        actions = plan.action_count(),
        "plan_prepared"
      );
      Arc::new(plan)
    });
    Arc::clone(plan)
  }
}

#[async_trait]
impl Process for InterpretedProcess {
  fn process_id(&self) -> &str {
    &self.unit.process_id
  }

  fn contract(&self) -> &ProcessContract {
    &self.unit.contract
  }

  #[instrument(name = "process_invoke", skip(self, args), fields(process_id = %self.unit.process_id))]
  async fn invoke(&self, args: Vec<Value>) -> Result<ProcessResult, ExecutionError> {
    check_arguments(&self.unit.contract, &args, self.deps.spec.graph())?;

    let execution_id = Uuid::new_v4().to_string();
    let context = Arc::new(ExecutionContext::new(
      execution_id.clone(),
      Arc::clone(&self.deps.spec),
    ));
    for (slot, value) in self.unit.parameters.iter().zip(args) {
      context.record(&slot.coordinates, value);
    }

    info!(execution_id = %execution_id, "process_started");
    self.deps.notifier.notify(ProcessEvent::ProcessStarted {
      execution_id: execution_id.clone(),
      process_id: self.unit.process_id.clone(),
    });

    let run = Arc::new(Run {
      unit: Arc::clone(&self.unit),
      plan: self.plan(),
      deps: self.deps.clone(),
      context: Arc::clone(&context),
    });

    match run.execute().await {
      Ok(output) => {
        info!(execution_id = %execution_id, "process_completed");
        self.deps.notifier.notify(ProcessEvent::ProcessCompleted {
          execution_id: execution_id.clone(),
          output: output
            .as_ref()
            .map_or(serde_json::Value::Null, Value::to_json),
        });
        Ok(ProcessResult {
          execution_id,
          output,
          context,
        })
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "process_failed");
        self.deps.notifier.notify(ProcessEvent::ProcessFailed {
          execution_id,
          error: e.to_string(),
        });
        Err(e)
      }
    }
  }
}

/// State of one invocation, shared with the action jobs it spawns.
struct Run {
  unit: Arc<CompiledUnit>,
  plan: Arc<Plan>,
  deps: Dependencies,
  context: Arc<ExecutionContext>,
}

impl Run {
  async fn execute(self: &Arc<Self>) -> Result<Option<Value>, ExecutionError> {
    self.run_block(&self.unit.root).await?;
    self
      .unit
      .output
      .as_ref()
      .map(|expr| self.evaluate(expr))
      .transpose()
  }

  fn run_block<'a>(
    self: &'a Arc<Self>,
    block: &'a BlockNode,
  ) -> BoxFuture<'a, Result<(), ExecutionError>> {
    async move {
      for batch in self.plan.batches(&block.coordinates) {
        match batch {
          Batch::Actions(indices) => {
            let jobs = indices
              .iter()
              .map(|&i| self.job(&block.steps[i]))
              .collect::<Result<Vec<_>, _>>()?;
            self.deps.executor.execute_sync(jobs).await?;
          }
          Batch::Step(index) => self.run_step(&block.steps[*index]).await?,
          Batch::Wave(indices) => self.run_wave(block, indices).await?,
        }
      }
      Ok(())
    }
    .boxed()
  }

  async fn run_step(self: &Arc<Self>, step: &StepNode) -> Result<(), ExecutionError> {
    match step {
      StepNode::Action(_) => {
        let job = self.job(step)?;
        self.deps.executor.execute_sync(vec![job]).await?;
        Ok(())
      }
      StepNode::Conditional(conditional) => {
        let branch = if self.condition(conditional)? {
          &conditional.then_block
        } else {
          &conditional.else_block
        };
        self.run_block(branch).await
      }
      StepNode::Block(nested) => self.run_block(nested).await,
    }
  }

  /// Actions of the wave go to the executor as one concurrent group; nested
  /// blocks and conditionals run alongside on this task.
  async fn run_wave(
    self: &Arc<Self>,
    block: &BlockNode,
    indices: &[usize],
  ) -> Result<(), ExecutionError> {
    let (actions, others): (Vec<&StepNode>, Vec<&StepNode>) = indices
      .iter()
      .map(|&i| &block.steps[i])
      .partition(|step| matches!(step, StepNode::Action(_)));

    let jobs = actions
      .into_iter()
      .map(|step| self.job(step))
      .collect::<Result<Vec<_>, _>>()?;
    let group = self.deps.executor.execute_concurrent(jobs)?;

    let nested = join_all(others.into_iter().map(|step| self.run_step(step))).await;
    group.wait().await?;
    nested.into_iter().collect()
  }

  fn condition(&self, conditional: &ConditionalNode) -> Result<bool, ExecutionError> {
    let value = self.evaluate(&conditional.condition)?;
    value
      .as_boolean()
      .ok_or_else(|| ExecutionError::UnexpectedVariableType {
        coordinates: conditional.coordinates.clone(),
        expected: "boolean".to_string(),
        actual: value.kind_name().to_string(),
      })
  }

  fn job(self: &Arc<Self>, step: &StepNode) -> Result<ActionJob, ExecutionError> {
    let coordinates = step.coordinates();
    let node = self.plan.action(coordinates).cloned().ok_or_else(|| {
      ExecutionError::illegal_state(
        "schedule an action",
        format!("no action is planned at {}", coordinates),
      )
    })?;

    let name = node.action.name.clone();
    let timeout = node.timeout;
    let run = Arc::clone(self);
    let future = async move { run.invoke_action(node).await }.boxed();

    Ok(
      ActionJob::new(name, coordinates.clone(), Arc::clone(&self.context), future)
        .with_timeout(timeout),
    )
  }

  async fn invoke_action(self: Arc<Self>, node: Arc<ActionNode>) -> Result<Value, ExecutionError> {
    let execution_id = self.context.execution_id().to_string();
    let coordinates = node.coordinates.as_slice().to_vec();
    self.deps.notifier.notify(ProcessEvent::ActionStarted {
      execution_id: execution_id.clone(),
      action: node.action.name.clone(),
      coordinates: coordinates.clone(),
    });

    let result = self.call_action(&node).await;

    let event = match &result {
      Ok(value) => ProcessEvent::ActionCompleted {
        execution_id,
        action: node.action.name.clone(),
        coordinates,
        data: value.to_json(),
      },
      Err(e) => ProcessEvent::ActionFailed {
        execution_id,
        action: node.action.name.clone(),
        coordinates,
        error: e.to_string(),
      },
    };
    self.deps.notifier.notify(event);
    result
  }

  async fn call_action(self: &Arc<Self>, node: &Arc<ActionNode>) -> Result<Value, ExecutionError> {
    let inputs = self.evaluate_all(&node.arguments)?;
    let injected = node
      .injected
      .iter()
      .map(|capability| self.inject(*capability, node))
      .collect();

    let value = node
      .action
      .call(CallArgs::new(inputs).with_injected(injected))
      .await
      .map_err(|e| match e {
        CallError::Execution(inner) => *inner,
        CallError::Failed { message } => ExecutionError::ActionFailed {
          action: node.action.name.clone(),
          coordinates: node.coordinates.clone(),
          message,
        },
      })?;

    if let Some(variable) = &node.output_variable {
      self.context.set_variable(variable, value.clone());
    }
    Ok(value)
  }

  fn inject(self: &Arc<Self>, capability: Capability, node: &Arc<ActionNode>) -> Injected {
    match capability {
      Capability::MutableContext => {
        let context: Arc<dyn MutableContext> = self.context.clone();
        Injected::MutableContext(context)
      }
      Capability::ReadOnlyContext => Injected::ReadOnlyContext(self.context.view()),
      Capability::ChildActions => Injected::ChildActions(Arc::new(ChildBlock {
        run: Arc::clone(self),
        action: Arc::clone(node),
      })),
    }
  }

  fn evaluate_all(&self, expressions: &[ExprNode]) -> Result<Vec<Value>, ExecutionError> {
    expressions.iter().map(|e| self.evaluate(e)).collect()
  }

  fn evaluate(&self, expr: &ExprNode) -> Result<Value, ExecutionError> {
    match expr {
      ExprNode::Literal(value) => Ok(value.clone()),
      ExprNode::Reference {
        coordinates,
        path,
        fallback,
      } => match self.context.resolve(coordinates, path)? {
        Some(value) => Ok(value),
        None => fallback
          .clone()
          .ok_or_else(|| ExecutionError::MissingVariable {
            coordinates: coordinates.clone(),
            path: path.clone(),
          }),
      },
      ExprNode::Call {
        function,
        arguments,
      } => {
        let inputs = self.evaluate_all(arguments)?;
        // Functions may only read.
        let injected = function
          .injected
          .iter()
          .filter(|capability| **capability == Capability::ReadOnlyContext)
          .map(|_| Injected::ReadOnlyContext(self.context.view()))
          .collect();

        function
          .call_immediate(CallArgs::new(inputs).with_injected(injected))
          .map_err(|e| match e {
            CallError::Execution(inner) => *inner,
            CallError::Failed { message } => ExecutionError::FunctionFailed {
              function: function.name.clone(),
              message,
            },
          })
      }
      ExprNode::Convert { converter, operand } => convert(converter, self.evaluate(operand)?),
      ExprNode::ConvertEach { converter, operand } => match self.evaluate(operand)? {
        Value::List(items) => items
          .into_iter()
          .map(|item| convert(converter, item))
          .collect::<Result<Vec<_>, _>>()
          .map(Value::List),
        Value::Null => Ok(Value::Null),
        other => Err(ExecutionError::ConversionFailed {
          converter: converter.name().to_string(),
          message: format!("expected a list, got {}", other.kind_name()),
        }),
      },
      ExprNode::List(items) => self.evaluate_all(items).map(Value::List),
    }
  }
}

/// Null passes through every converter untouched.
fn convert(converter: &ConverterSpec, value: Value) -> Result<Value, ExecutionError> {
  if value.is_null() {
    return Ok(Value::Null);
  }
  converter.convert(value).map_err(|e| match e {
    CallError::Execution(inner) => *inner,
    CallError::Failed { message } => ExecutionError::ConversionFailed {
      converter: converter.name().to_string(),
      message,
    },
  })
}

/// The child block of one action, run on demand by its body.
struct ChildBlock {
  run: Arc<Run>,
  action: Arc<ActionNode>,
}

#[async_trait]
impl ChildActions for ChildBlock {
  async fn run(&self) -> Result<(), ExecutionError> {
    match &self.action.children {
      Some(block) => self.run.run_block(block).await,
      None => Ok(()),
    }
  }

  fn len(&self) -> usize {
    self
      .action
      .children
      .as_ref()
      .map_or(0, |block| block.steps.len())
  }
}
