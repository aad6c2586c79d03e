//! Execution plan derived once per loaded process.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_compiler::{ActionNode, BlockMode, BlockNode, StepNode};
use trellis_coordinate::Coordinates;

/// A unit of scheduling within one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Batch {
  /// Consecutive actions run as one synchronous group, in order.
  Actions(Vec<usize>),
  /// A conditional or nested block.
  Step(usize),
  /// Steps with no dependencies among each other, run concurrently.
  Wave(Vec<usize>),
}

pub(crate) struct Plan {
  batches: HashMap<Coordinates, Vec<Batch>>,
  actions: HashMap<Coordinates, Arc<ActionNode>>,
}

impl Plan {
  pub(crate) fn build(root: &BlockNode) -> Self {
    let mut plan = Plan {
      batches: HashMap::new(),
      actions: HashMap::new(),
    };
    plan.visit(root);
    plan
  }

  pub(crate) fn batches(&self, block: &Coordinates) -> &[Batch] {
    self.batches.get(block).map(Vec::as_slice).unwrap_or_default()
  }

  pub(crate) fn action(&self, coordinates: &Coordinates) -> Option<&Arc<ActionNode>> {
    self.actions.get(coordinates)
  }

  pub(crate) fn action_count(&self) -> usize {
    self.actions.len()
  }

  fn visit(&mut self, block: &BlockNode) {
    let batches = match &block.mode {
      BlockMode::Sequential => sequential_batches(&block.steps),
      BlockMode::Concurrent { waves } => waves.iter().cloned().map(Batch::Wave).collect(),
    };
    self.batches.insert(block.coordinates.clone(), batches);

    for step in &block.steps {
      match step {
        StepNode::Action(action) => {
          self
            .actions
            .insert(action.coordinates.clone(), Arc::new(action.clone()));
          if let Some(children) = &action.children {
            self.visit(children);
          }
        }
        StepNode::Conditional(conditional) => {
          self.visit(&conditional.then_block);
          self.visit(&conditional.else_block);
        }
        StepNode::Block(nested) => self.visit(nested),
      }
    }
  }
}

fn sequential_batches(steps: &[StepNode]) -> Vec<Batch> {
  let mut batches = Vec::new();
  let mut run = Vec::new();
  for (index, step) in steps.iter().enumerate() {
    if matches!(step, StepNode::Action(_)) {
      run.push(index);
      continue;
    }
    if !run.is_empty() {
      batches.push(Batch::Actions(std::mem::take(&mut run)));
    }
    batches.push(Batch::Step(index));
  }
  if !run.is_empty() {
    batches.push(Batch::Actions(run));
  }
  batches
}
