//! Human-readable rendering of a compiled unit.

use std::fmt::Write;

use trellis_spec::render_literal;

use crate::ir::{ActionNode, BlockMode, BlockNode, CompiledUnit, ExprNode, StepNode};

impl CompiledUnit {
  /// Render the unit as indented text, one step per line.
  pub fn listing(&self) -> String {
    let mut out = String::new();
    let parameters: Vec<String> = self
      .parameters
      .iter()
      .map(|p| format!("{}: {}", p.name, p.ty))
      .collect();
    let _ = write!(
      out,
      "process {} {}({})",
      self.process_id,
      self.contract.name,
      parameters.join(", ")
    );
    if let Some(output) = &self.output_type {
      let _ = write!(out, " -> {}", output);
    }
    out.push('\n');

    write_block(&mut out, &self.root, 1);

    if let Some(output) = &self.output {
      let _ = writeln!(out, "  return {}", render_expr(output));
    }
    out
  }
}

fn write_block(out: &mut String, block: &BlockNode, depth: usize) {
  let indent = "  ".repeat(depth);
  match &block.mode {
    BlockMode::Sequential => {
      let _ = writeln!(out, "{}block {} sequential", indent, block.coordinates);
    }
    BlockMode::Concurrent { waves } => {
      let rendered: Vec<String> = waves.iter().map(|w| format!("{:?}", w)).collect();
      let _ = writeln!(
        out,
        "{}block {} concurrent waves {}",
        indent,
        block.coordinates,
        rendered.join(" ")
      );
    }
  }
  for step in &block.steps {
    write_step(out, step, depth + 1);
  }
}

fn write_step(out: &mut String, step: &StepNode, depth: usize) {
  let indent = "  ".repeat(depth);
  match step {
    StepNode::Action(action) => {
      let _ = writeln!(out, "{}{} {}", indent, action.coordinates, render_action(action));
      if let Some(children) = &action.children {
        write_block(out, children, depth + 1);
      }
    }
    StepNode::Conditional(conditional) => {
      let _ = writeln!(
        out,
        "{}{} if {}",
        indent,
        conditional.coordinates,
        render_expr(&conditional.condition)
      );
      write_block(out, &conditional.then_block, depth + 1);
      let _ = writeln!(out, "{}else", indent);
      write_block(out, &conditional.else_block, depth + 1);
    }
    StepNode::Block(block) => write_block(out, block, depth),
  }
}

fn render_action(action: &ActionNode) -> String {
  let arguments: Vec<String> = action
    .action
    .inputs
    .iter()
    .zip(&action.arguments)
    .map(|(input, argument)| format!("{} = {}", input.name, render_expr(argument)))
    .collect();
  let mut line = format!("action {}({})", action.action.name, arguments.join(", "));
  if let Some(output) = &action.output {
    let _ = write!(line, " -> {}", output);
  }
  if let Some(variable) = &action.output_variable {
    let _ = write!(line, " as ${}", variable);
  }
  if let Some(timeout) = action.timeout {
    let _ = write!(line, " timeout {}ms", timeout.as_millis());
  }
  line
}

fn render_expr(expr: &ExprNode) -> String {
  match expr {
    ExprNode::Literal(value) => render_literal(value),
    ExprNode::Reference {
      coordinates,
      path,
      fallback,
    } => {
      let mut rendered = format!("@{}", coordinates);
      for segment in path {
        rendered.push('.');
        rendered.push_str(segment);
      }
      if let Some(fallback) = fallback {
        let _ = write!(rendered, " ?? {}", render_literal(fallback));
      }
      rendered
    }
    ExprNode::Call {
      function,
      arguments,
    } => {
      let rendered: Vec<String> = arguments.iter().map(render_expr).collect();
      format!("{}({})", function.name, rendered.join(", "))
    }
    ExprNode::Convert { converter, operand } => {
      format!("{}({})", converter.name(), render_expr(operand))
    }
    ExprNode::ConvertEach { converter, operand } => {
      format!("map({}, {})", converter.name(), render_expr(operand))
    }
    ExprNode::List(items) => {
      let rendered: Vec<String> = items.iter().map(render_expr).collect();
      format!("[{}]", rendered.join(", "))
    }
  }
}
