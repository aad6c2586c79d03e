//! Per-invocation variable store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use trellis_coordinate::{CoordinateTrie, Coordinates};
use trellis_spec::{ExecutionError, MutableContext, ReadOnlyContext, Specification, Value};

/// Completion state of one coordinate.
#[derive(Debug, Clone, Default)]
struct Slot {
  completed: bool,
  /// Never `Some(Value::Null)`.
  value: Option<Value>,
}

/// Variables and action outputs of a single process invocation.
///
/// A coordinate is *completed* once its action finished, successfully or
/// not; it additionally *has a value* when the action returned something
/// other than null. Initial variables are recorded before any action runs.
pub struct ExecutionContext {
  execution_id: String,
  spec: Arc<Specification>,
  variables: RwLock<HashMap<String, Value>>,
  outputs: Mutex<CoordinateTrie<Slot>>,
}

impl ExecutionContext {
  pub fn new(execution_id: impl Into<String>, spec: Arc<Specification>) -> Self {
    Self {
      execution_id: execution_id.into(),
      spec,
      variables: RwLock::new(HashMap::new()),
      outputs: Mutex::new(CoordinateTrie::new()),
    }
  }

  /// Record a completed coordinate and its value.
  pub fn record(&self, coordinates: &Coordinates, value: Value) {
    let slot = Slot {
      completed: true,
      value: (!value.is_null()).then_some(value),
    };
    self.lock_outputs().insert(coordinates, slot);
  }

  /// Mark a coordinate as completed without a value.
  pub fn mark_completed(&self, coordinates: &Coordinates) {
    let mut outputs = self.lock_outputs();
    match outputs.get_mut(coordinates) {
      Some(slot) => slot.completed = true,
      None => {
        outputs.insert(
          coordinates,
          Slot {
            completed: true,
            value: None,
          },
        );
      }
    }
  }

  /// Every completed coordinate, in pre-order.
  pub fn completed(&self) -> Vec<Coordinates> {
    self
      .lock_outputs()
      .entries()
      .into_iter()
      .filter(|(_, slot)| slot.completed)
      .map(|(coordinates, _)| coordinates.clone())
      .collect()
  }

  /// Every stored value, in pre-order. Initial variables come first.
  pub fn outputs(&self) -> Vec<(Coordinates, Value)> {
    self
      .lock_outputs()
      .entries()
      .into_iter()
      .filter_map(|(coordinates, slot)| slot.value.clone().map(|v| (coordinates.clone(), v)))
      .collect()
  }

  /// Snapshot of the named variables.
  pub fn variables(&self) -> BTreeMap<String, Value> {
    self
      .variables
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .iter()
      .map(|(k, v)| (k.clone(), v.clone()))
      .collect()
  }

  /// A read-only handle on this context.
  pub fn view(self: &Arc<Self>) -> Arc<ContextView> {
    Arc::new(ContextView(Arc::clone(self)))
  }

  fn lock_outputs(&self) -> std::sync::MutexGuard<'_, CoordinateTrie<Slot>> {
    self.outputs.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl ReadOnlyContext for ExecutionContext {
  fn execution_id(&self) -> &str {
    &self.execution_id
  }

  fn variable(&self, name: &str) -> Option<Value> {
    self
      .variables
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(name)
      .cloned()
  }

  fn contains_variable(&self, name: &str) -> bool {
    self
      .variables
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .contains_key(name)
  }

  fn output(&self, coordinates: &Coordinates) -> Option<Value> {
    self
      .lock_outputs()
      .get(coordinates)
      .and_then(|slot| slot.value.clone())
  }

  fn is_completed(&self, coordinates: &Coordinates) -> bool {
    self
      .lock_outputs()
      .get(coordinates)
      .is_some_and(|slot| slot.completed)
  }

  fn resolve(
    &self,
    coordinates: &Coordinates,
    path: &[String],
  ) -> Result<Option<Value>, ExecutionError> {
    let Some(mut current) = self.output(coordinates) else {
      return Ok(None);
    };

    for segment in path {
      let next = match &current {
        Value::Record(record) => {
          let declared = record.type_key.is_any()
            || self
              .spec
              .graph()
              .property(&record.type_key, segment)
              .is_some();
          if !declared {
            return Err(ExecutionError::UndeclaredProperty {
              type_key: record.type_key.clone(),
              property: segment.clone(),
            });
          }
          match record.get(segment) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(None),
          }
        }
        other => {
          return Err(ExecutionError::UnexpectedVariableType {
            coordinates: coordinates.clone(),
            expected: format!("a record with property '{}'", segment),
            actual: other.kind_name().to_string(),
          });
        }
      };
      current = next;
    }

    Ok(Some(current))
  }
}

impl MutableContext for ExecutionContext {
  fn set_variable(&self, name: &str, value: Value) {
    self
      .variables
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(name.to_string(), value);
  }

  fn delete_variable(&self, name: &str) -> Option<Value> {
    self
      .variables
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(name)
  }
}

/// Read-only view handed to functions and to actions that only read.
pub struct ContextView(Arc<ExecutionContext>);

impl ReadOnlyContext for ContextView {
  fn execution_id(&self) -> &str {
    self.0.execution_id()
  }

  fn variable(&self, name: &str) -> Option<Value> {
    self.0.variable(name)
  }

  fn contains_variable(&self, name: &str) -> bool {
    self.0.contains_variable(name)
  }

  fn output(&self, coordinates: &Coordinates) -> Option<Value> {
    self.0.output(coordinates)
  }

  fn is_completed(&self, coordinates: &Coordinates) -> bool {
    self.0.is_completed(coordinates)
  }

  fn resolve(
    &self,
    coordinates: &Coordinates,
    path: &[String],
  ) -> Result<Option<Value>, ExecutionError> {
    self.0.resolve(coordinates, path)
  }
}

#[cfg(test)]
mod tests {
  use trellis_coordinate::CoordinateTable;
  use trellis_spec::{Record, TypeDescriptor};

  use super::*;

  fn context() -> (CoordinateTable, Arc<ExecutionContext>) {
    let spec = Specification::builder()
      .with_type(
        TypeDescriptor::compound("demo.Pair")
          .property("text", "text")
          .property("inner", "demo.Pair"),
      )
      .build()
      .unwrap();
    (
      CoordinateTable::new(),
      Arc::new(ExecutionContext::new("exec-1", Arc::new(spec))),
    )
  }

  #[test]
  fn test_named_variables() {
    let (_, ctx) = context();
    assert!(!ctx.contains_variable("x"));
    ctx.set_variable("x", Value::Integer(1));
    assert_eq!(ctx.variable("x"), Some(Value::Integer(1)));
    assert_eq!(ctx.delete_variable("x"), Some(Value::Integer(1)));
    assert_eq!(ctx.variable("x"), None);
  }

  #[test]
  fn test_completed_versus_valued() {
    let (table, ctx) = context();
    let a = table.intern(&[0]);
    let b = table.intern(&[1]);
    let c = table.intern(&[2]);

    assert!(!ctx.is_completed(&a));
    ctx.record(&a, Value::Integer(5));
    ctx.record(&b, Value::Null);
    ctx.mark_completed(&c);

    assert!(ctx.is_completed(&a) && ctx.is_completed(&b) && ctx.is_completed(&c));
    assert_eq!(ctx.output(&a), Some(Value::Integer(5)));
    assert_eq!(ctx.output(&b), None);
    assert_eq!(ctx.output(&c), None);
    assert_eq!(ctx.outputs().len(), 1);
    assert_eq!(ctx.completed().len(), 3);
  }

  #[test]
  fn test_mark_completed_keeps_existing_value() {
    let (table, ctx) = context();
    let a = table.intern(&[0]);
    ctx.record(&a, Value::from("kept"));
    ctx.mark_completed(&a);
    assert_eq!(ctx.output(&a), Some(Value::from("kept")));
  }

  #[test]
  fn test_nested_resolution() {
    let (table, ctx) = context();
    let at = table.intern(&[0]);
    let inner = Record::new("demo.Pair").field("text", "deep");
    ctx.record(
      &at,
      Value::Record(Record::new("demo.Pair").field("text", "top").field("inner", inner)),
    );

    let path = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    assert_eq!(
      ctx.resolve(&at, &path(&["inner", "text"])).unwrap(),
      Some(Value::from("deep"))
    );
    assert_eq!(ctx.resolve(&at, &path(&["inner", "inner"])).unwrap(), None);
    assert!(matches!(
      ctx.resolve(&at, &path(&["nope"])),
      Err(ExecutionError::UndeclaredProperty { .. })
    ));
    assert!(matches!(
      ctx.resolve(&at, &path(&["text", "inner"])),
      Err(ExecutionError::UnexpectedVariableType { .. })
    ));
    assert_eq!(ctx.resolve(&table.intern(&[9]), &[]).unwrap(), None);
  }

  #[test]
  fn test_view_reads_through() {
    let (table, ctx) = context();
    let view = ctx.view();
    ctx.record(&table.initial(0), Value::from("arg"));
    ctx.set_variable("v", Value::Boolean(true));
    assert_eq!(view.output(&table.initial(0)), Some(Value::from("arg")));
    assert_eq!(view.variable("v"), Some(Value::Boolean(true)));
    assert_eq!(view.execution_id(), "exec-1");
  }
}
