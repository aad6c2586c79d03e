use std::time::Duration;
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use tokio::task::JoinHandle;
use trellis_coordinate::Coordinates;
use trellis_spec::{ExecutionError, Value};

use crate::context::ExecutionContext;

/// One action invocation handed to the [`ActionExecutor`](crate::ActionExecutor).
///
/// The future does the actual work, including argument evaluation, so that
/// it observes every output recorded before it starts. The executor records
/// the returned value at `coordinates` on success and marks the coordinate
/// completed on failure.
pub struct ActionJob {
  pub name: String,
  pub coordinates: Coordinates,
  pub context: Arc<ExecutionContext>,
  /// Explicit bound; `None` defers to the executor default.
  pub timeout: Option<Duration>,
  pub future: BoxFuture<'static, Result<Value, ExecutionError>>,
}

impl ActionJob {
  pub fn new(
    name: impl Into<String>,
    coordinates: Coordinates,
    context: Arc<ExecutionContext>,
    future: BoxFuture<'static, Result<Value, ExecutionError>>,
  ) -> Self {
    Self {
      name: name.into(),
      coordinates,
      context,
      timeout: None,
      future,
    }
  }

  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.timeout = timeout;
    self
  }
}

impl std::fmt::Debug for ActionJob {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ActionJob")
      .field("name", &self.name)
      .field("coordinates", &self.coordinates)
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

/// Completion handle for a concurrently dispatched action group.
#[derive(Debug)]
pub struct GroupHandle {
  pub(crate) tasks: Vec<(Coordinates, Dispatched)>,
}

/// A spawned action task, or the reason it was never spawned.
pub(crate) type Dispatched = Result<JoinHandle<Result<Value, ExecutionError>>, ExecutionError>;

impl GroupHandle {
  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  /// Wait for every member, then return their outputs in dispatch order or
  /// the first failure in dispatch order.
  pub async fn wait(self) -> Result<Vec<Value>, ExecutionError> {
    let results = join_all(self.tasks.into_iter().map(|(coordinates, dispatched)| async move {
      match dispatched {
        Ok(handle) => flatten(&coordinates, handle.await),
        Err(e) => Err(e),
      }
    }))
    .await;

    let mut outputs = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
      match result {
        Ok(value) => outputs.push(value),
        Err(e) => {
          first_error.get_or_insert(e);
        }
      }
    }

    match first_error {
      Some(e) => Err(e),
      None => Ok(outputs),
    }
  }
}

pub(crate) fn flatten(
  coordinates: &Coordinates,
  joined: Result<Result<Value, ExecutionError>, tokio::task::JoinError>,
) -> Result<Value, ExecutionError> {
  match joined {
    Ok(result) => result,
    Err(e) if e.is_panic() => Err(ExecutionError::Interrupted {
      message: format!("action at {} panicked", coordinates),
    }),
    Err(_) => Err(ExecutionError::Interrupted {
      message: format!("action at {} was cancelled", coordinates),
    }),
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, Ordering};

  use trellis_coordinate::CoordinateTable;

  use super::*;

  #[tokio::test]
  async fn test_wait_awaits_spawned_members_past_a_dispatch_failure() {
    let table = CoordinateTable::new();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let spawned = tokio::spawn(async move {
      tokio::task::yield_now().await;
      flag.store(true, Ordering::SeqCst);
      Ok(Value::Integer(1))
    });

    let group = GroupHandle {
      tasks: vec![
        (table.intern(&[0]), Ok(spawned)),
        (
          table.intern(&[1]),
          Err(ExecutionError::Interrupted {
            message: "not dispatched".to_string(),
          }),
        ),
      ],
    };
    assert_eq!(group.len(), 2);

    let err = group.wait().await.unwrap_err();
    assert!(err.to_string().contains("not dispatched"));
    assert!(finished.load(Ordering::SeqCst));
  }
}
