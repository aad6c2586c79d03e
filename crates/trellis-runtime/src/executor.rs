//! Lifecycle-managed action executor.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, instrument, warn};
use trellis_spec::{ExecutionError, ReadOnlyContext, Value};

use crate::job::{ActionJob, GroupHandle, flatten};

/// Executor tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
  /// Bound for actions without an explicit timeout. 0 = unbounded.
  #[serde(default)]
  pub default_timeout_ms: u64,

  /// How long in-flight actions may keep running after `stop()`.
  #[serde(default = "default_shutdown_grace_ms")]
  pub shutdown_grace_ms: u64,
}

fn default_shutdown_grace_ms() -> u64 {
  5_000
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      default_timeout_ms: 0,
      shutdown_grace_ms: default_shutdown_grace_ms(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
  NotStarted,
  Running,
  ShuttingDown,
  Stopped,
}

impl fmt::Display for ExecutorState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ExecutorState::NotStarted => "not started",
      ExecutorState::Running => "running",
      ExecutorState::ShuttingDown => "shutting down",
      ExecutorState::Stopped => "stopped",
    };
    f.write_str(name)
  }
}

/// Runs actions on the tokio runtime it was started on.
///
/// Work is only accepted while `Running`. `stop()` moves to `ShuttingDown`
/// immediately: actions that have not begun are abandoned, actions already
/// running get `shutdown_grace_ms` to finish before they are aborted, and the
/// executor then settles in `Stopped`.
pub struct ActionExecutor {
  config: ExecutorConfig,
  state: Arc<watch::Sender<ExecutorState>>,
  runtime: Mutex<Option<Handle>>,
  tracker: TaskTracker,
  /// Cancelled on `stop()`; jobs that have not started give up.
  shutdown: CancellationToken,
  /// Cancelled once the grace period expires; running jobs are dropped.
  abort: CancellationToken,
}

impl ActionExecutor {
  pub fn new(config: ExecutorConfig) -> Self {
    let (state, _) = watch::channel(ExecutorState::NotStarted);
    Self {
      config,
      state: Arc::new(state),
      runtime: Mutex::new(None),
      tracker: TaskTracker::new(),
      shutdown: CancellationToken::new(),
      abort: CancellationToken::new(),
    }
  }

  pub fn config(&self) -> &ExecutorConfig {
    &self.config
  }

  pub fn state(&self) -> ExecutorState {
    *self.state.borrow()
  }

  /// Bind to the current tokio runtime and begin accepting work.
  pub fn start(&self) -> Result<(), ExecutionError> {
    let handle = Handle::try_current()
      .map_err(|_| ExecutionError::illegal_state("start the executor", "outside a tokio runtime"))?;

    let mut failed = None;
    self.state.send_if_modified(|state| {
      if *state == ExecutorState::NotStarted {
        *state = ExecutorState::Running;
        true
      } else {
        failed = Some(*state);
        false
      }
    });
    if let Some(state) = failed {
      return Err(ExecutionError::illegal_state("start the executor", state));
    }

    *self.runtime.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    info!(
      default_timeout_ms = self.config.default_timeout_ms,
      shutdown_grace_ms = self.config.shutdown_grace_ms,
      "executor_started"
    );
    Ok(())
  }

  /// Begin shutdown. Returns once the executor is `ShuttingDown`; use
  /// [`wait_stopped`](Self::wait_stopped) to observe `Stopped`.
  pub fn stop(&self) -> Result<(), ExecutionError> {
    let mut failed = None;
    self.state.send_if_modified(|state| {
      if *state == ExecutorState::Running {
        *state = ExecutorState::ShuttingDown;
        true
      } else {
        failed = Some(*state);
        false
      }
    });
    if let Some(state) = failed {
      return Err(ExecutionError::illegal_state("stop the executor", state));
    }

    self.shutdown.cancel();
    self.tracker.close();
    info!(in_flight = self.tracker.len(), "executor_stopping");

    let handle = self.runtime()?;
    let tracker = self.tracker.clone();
    let abort = self.abort.clone();
    let state = Arc::clone(&self.state);
    let grace = Duration::from_millis(self.config.shutdown_grace_ms);
    handle.spawn(async move {
      if tokio::time::timeout(grace, tracker.wait()).await.is_err() {
        warn!(remaining = tracker.len(), "shutdown_grace_expired");
        abort.cancel();
        tracker.wait().await;
      }
      state.send_replace(ExecutorState::Stopped);
      info!("executor_stopped");
    });
    Ok(())
  }

  /// Resolve once the executor reaches `Stopped`.
  pub async fn wait_stopped(&self) {
    let mut rx = self.state.subscribe();
    // The sender lives as long as `self`, so this only ends on `Stopped`.
    let _ = rx.wait_for(|state| *state == ExecutorState::Stopped).await;
  }

  /// Run `jobs` one after another in list order.
  ///
  /// Every job runs even after an earlier one fails; the first failure is
  /// returned once the whole group has finished.
  #[instrument(name = "execute_sync", skip(self, jobs), fields(actions = jobs.len()))]
  pub async fn execute_sync(&self, jobs: Vec<ActionJob>) -> Result<Vec<Value>, ExecutionError> {
    self.ensure_running("execute actions")?;

    let mut outputs = Vec::with_capacity(jobs.len());
    let mut first_error = None;
    for job in jobs {
      let coordinates = job.coordinates.clone();
      let result = match self.dispatch_or_settle(job) {
        Ok(handle) => flatten(&coordinates, handle.await),
        Err(e) => Err(e),
      };
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

  /// Dispatch every job independently and hand back a combined handle.
  ///
  /// A job that cannot be dispatched once the group has started (the
  /// executor stopped meanwhile) becomes a failed member of the group, so
  /// tasks already spawned are still awaited by [`GroupHandle::wait`].
  pub fn execute_concurrent(&self, jobs: Vec<ActionJob>) -> Result<GroupHandle, ExecutionError> {
    self.ensure_running("execute actions")?;

    let tasks = jobs
      .into_iter()
      .map(|job| (job.coordinates.clone(), self.dispatch_or_settle(job)))
      .collect();
    Ok(GroupHandle { tasks })
  }

  /// Dispatch `job`, marking its coordinate completed when it never runs.
  fn dispatch_or_settle(
    &self,
    job: ActionJob,
  ) -> Result<JoinHandle<Result<Value, ExecutionError>>, ExecutionError> {
    let name = job.name.clone();
    let coordinates = job.coordinates.clone();
    let context = Arc::clone(&job.context);
    self.dispatch(job).inspect_err(|e| {
      context.mark_completed(&coordinates);
      warn!(
        execution_id = %context.execution_id(),
        action = %name,
        coordinates = %coordinates,
        error = %e,
        "action_not_dispatched"
      );
    })
  }

  fn ensure_running(&self, operation: &str) -> Result<(), ExecutionError> {
    match self.state() {
      ExecutorState::Running => Ok(()),
      state => Err(ExecutionError::illegal_state(operation, state)),
    }
  }

  fn runtime(&self) -> Result<Handle, ExecutionError> {
    self
      .runtime
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
      .ok_or_else(|| ExecutionError::illegal_state("execute actions", self.state()))
  }

  /// The explicit bound, else the configured default; zero is unbounded.
  fn effective_timeout(&self, explicit: Option<Duration>) -> Option<Duration> {
    let limit = explicit.unwrap_or(Duration::from_millis(self.config.default_timeout_ms));
    (!limit.is_zero()).then_some(limit)
  }

  fn dispatch(
    &self,
    job: ActionJob,
  ) -> Result<JoinHandle<Result<Value, ExecutionError>>, ExecutionError> {
    self.ensure_running("execute actions")?;
    let handle = self.runtime()?;

    let timeout = self.effective_timeout(job.timeout);
    let shutdown = self.shutdown.clone();
    let abort = self.abort.clone();

    let ActionJob {
      name,
      coordinates,
      context,
      future,
      ..
    } = job;

    let task = async move {
      let execution_id = context.execution_id().to_string();

      if shutdown.is_cancelled() {
        context.mark_completed(&coordinates);
        return Err(ExecutionError::Interrupted {
          message: format!("action '{}' at {} abandoned by shutdown", name, coordinates),
        });
      }

      info!(
        execution_id = %execution_id,
        action = %name,
        coordinates = %coordinates,
        timeout_ms = timeout.map(|t| t.as_millis() as u64),
        "action_started"
      );

      let bounded = async {
        match timeout {
          Some(limit) => tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
            Err(ExecutionError::Timeout {
              action: name.clone(),
              coordinates: coordinates.clone(),
              timeout_ms: limit.as_millis() as u64,
            })
          }),
          None => future.await,
        }
      };

      let result = tokio::select! {
        result = bounded => result,
        _ = abort.cancelled() => Err(ExecutionError::Interrupted {
          message: format!("action '{}' at {} aborted after the shutdown grace period", name, coordinates),
        }),
      };

      match &result {
        Ok(value) => {
          context.record(&coordinates, value.clone());
          info!(
            execution_id = %execution_id,
            action = %name,
            coordinates = %coordinates,
            "action_completed"
          );
        }
        Err(e) => {
          context.mark_completed(&coordinates);
          error!(
            execution_id = %execution_id,
            action = %name,
            coordinates = %coordinates,
            error = %e,
            "action_failed"
          );
        }
      }
      result
    };

    Ok(self.tracker.spawn_on(task, &handle))
  }
}
