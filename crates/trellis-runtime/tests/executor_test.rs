use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use trellis_coordinate::CoordinateTable;
use trellis_runtime::{ActionExecutor, ActionJob, ExecutionContext, ExecutorConfig, ExecutorState};
use trellis_spec::{ExecutionError, ExecutionErrorKind, ReadOnlyContext, Specification, Value};

fn context() -> Arc<ExecutionContext> {
  let spec = Specification::builder().build().unwrap();
  Arc::new(ExecutionContext::new("exec-test", Arc::new(spec)))
}

fn started(config: ExecutorConfig) -> ActionExecutor {
  let executor = ActionExecutor::new(config);
  executor.start().unwrap();
  executor
}

fn ready(
  table: &CoordinateTable,
  index: i32,
  ctx: &Arc<ExecutionContext>,
  value: Value,
) -> ActionJob {
  ActionJob::new(
    format!("ready_{}", index),
    table.intern(&[index]),
    Arc::clone(ctx),
    async move { Ok(value) }.boxed(),
  )
}

fn never(table: &CoordinateTable, index: i32, ctx: &Arc<ExecutionContext>) -> ActionJob {
  ActionJob::new(
    "never",
    table.intern(&[index]),
    Arc::clone(ctx),
    futures::future::pending().boxed(),
  )
}

#[tokio::test]
async fn test_lifecycle_transitions() {
  let executor = ActionExecutor::new(ExecutorConfig::default());
  assert_eq!(executor.state(), ExecutorState::NotStarted);

  let err = executor.execute_sync(Vec::new()).await.unwrap_err();
  assert_eq!(err.kind(), ExecutionErrorKind::IllegalState);
  assert!(executor.stop().is_err());

  executor.start().unwrap();
  assert_eq!(executor.state(), ExecutorState::Running);
  assert!(executor.start().is_err());

  executor.stop().unwrap();
  assert_ne!(executor.state(), ExecutorState::Running);
  assert!(executor.stop().is_err());

  executor.wait_stopped().await;
  assert_eq!(executor.state(), ExecutorState::Stopped);

  let err = executor.execute_concurrent(Vec::new()).unwrap_err();
  assert_eq!(err.kind(), ExecutionErrorKind::IllegalState);
  assert!(executor.start().is_err());
}

#[test]
fn test_start_outside_runtime_fails() {
  let executor = ActionExecutor::new(ExecutorConfig::default());
  assert!(executor.start().is_err());
  assert_eq!(executor.state(), ExecutorState::NotStarted);
}

#[tokio::test]
async fn test_sync_group_runs_in_list_order() {
  let executor = started(ExecutorConfig::default());
  let table = CoordinateTable::new();
  let ctx = context();
  let order = Arc::new(Mutex::new(Vec::new()));

  let jobs = (0..4)
    .map(|i| {
      let order = Arc::clone(&order);
      ActionJob::new(
        "step",
        table.intern(&[i]),
        Arc::clone(&ctx),
        async move {
          // Later jobs finish faster; order must still follow the list.
          tokio::time::sleep(Duration::from_millis(8 - 2 * i as u64)).await;
          order.lock().unwrap().push(i);
          Ok(Value::Integer(i as i64))
        }
        .boxed(),
      )
    })
    .collect();

  let outputs = executor.execute_sync(jobs).await.unwrap();
  assert_eq!(outputs, (0..4).map(Value::Integer).collect::<Vec<_>>());
  assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
  assert_eq!(ctx.output(&table.intern(&[2])), Some(Value::Integer(2)));
}

#[tokio::test]
async fn test_timeout_fails_only_that_action() {
  let executor = started(ExecutorConfig::default());
  let table = CoordinateTable::new();
  let ctx = context();

  let jobs = vec![
    never(&table, 0, &ctx).with_timeout(Some(Duration::from_millis(1))),
    ready(&table, 1, &ctx, Value::from("sibling")),
  ];

  let err = executor.execute_sync(jobs).await.unwrap_err();
  assert!(matches!(err, ExecutionError::Timeout { timeout_ms: 1, .. }));

  let timed_out = table.intern(&[0]);
  assert!(ctx.is_completed(&timed_out));
  assert_eq!(ctx.output(&timed_out), None);
  assert_eq!(ctx.output(&table.intern(&[1])), Some(Value::from("sibling")));
}

#[tokio::test]
async fn test_default_timeout_applies_without_override() {
  let executor = started(ExecutorConfig {
    default_timeout_ms: 5,
    ..ExecutorConfig::default()
  });
  let table = CoordinateTable::new();
  let ctx = context();

  let err = executor
    .execute_sync(vec![never(&table, 0, &ctx)])
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ExecutionErrorKind::Timeout);

  // An explicit zero lifts the default bound.
  let job = ActionJob::new(
    "slow",
    table.intern(&[1]),
    Arc::clone(&ctx),
    async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok(Value::Boolean(true))
    }
    .boxed(),
  )
  .with_timeout(Some(Duration::ZERO));
  assert_eq!(
    executor.execute_sync(vec![job]).await.unwrap(),
    vec![Value::Boolean(true)]
  );
}

#[tokio::test]
async fn test_first_failure_wins() {
  let executor = started(ExecutorConfig::default());
  let table = CoordinateTable::new();
  let ctx = context();

  let failing = |index: i32, message: &'static str| {
    ActionJob::new(
      "fail",
      table.intern(&[index]),
      Arc::clone(&ctx),
      async move {
        Err(ExecutionError::Interrupted {
          message: message.to_string(),
        })
      }
      .boxed(),
    )
  };

  let err = executor
    .execute_sync(vec![failing(0, "first"), failing(1, "second")])
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), "interrupted: first");
  assert!(ctx.is_completed(&table.intern(&[1])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_group_overlaps() {
  let executor = started(ExecutorConfig::default());
  let table = CoordinateTable::new();
  let ctx = context();

  let jobs = (0..3)
    .map(|i| {
      ActionJob::new(
        "sleepy",
        table.intern(&[i]),
        Arc::clone(&ctx),
        async move {
          tokio::time::sleep(Duration::from_millis(50)).await;
          Ok(Value::Integer(i as i64))
        }
        .boxed(),
      )
    })
    .collect();

  let started_at = std::time::Instant::now();
  let group = executor.execute_concurrent(jobs).unwrap();
  assert_eq!(group.len(), 3);
  let outputs = group.wait().await.unwrap();

  assert_eq!(outputs, (0..3).map(Value::Integer).collect::<Vec<_>>());
  assert!(started_at.elapsed() < Duration::from_millis(140));
}

#[tokio::test]
async fn test_shutdown_abandons_unstarted_actions() {
  let executor = started(ExecutorConfig::default());
  let table = CoordinateTable::new();
  let ctx = context();

  // On the current-thread runtime nothing runs until this task yields.
  let group = executor
    .execute_concurrent(vec![ready(&table, 0, &ctx, Value::Integer(1))])
    .unwrap();
  executor.stop().unwrap();

  let err = group.wait().await.unwrap_err();
  assert_eq!(err.kind(), ExecutionErrorKind::Interrupted);
  assert!(ctx.is_completed(&table.intern(&[0])));
  assert_eq!(ctx.output(&table.intern(&[0])), None);

  executor.wait_stopped().await;
}

#[tokio::test]
async fn test_grace_period_aborts_running_actions() {
  let executor = started(ExecutorConfig {
    shutdown_grace_ms: 10,
    ..ExecutorConfig::default()
  });
  let table = CoordinateTable::new();
  let ctx = context();

  let group = executor
    .execute_concurrent(vec![never(&table, 0, &ctx)])
    .unwrap();
  // Let the action begin before shutting down.
  tokio::task::yield_now().await;
  executor.stop().unwrap();

  let err = group.wait().await.unwrap_err();
  assert!(err.to_string().contains("grace period"));
  executor.wait_stopped().await;
  assert_eq!(executor.state(), ExecutorState::Stopped);
}

#[tokio::test]
async fn test_stop_during_sync_group_settles_remaining_actions() {
  let executor = Arc::new(started(ExecutorConfig::default()));
  let table = CoordinateTable::new();
  let ctx = context();

  let stopper = Arc::clone(&executor);
  let first = ActionJob::new(
    "stop_then_fail",
    table.intern(&[0]),
    Arc::clone(&ctx),
    async move {
      stopper.stop()?;
      Err(ExecutionError::Interrupted {
        message: "first".to_string(),
      })
    }
    .boxed(),
  );
  let jobs = vec![first, ready(&table, 1, &ctx, Value::Integer(1))];

  let err = executor.execute_sync(jobs).await.unwrap_err();
  assert_eq!(err.to_string(), "interrupted: first");
  assert!(ctx.is_completed(&table.intern(&[1])));
  assert_eq!(ctx.output(&table.intern(&[1])), None);

  executor.wait_stopped().await;
}
