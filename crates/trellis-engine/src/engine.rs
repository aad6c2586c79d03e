use std::sync::Arc;

use tracing::{info, instrument};
use trellis_compiler::{CompiledUnit, ProcessCompiler};
use trellis_config::ProcessConfig;
use trellis_coordinate::CoordinateTable;
use trellis_process::{
  Backend, BackendRegistry, Dependencies, ExecutionNotifier, NoopNotifier, Process,
  ProcessResult, decode_arguments,
};
use trellis_runtime::{ActionExecutor, ExecutorState};
use trellis_spec::{
  Provider, Specification, SpecificationBuilder, SpecificationExport, TypeDescriptor, Value,
};

use crate::cache::ProcessCache;
use crate::config::EngineConfig;
use crate::error::EngineError;

/// Collects providers and types before the registry is frozen.
pub struct EngineBuilder {
  config: EngineConfig,
  spec: SpecificationBuilder,
  backends: BackendRegistry,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl EngineBuilder {
  /// Register every operation of `provider`. A malformed provider aborts
  /// construction of the engine.
  pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Result<Self, EngineError> {
    self.spec = self.spec.with_provider(provider)?;
    Ok(self)
  }

  pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
    self.spec = self.spec.with_type(descriptor);
    self
  }

  pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
    self.backends.register(backend);
    self
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn build(self) -> Result<Engine, EngineError> {
    let spec = Arc::new(self.spec.build()?);
    let executor = Arc::new(ActionExecutor::new(self.config.executor.clone()));
    Ok(Engine {
      config: self.config,
      spec,
      table: CoordinateTable::new(),
      executor,
      backends: self.backends,
      notifier: self.notifier,
      cache: ProcessCache::new(),
    })
  }
}

/// The process engine.
///
/// The registry is frozen at [`EngineBuilder::build`] and read without
/// locking afterwards. Actions only run between [`start`](Self::start) and
/// [`shutdown`](Self::shutdown).
pub struct Engine {
  config: EngineConfig,
  spec: Arc<Specification>,
  table: CoordinateTable,
  executor: Arc<ActionExecutor>,
  backends: BackendRegistry,
  notifier: Arc<dyn ExecutionNotifier>,
  cache: ProcessCache,
}

impl Engine {
  pub fn builder(config: EngineConfig) -> EngineBuilder {
    EngineBuilder {
      config,
      spec: Specification::builder(),
      backends: BackendRegistry::with_defaults(),
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn specification(&self) -> &Arc<Specification> {
    &self.spec
  }

  pub fn coordinates(&self) -> &CoordinateTable {
    &self.table
  }

  /// Read-only projection of the registry and type graph.
  pub fn export(&self) -> SpecificationExport {
    self.spec.export()
  }

  pub fn executor_state(&self) -> ExecutorState {
    self.executor.state()
  }

  /// Start the action executor on the current tokio runtime.
  pub fn start(&self) -> Result<(), EngineError> {
    self.executor.start()?;
    info!(strategy = %self.config.strategy, "engine_started");
    Ok(())
  }

  /// Stop accepting actions and wait for in-flight ones to settle.
  pub async fn shutdown(&self) -> Result<(), EngineError> {
    self.executor.stop()?;
    self.executor.wait_stopped().await;
    info!("engine_stopped");
    Ok(())
  }

  /// Compile without loading or caching.
  pub fn compile(&self, config: &ProcessConfig) -> Result<CompiledUnit, EngineError> {
    Ok(ProcessCompiler::new(&self.spec, &self.table).compile(config)?)
  }

  /// Compile and load `config` with the configured strategy, reusing a
  /// cached process when the configuration is unchanged.
  #[instrument(name = "process_load", skip(self, config), fields(process_id = %config.process_id))]
  pub fn load(&self, config: &ProcessConfig) -> Result<Arc<dyn Process>, EngineError> {
    self.cache.get_or_load(config, || {
      let backend = self.backends.get(self.config.strategy)?;
      let unit = self.compile(config)?;
      let deps = Dependencies::new(Arc::clone(&self.spec), Arc::clone(&self.executor))
        .with_notifier(Arc::clone(&self.notifier));
      Ok(backend.load(unit, deps)?)
    })
  }

  pub async fn invoke(
    &self,
    config: &ProcessConfig,
    args: Vec<Value>,
  ) -> Result<ProcessResult, EngineError> {
    let process = self.load(config)?;
    Ok(process.invoke(args).await?)
  }

  /// Invoke with JSON arguments decoded against the process contract.
  pub async fn invoke_json(
    &self,
    config: &ProcessConfig,
    args: &[serde_json::Value],
  ) -> Result<ProcessResult, EngineError> {
    let args = decode_arguments(&config.contract, args, self.spec.graph())?;
    self.invoke(config, args).await
  }

  /// Drop the cached process for `process_id`.
  pub fn evict(&self, process_id: &str) -> bool {
    self.cache.remove(process_id)
  }

  pub fn cached_processes(&self) -> usize {
    self.cache.len()
  }
}
