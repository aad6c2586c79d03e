//! Loaded process cache.
//!
//! Processes are compiled and loaded once per configuration. Each invocation
//! then runs against the cached process with a fresh context.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use trellis_config::ProcessConfig;
use trellis_process::Process;

struct CacheEntry {
  config: ProcessConfig,
  process: Arc<dyn Process>,
}

/// Loaded processes keyed by process id.
///
/// An entry is only reused while the configuration it was built from is
/// unchanged; a different configuration under the same id replaces it.
pub struct ProcessCache {
  entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ProcessCache {
  pub fn new() -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
    }
  }

  /// Return the cached process for `config`, or load and cache it.
  ///
  /// `load` runs without holding the lock, so concurrent first loads of one
  /// configuration may each compile it. Only the first one to be stored is
  /// kept and returned to every caller; the other result is dropped.
  pub fn get_or_load<E>(
    &self,
    config: &ProcessConfig,
    load: impl FnOnce() -> Result<Arc<dyn Process>, E>,
  ) -> Result<Arc<dyn Process>, E> {
    {
      let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
      if let Some(entry) = entries.get(&config.process_id) {
        if entry.config == *config {
          return Ok(Arc::clone(&entry.process));
        }
      }
    }

    let process = load()?;

    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    // A concurrent loader may have stored this configuration first.
    if let Some(entry) = entries.get(&config.process_id) {
      if entry.config == *config {
        return Ok(Arc::clone(&entry.process));
      }
    }
    entries.insert(
      config.process_id.clone(),
      CacheEntry {
        config: config.clone(),
        process: Arc::clone(&process),
      },
    );
    Ok(process)
  }

  pub fn remove(&self, process_id: &str) -> bool {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(process_id)
      .is_some()
  }

  pub fn len(&self) -> usize {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .clear();
  }
}

impl Default for ProcessCache {
  fn default() -> Self {
    Self::new()
  }
}
