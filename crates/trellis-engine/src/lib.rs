//! Trellis Engine
//!
//! The facade most callers use. An [`Engine`] owns the callable registry, the
//! coordinate table, the shared action executor and a cache of loaded
//! processes:
//!
//! ```ignore
//! let engine = Engine::builder(EngineConfig::default())
//!   .with_provider(Arc::new(StandardProvider::new()))?
//!   .build()?;
//! engine.start()?;
//! let result = engine.invoke(&config, vec![Value::from("World!")]).await?;
//! engine.shutdown().await?;
//! ```

mod cache;
mod config;
mod engine;
mod error;

pub use cache::ProcessCache;
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use error::EngineError;
