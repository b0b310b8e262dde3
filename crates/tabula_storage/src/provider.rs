//! Opens an engine and hands out storage managers bound to it.

use std::sync::Arc;

use tabula_engine::{Backing, Engine, EngineConfig};
use tabula_foundation::{Error, Result, StoreConfig};
use tracing::info;

use crate::manager::StorageManager;

/// Owns the engine lifecycle for a set of [`StorageManager`]s.
///
/// ```text
/// new ──open──▶ open ──close──▶ closed
///                 │
///                 └─ storage_manager(client_id)
/// ```
#[derive(Debug)]
pub struct StorageManagerProvider {
    engine_config: EngineConfig,
    store_config: StoreConfig,
    engine: Option<Arc<Engine>>,
}

impl StorageManagerProvider {
    /// Creates a provider for the given engine configuration. Nothing is
    /// opened until [`open`](Self::open).
    #[must_use]
    pub fn new(engine_config: EngineConfig) -> Self {
        Self {
            engine_config,
            store_config: StoreConfig::default(),
            engine: None,
        }
    }

    /// Creates a provider for a fresh in-memory engine.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(EngineConfig::in_memory())
    }

    /// Builder method to set the configuration given to every manager.
    #[must_use]
    pub fn with_store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// Opens the engine. Opening an open provider is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the file path is empty, or if the file is
    /// missing and `create_if_missing` is false.
    pub fn open(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        if let Backing::File { path, .. } = &self.engine_config.backing {
            if path.as_os_str().is_empty() {
                return Err(Error::invalid_argument("the db filename is empty"));
            }
        }
        self.engine = Some(Arc::new(Engine::open(self.engine_config.clone())?));
        Ok(())
    }

    /// Returns true between [`open`](Self::open) and [`close`](Self::close).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Returns the open engine, if any.
    #[must_use]
    pub fn engine(&self) -> Option<&Arc<Engine>> {
        self.engine.as_ref()
    }

    /// Returns a storage manager on the open engine for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the provider is not open.
    pub fn storage_manager(&self, client_id: &str) -> Result<StorageManager> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("the storage manager provider is not open"))?;
        let manager = StorageManager::with_config(Arc::clone(engine), self.store_config.clone())?;
        info!(client = client_id, "storage manager handed out");
        Ok(manager.for_client(client_id))
    }

    /// Closes the engine. Managers handed out earlier fail with `Closed`
    /// from now on.
    pub fn close(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.close();
        }
    }
}
