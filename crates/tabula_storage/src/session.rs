//! Shared engine handle with the configured retry bounds.

use std::sync::Arc;

use tabula_engine::{Engine, Transaction, atomic_get};
use tabula_foundation::{Result, StoreConfig};

/// What every manager, storage and collection handle carries.
#[derive(Clone, Debug)]
pub(crate) struct Session {
    engine: Arc<Engine>,
    config: StoreConfig,
}

impl Session {
    pub(crate) fn new(engine: Arc<Engine>, config: StoreConfig) -> Self {
        Self { engine, config }
    }

    pub(crate) fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Runs a unit of work with the regular retry bound.
    pub(crate) fn run<T>(&self, work: impl FnMut(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        atomic_get(&self.engine, self.config.max_retries, work)
    }

    /// Runs a catalog initialization with the init retry bound.
    pub(crate) fn run_init<T>(
        &self,
        work: impl FnMut(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        atomic_get(&self.engine, self.config.init_retries, work)
    }
}
