//! The storage catalog: the top-level entry point.

use std::sync::Arc;

use tabula_engine::Engine;
use tabula_foundation::{Error, ErrorContext, ErrorKind, Result, StoreConfig};
use tracing::{debug, info};

use crate::catalog::{Catalog, validate_name};
use crate::session::Session;
use crate::storage::Storage;

/// Creates, lists and removes named [`Storage`]s on one engine.
///
/// Construction creates the storage catalog if it is missing, so several
/// managers may share one engine and see the same storages.
#[derive(Clone, Debug)]
pub struct StorageManager {
    session: Session,
    catalog: Catalog,
    client_id: Option<String>,
}

impl StorageManager {
    /// Creates a manager with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be initialized.
    pub fn new(engine: Arc<Engine>) -> Result<Self> {
        Self::with_config(engine, StoreConfig::default())
    }

    /// Creates a manager with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be initialized within
    /// `config.init_retries` attempts.
    pub fn with_config(engine: Arc<Engine>, config: StoreConfig) -> Result<Self> {
        let session = Session::new(engine, config);
        let catalog = Catalog::storages();
        session
            .run_init(|tx| catalog.ensure(tx))
            .map_err(|e| e.with_context(ErrorContext::new().with_operation("open_manager")))?;
        Ok(Self {
            session,
            catalog,
            client_id: None,
        })
    }

    pub(crate) fn for_client(mut self, client_id: &str) -> Self {
        self.client_id = Some(client_id.to_string());
        self
    }

    /// Returns the id of the client this manager was handed to, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Returns the configuration in use.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        self.session.config()
    }

    fn context(operation: &'static str, name: &str) -> ErrorContext {
        ErrorContext::new()
            .with_collection(name)
            .with_operation(operation)
    }

    fn checked(operation: &'static str, name: &str) -> Result<()> {
        validate_name(name).map_err(|e| e.with_context(Self::context(operation, name)))
    }

    /// Returns the names of every storage, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn list_storage_names(&self) -> Result<Vec<String>> {
        self.session.run(|tx| self.catalog.names(tx))
    }

    /// Returns true if a storage with this name exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn contains_storage_name(&self, name: &str) -> Result<bool> {
        Self::checked("contains_storage_name", name)?;
        self.session
            .run(|tx| self.catalog.contains(tx, name))
            .map_err(|e| e.with_context(Self::context("contains_storage_name", name)))
    }

    /// Returns the storage `name`, creating an empty one if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn create_storage(&self, name: &str) -> Result<Storage> {
        Self::checked("create_storage", name)?;
        let (id, created) = self
            .session
            .run(|tx| {
                let (id, created) = self.catalog.get_or_insert(tx, name)?;
                if created {
                    Storage::create_structures(tx, id)?;
                }
                Ok((id, created))
            })
            .map_err(|e| e.with_context(Self::context("create_storage", name)))?;
        if created {
            info!(storage = name, id, client = ?self.client_id, "storage created");
        }
        Ok(Storage::bind(self.session.clone(), name, id))
    }

    /// Removes the storage `name` with every collection in it. Returns false
    /// if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn remove_storage(&self, name: &str) -> Result<bool> {
        Self::checked("remove_storage", name)?;
        let removed = self
            .session
            .run(|tx| match self.catalog.remove(tx, name)? {
                Some(id) => Storage::remove(tx, id).map(|()| Some(id)),
                None => Ok(None),
            })
            .map_err(|e| e.with_context(Self::context("remove_storage", name)))?;
        if let Some(id) = removed {
            info!(storage = name, id, client = ?self.client_id, "storage removed");
        }
        Ok(removed.is_some())
    }

    /// Returns the storage `name`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn get_storage(&self, name: &str) -> Result<Option<Storage>> {
        Self::checked("get_storage", name)?;
        let id = self
            .session
            .run(|tx| self.catalog.get(tx, name))
            .map_err(|e| e.with_context(Self::context("get_storage", name)))?;
        Ok(id.map(|id| Storage::bind(self.session.clone(), name, id)))
    }

    /// Removes every storage with every collection in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is exhausted.
    pub fn clear(&self) -> Result<()> {
        let removed = self.session.run(|tx| {
            let entries = self.catalog.entries(tx)?;
            for (name, id) in &entries {
                self.catalog.remove(tx, name)?;
                Storage::remove(tx, *id)?;
            }
            Ok(entries.len())
        })?;
        info!(removed, client = ?self.client_id, "storage catalog cleared");
        Ok(())
    }

    /// Flushes pending data. Every commit is already durable, so this only
    /// checks that the engine is still open.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the engine was closed.
    pub fn flush_data(&self) -> Result<()> {
        if self.session.engine().is_closed() {
            return Err(Error::new(ErrorKind::Closed));
        }
        debug!(client = ?self.client_id, "flush requested");
        Ok(())
    }
}
