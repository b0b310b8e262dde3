//! Engine lifecycle and commit processing.
//!
//! The `Engine` owns the committed [`Directory`]. Transactions snapshot it on
//! begin and validate against it on commit; see [`Transaction`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tabula_foundation::{Error, ErrorKind, Result};
use tracing::{debug, info, warn};

use crate::persist::{Change, DiskStore};
use crate::structure::{Directory, Structure, Versioned};
use crate::transaction::Transaction;

/// Where committed data lives.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Backing {
    /// Heap only; data is lost when the engine is dropped.
    #[default]
    Memory,
    /// An `fjall` keyspace. Each commit writes only the entries it touched.
    File {
        /// Directory of the keyspace.
        path: PathBuf,
        /// Create the keyspace if it does not exist yet.
        create_if_missing: bool,
    },
}

/// Configuration for opening an [`Engine`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Backing store.
    pub backing: Backing,
}

impl EngineConfig {
    /// Creates a configuration for an in-memory engine.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backing: Backing::Memory,
        }
    }

    /// Creates a configuration for a disk-backed engine that creates the
    /// keyspace when missing.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::File {
                path: path.into(),
                create_if_missing: true,
            },
        }
    }

    /// Builder method to control keyspace creation. No effect on memory backing.
    #[must_use]
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        if let Backing::File {
            create_if_missing, ..
        } = &mut self.backing
        {
            *create_if_missing = create;
        }
        self
    }
}

/// An embedded, optimistic, snapshot-isolated transactional store.
///
/// Shared across threads behind an `Arc`. All access goes through
/// [`Engine::begin`].
#[derive(Debug)]
pub struct Engine {
    committed: RwLock<Directory>,
    backing: Backing,
    disk: Option<DiskStore>,
    closed: AtomicBool,
    next_tx: AtomicU64,
}

impl Engine {
    /// Opens an engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a disk backing points at a missing path
    /// and `create_if_missing` is false, `Io` if the keyspace cannot be
    /// opened, or `Serialization` if a stored record is malformed.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let (directory, disk) = match &config.backing {
            Backing::Memory => (Directory::default(), None),
            Backing::File {
                path,
                create_if_missing,
            } => {
                if !path.exists() && !*create_if_missing {
                    return Err(Error::invalid_argument(format!(
                        "can not open db at {}: the path does not exist",
                        path.display()
                    )));
                }
                let disk = DiskStore::open(path)?;
                (disk.load()?, Some(disk))
            }
        };

        info!(
            backing = ?config.backing,
            structures = directory.entries.len(),
            "storage engine opened"
        );

        Ok(Self {
            committed: RwLock::new(directory),
            backing: config.backing,
            disk,
            closed: AtomicBool::new(false),
            next_tx: AtomicU64::new(1),
        })
    }

    /// Opens a fresh in-memory engine.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            committed: RwLock::new(Directory::default()),
            backing: Backing::Memory,
            disk: None,
            closed: AtomicBool::new(false),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Returns the backing this engine was opened with.
    #[must_use]
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Begins a new transaction over a snapshot of the committed state.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if [`Engine::close`] has been called.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::new(ErrorKind::Closed));
        }
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.committed.read().clone();
        Ok(Transaction::new(self, id, snapshot))
    }

    /// Closes the engine. Open transactions may still roll back, but every
    /// later [`Engine::begin`] fails.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(backing = ?self.backing, "storage engine closed");
        }
    }

    /// Returns true once [`Engine::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the names of every committed structure, in order.
    #[must_use]
    pub fn structure_names(&self) -> Vec<String> {
        self.committed.read().entries.keys().cloned().collect()
    }

    /// Returns the sequence number of the last successful commit.
    #[must_use]
    pub fn commit_seq(&self) -> u64 {
        self.committed.read().commit_seq
    }

    /// Validates and applies a transaction's writes.
    ///
    /// Every structure the transaction observed must still carry the version
    /// it had in the snapshot. Nothing is applied on failure. With a disk
    /// backing, the touched entries are persisted before the new state
    /// becomes visible.
    pub(crate) fn apply(
        &self,
        tx_id: u64,
        observed: &HashMap<String, u64>,
        writes: HashMap<String, Option<Structure>>,
        changes: &HashMap<String, Change>,
    ) -> Result<()> {
        if writes.is_empty() {
            debug!(tx = tx_id, "read-only commit");
            return Ok(());
        }

        let mut committed = self.committed.write();
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::new(ErrorKind::Closed));
        }

        for (name, seen) in observed {
            let current = committed.version_of(name);
            if current != *seen {
                warn!(
                    tx = tx_id,
                    structure = %name,
                    seen,
                    current,
                    "commit rejected: concurrent modification"
                );
                return Err(Error::conflict(name.clone()));
            }
        }

        let version = committed.commit_seq + 1;
        if let Some(disk) = &self.disk {
            disk.write(version, &writes, changes)?;
        }

        let mut next = committed.clone();
        next.commit_seq = version;
        let written = writes.len();
        for (name, write) in writes {
            match write {
                Some(structure) => {
                    next.entries.insert(name, Versioned { version, structure });
                }
                None => {
                    next.entries.remove(&name);
                }
            }
        }

        *committed = next;
        debug!(tx = tx_id, version, written, "transaction committed");
        Ok(())
    }
}
