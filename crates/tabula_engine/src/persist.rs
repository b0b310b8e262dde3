//! Durable backing on an `fjall` keyspace.
//!
//! Committed state is spread over three partitions:
//!
//! - `catalog`: structure name -> header (the kind, plus the value of scalar
//!   structures)
//! - `entries`: `len(name) ++ name ++ member key` -> encoded value, one record
//!   per tree map or hash map member
//! - `engine`: engine metadata (the commit sequence)
//!
//! A commit writes only the members it touched, as one atomic batch, then
//! syncs the journal. Tree map member keys are stored big-endian so partition
//! order matches key order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use fjall::{Batch, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use tabula_foundation::{Error, ErrorKind, Result};
use tracing::debug;

use crate::structure::{Bytes, Directory, Structure, Versioned};

const COMMIT_SEQ_KEY: &[u8] = b"commit_seq";

/// Members a transaction touched in one structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Change {
    /// The structure was deleted; persisted members must not survive.
    pub reset: bool,
    /// Tree map keys written or removed.
    pub tree_keys: BTreeSet<u64>,
    /// Hash map keys written or removed.
    pub hash_keys: BTreeSet<String>,
}

#[derive(Serialize, Deserialize)]
enum Header {
    TreeMap,
    HashMap,
    AtomicLong(u64),
    AtomicVar(Option<Bytes>),
}

impl Header {
    fn of(structure: &Structure) -> Self {
        match structure {
            Structure::TreeMap(_) => Self::TreeMap,
            Structure::HashMap(_) => Self::HashMap,
            Structure::AtomicLong(value) => Self::AtomicLong(*value),
            Structure::AtomicVar(value) => Self::AtomicVar(value.clone()),
        }
    }
}

fn backend_error(e: fjall::Error) -> Error {
    Error::new(ErrorKind::Io(format!("storage backend failure: {e}")))
}

fn malformed(e: impl fmt::Display) -> Error {
    Error::new(ErrorKind::Serialization(e.to_string()))
}

fn entry_prefix(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + name.len());
    key.extend_from_slice(&(name.len() as u64).to_be_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

fn tree_entry_key(name: &str, key: u64) -> Vec<u8> {
    let mut out = entry_prefix(name);
    out.extend_from_slice(&key.to_be_bytes());
    out
}

fn hash_entry_key(name: &str, key: &str) -> Vec<u8> {
    let mut out = entry_prefix(name);
    out.extend_from_slice(key.as_bytes());
    out
}

/// Every member of a map structure, keyed as in the `entries` partition.
fn encoded_members(name: &str, structure: &Structure) -> Vec<(Vec<u8>, Bytes)> {
    match structure {
        Structure::TreeMap(map) => map
            .iter()
            .map(|(key, value)| (tree_entry_key(name, *key), value.clone()))
            .collect(),
        Structure::HashMap(map) => map
            .iter()
            .map(|(key, value)| (hash_entry_key(name, key), value.clone()))
            .collect(),
        Structure::AtomicLong(_) | Structure::AtomicVar(_) => Vec::new(),
    }
}

/// A keyspace holding the committed directory of one engine.
pub struct DiskStore {
    path: PathBuf,
    keyspace: Keyspace,
    catalog: PartitionHandle,
    entries: PartitionHandle,
    meta: PartitionHandle,
}

impl fmt::Debug for DiskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl DiskStore {
    /// Opens the keyspace at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the keyspace or one of its partitions cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let keyspace = fjall::Config::new(path).open().map_err(backend_error)?;
        let catalog = keyspace
            .open_partition("catalog", PartitionCreateOptions::default())
            .map_err(backend_error)?;
        let entries = keyspace
            .open_partition("entries", PartitionCreateOptions::default())
            .map_err(backend_error)?;
        let meta = keyspace
            .open_partition("engine", PartitionCreateOptions::default())
            .map_err(backend_error)?;
        Ok(Self {
            path: path.to_path_buf(),
            keyspace,
            catalog,
            entries,
            meta,
        })
    }

    /// Returns the keyspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole committed directory.
    ///
    /// Every loaded structure gets the persisted commit sequence as its
    /// version.
    ///
    /// # Errors
    ///
    /// Returns `Io` on a backend failure, or `Serialization` if a record is
    /// malformed.
    pub fn load(&self) -> Result<Directory> {
        let commit_seq = match self.meta.get(COMMIT_SEQ_KEY).map_err(backend_error)? {
            Some(bytes) => {
                let raw = <[u8; 8]>::try_from(&bytes[..])
                    .map_err(|_| malformed("bad commit sequence"))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let version = commit_seq.max(1);

        let mut entries = OrdMap::new();
        for item in self.catalog.iter() {
            let (key, value) = item.map_err(backend_error)?;
            let name = String::from_utf8(key.to_vec()).map_err(malformed)?;
            let header: Header = rmp_serde::from_slice(&value).map_err(malformed)?;
            let structure = match header {
                Header::TreeMap => Structure::TreeMap(self.load_tree(&name)?),
                Header::HashMap => Structure::HashMap(self.load_hash(&name)?),
                Header::AtomicLong(value) => Structure::AtomicLong(value),
                Header::AtomicVar(value) => Structure::AtomicVar(value),
            };
            entries.insert(name, Versioned { version, structure });
        }

        debug!(path = %self.path.display(), commit_seq, structures = entries.len(), "directory loaded");
        Ok(Directory {
            commit_seq,
            entries,
        })
    }

    /// Persisted members of `name`, with the structure prefix stripped.
    fn members(&self, name: &str) -> Result<Vec<(Vec<u8>, Bytes)>> {
        let prefix = entry_prefix(name);
        self.entries
            .prefix(&prefix)
            .map(|item| {
                let (key, value) = item.map_err(backend_error)?;
                Ok((key[prefix.len()..].to_vec(), value.to_vec()))
            })
            .collect()
    }

    fn load_tree(&self, name: &str) -> Result<OrdMap<u64, Bytes>> {
        self.members(name)?
            .into_iter()
            .map(|(key, value)| {
                let raw = <[u8; 8]>::try_from(key.as_slice())
                    .map_err(|_| malformed(format!("bad tree map key in {name}")))?;
                Ok((u64::from_be_bytes(raw), value))
            })
            .collect()
    }

    fn load_hash(&self, name: &str) -> Result<im::HashMap<String, Bytes>> {
        self.members(name)?
            .into_iter()
            .map(|(key, value)| Ok((String::from_utf8(key).map_err(malformed)?, value)))
            .collect()
    }

    /// Queues removal of every persisted member of `name` not in `keep`.
    fn remove_members(&self, batch: &mut Batch, name: &str, keep: &HashSet<Vec<u8>>) -> Result<()> {
        let prefix = entry_prefix(name);
        for item in self.entries.prefix(&prefix) {
            let (key, _) = item.map_err(backend_error)?;
            let key = key.to_vec();
            if !keep.contains(&key) {
                batch.remove(&self.entries, key);
            }
        }
        Ok(())
    }

    /// Queues the members of a written structure. Each key appears at most
    /// once in the batch.
    fn write_members(
        &self,
        batch: &mut Batch,
        name: &str,
        structure: &Structure,
        change: &Change,
    ) -> Result<()> {
        if change.reset {
            let members = encoded_members(name, structure);
            let keep: HashSet<Vec<u8>> = members.iter().map(|(key, _)| key.clone()).collect();
            self.remove_members(batch, name, &keep)?;
            for (key, value) in members {
                batch.insert(&self.entries, key, value);
            }
            return Ok(());
        }

        match structure {
            Structure::TreeMap(map) => {
                for key in &change.tree_keys {
                    let entry = tree_entry_key(name, *key);
                    match map.get(key) {
                        Some(value) => batch.insert(&self.entries, entry, value.clone()),
                        None => batch.remove(&self.entries, entry),
                    }
                }
            }
            Structure::HashMap(map) => {
                for key in &change.hash_keys {
                    let entry = hash_entry_key(name, key);
                    match map.get(key) {
                        Some(value) => batch.insert(&self.entries, entry, value.clone()),
                        None => batch.remove(&self.entries, entry),
                    }
                }
            }
            Structure::AtomicLong(_) | Structure::AtomicVar(_) => {}
        }
        Ok(())
    }

    /// Persists one commit: the header of every written structure, the
    /// members listed in `changes`, and the new commit sequence. The batch is
    /// atomic and the journal is synced before returning.
    ///
    /// # Errors
    ///
    /// Returns `Io` on a backend failure. Nothing is persisted in that case.
    pub fn write(
        &self,
        commit_seq: u64,
        writes: &HashMap<String, Option<Structure>>,
        changes: &HashMap<String, Change>,
    ) -> Result<()> {
        let unchanged = Change::default();
        let mut batch = self.keyspace.batch();

        for (name, write) in writes {
            match write {
                Some(structure) => {
                    let header = rmp_serde::to_vec(&Header::of(structure)).map_err(malformed)?;
                    batch.insert(&self.catalog, name.as_bytes().to_vec(), header);
                    let change = changes.get(name).unwrap_or(&unchanged);
                    self.write_members(&mut batch, name, structure, change)?;
                }
                None => {
                    batch.remove(&self.catalog, name.as_bytes().to_vec());
                    self.remove_members(&mut batch, name, &HashSet::new())?;
                }
            }
        }
        batch.insert(&self.meta, COMMIT_SEQ_KEY.to_vec(), commit_seq.to_be_bytes().to_vec());

        batch.commit().map_err(backend_error)?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(backend_error)
    }
}
