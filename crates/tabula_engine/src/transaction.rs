//! Optimistic transactions over a directory snapshot.
//!
//! A `Transaction` reads from the snapshot taken at begin and buffers every
//! write locally. Each structure it touches is recorded together with the
//! version it had in the snapshot; commit succeeds only if none of those
//! versions moved in the meantime.
//!
//! Reading a structure that does not exist yields its empty value (empty map,
//! zero counter, unset variable). Writing one creates it.

use std::collections::HashMap;
use std::ops::RangeBounds;

use im::OrdMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tabula_foundation::{Error, Result, codec};
use tracing::debug;

use crate::engine::Engine;
use crate::persist::Change;
use crate::structure::{Bytes, Directory, Structure, StructureKind};

/// A unit of isolated, atomically committed work against an [`Engine`].
///
/// Dropping a transaction without committing discards its writes.
#[derive(Debug)]
pub struct Transaction<'e> {
    engine: &'e Engine,
    id: u64,
    snapshot: Directory,
    observed: HashMap<String, u64>,
    writes: HashMap<String, Option<Structure>>,
    changes: HashMap<String, Change>,
}

impl<'e> Transaction<'e> {
    pub(crate) fn new(engine: &'e Engine, id: u64, snapshot: Directory) -> Self {
        Self {
            engine,
            id,
            snapshot,
            observed: HashMap::new(),
            writes: HashMap::new(),
            changes: HashMap::new(),
        }
    }

    /// Returns the engine-unique id of this transaction.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns true if this transaction has buffered any write.
    #[must_use]
    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Commits the buffered writes.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a structure this transaction touched was changed
    /// by another commit since the snapshot was taken, `Closed` if the engine
    /// was closed, or an I/O error from the disk backing.
    pub fn commit(self) -> Result<()> {
        self.engine
            .apply(self.id, &self.observed, self.writes, &self.changes)
    }

    /// Discards the buffered writes.
    pub fn rollback(self) {
        debug!(
            tx = self.id,
            discarded = self.writes.len(),
            "transaction rolled back"
        );
    }

    // --- Structure access ---

    fn touched(&mut self, name: &str) -> &mut Change {
        self.changes.entry(name.to_string()).or_default()
    }

    fn observe(&mut self, name: &str) {
        if !self.observed.contains_key(name) {
            let version = self.snapshot.version_of(name);
            self.observed.insert(name.to_string(), version);
        }
    }

    fn read(&mut self, name: &str) -> Option<&Structure> {
        self.observe(name);
        match self.writes.get(name) {
            Some(write) => write.as_ref(),
            None => self.snapshot.get(name),
        }
    }

    fn read_as(&mut self, name: &str, kind: StructureKind) -> Result<Option<&Structure>> {
        match self.read(name) {
            Some(structure) if structure.kind() != kind => Err(Error::structure_kind(
                name,
                kind.name(),
                structure.kind().name(),
            )),
            other => Ok(other),
        }
    }

    fn write(&mut self, name: &str, kind: StructureKind) -> Result<&mut Structure> {
        self.observe(name);
        let snapshot = &self.snapshot;
        let slot = self
            .writes
            .entry(name.to_string())
            .or_insert_with(|| snapshot.get(name).cloned());
        if let Some(existing) = slot.as_ref() {
            if existing.kind() != kind {
                return Err(Error::structure_kind(
                    name,
                    kind.name(),
                    existing.kind().name(),
                ));
            }
        }
        Ok(slot.get_or_insert_with(|| kind.empty()))
    }

    /// Returns true if a structure with this name exists.
    pub fn exists(&mut self, name: &str) -> bool {
        self.read(name).is_some()
    }

    /// Creates an empty structure of the given kind unless one already exists.
    ///
    /// # Errors
    ///
    /// Returns `StructureKind` if the name is taken by a different kind.
    pub fn create(&mut self, name: &str, kind: StructureKind) -> Result<()> {
        if self.read_as(name, kind)?.is_none() {
            self.write(name, kind)?;
        }
        Ok(())
    }

    /// Deletes a structure. Deleting a missing structure is a no-op.
    pub fn delete(&mut self, name: &str) {
        if self.exists(name) {
            self.writes.insert(name.to_string(), None);
            *self.touched(name) = Change {
                reset: true,
                ..Change::default()
            };
        }
    }

    // --- Tree maps ---

    fn tree(&mut self, name: &str) -> Result<Option<&OrdMap<u64, Bytes>>> {
        Ok(match self.read_as(name, StructureKind::TreeMap)? {
            Some(Structure::TreeMap(map)) => Some(map),
            _ => None,
        })
    }

    fn tree_mut(&mut self, name: &str) -> Result<&mut OrdMap<u64, Bytes>> {
        match self.write(name, StructureKind::TreeMap)? {
            Structure::TreeMap(map) => Ok(map),
            other => Err(Error::structure_kind(
                name,
                StructureKind::TreeMap.name(),
                other.kind().name(),
            )),
        }
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if the value cannot be decoded.
    pub fn tree_get<T: DeserializeOwned>(&mut self, name: &str, key: u64) -> Result<Option<T>> {
        match self.tree(name)?.and_then(|map| map.get(&key)) {
            Some(bytes) => codec::decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`, creating the map if needed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if the value cannot be encoded.
    pub fn tree_put<T: Serialize>(&mut self, name: &str, key: u64, value: &T) -> Result<()> {
        let bytes = codec::encode(value)?;
        self.tree_mut(name)?.insert(key, bytes);
        self.touched(name).tree_keys.insert(key);
        Ok(())
    }

    /// Removes `key`. Returns true if an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn tree_remove(&mut self, name: &str, key: u64) -> Result<bool> {
        let present = self
            .tree(name)?
            .is_some_and(|map| map.contains_key(&key));
        if present {
            self.tree_mut(name)?.remove(&key);
            self.touched(name).tree_keys.insert(key);
        }
        Ok(present)
    }

    /// Returns the number of entries physically present.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn tree_len(&mut self, name: &str) -> Result<usize> {
        Ok(self.tree(name)?.map_or(0, OrdMap::len))
    }

    /// Returns the keys present within `range`, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn tree_keys(&mut self, name: &str, range: impl RangeBounds<u64>) -> Result<Vec<u64>> {
        Ok(self
            .tree(name)?
            .map(|map| map.range(range).map(|(k, _)| *k).collect())
            .unwrap_or_default())
    }

    /// Returns the entries present within `range`, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if a value cannot be decoded.
    pub fn tree_range<T: DeserializeOwned>(
        &mut self,
        name: &str,
        range: impl RangeBounds<u64>,
    ) -> Result<Vec<(u64, T)>> {
        let Some(map) = self.tree(name)? else {
            return Ok(Vec::new());
        };
        map.range(range)
            .map(|(k, bytes)| -> Result<(u64, T)> { Ok((*k, codec::decode(bytes)?)) })
            .collect()
    }

    /// Removes every entry within `range`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn tree_remove_range(&mut self, name: &str, range: impl RangeBounds<u64>) -> Result<usize> {
        let keys = self.tree_keys(name, range)?;
        if !keys.is_empty() {
            let map = self.tree_mut(name)?;
            for key in &keys {
                map.remove(key);
            }
            self.touched(name).tree_keys.extend(keys.iter().copied());
        }
        Ok(keys.len())
    }

    // --- Hash maps ---

    fn hash(&mut self, name: &str) -> Result<Option<&im::HashMap<String, Bytes>>> {
        Ok(match self.read_as(name, StructureKind::HashMap)? {
            Some(Structure::HashMap(map)) => Some(map),
            _ => None,
        })
    }

    fn hash_mut(&mut self, name: &str) -> Result<&mut im::HashMap<String, Bytes>> {
        match self.write(name, StructureKind::HashMap)? {
            Structure::HashMap(map) => Ok(map),
            other => Err(Error::structure_kind(
                name,
                StructureKind::HashMap.name(),
                other.kind().name(),
            )),
        }
    }

    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if the value cannot be decoded.
    pub fn hash_get<T: DeserializeOwned>(&mut self, name: &str, key: &str) -> Result<Option<T>> {
        match self.hash(name)?.and_then(|map| map.get(key)) {
            Some(bytes) => codec::decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Stores `value` under `key`, creating the map if needed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if the value cannot be encoded.
    pub fn hash_put<T: Serialize>(&mut self, name: &str, key: &str, value: &T) -> Result<()> {
        let bytes = codec::encode(value)?;
        self.hash_mut(name)?.insert(key.to_string(), bytes);
        self.touched(name).hash_keys.insert(key.to_string());
        Ok(())
    }

    /// Removes `key`. Returns true if an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn hash_remove(&mut self, name: &str, key: &str) -> Result<bool> {
        let present = self.hash_contains(name, key)?;
        if present {
            self.hash_mut(name)?.remove(key);
            self.touched(name).hash_keys.insert(key.to_string());
        }
        Ok(present)
    }

    /// Returns true if `key` is present.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn hash_contains(&mut self, name: &str, key: &str) -> Result<bool> {
        Ok(self.hash(name)?.is_some_and(|map| map.contains_key(key)))
    }

    /// Returns every key, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn hash_keys(&mut self, name: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .hash(name)?
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        Ok(keys)
    }

    // --- Atomic longs ---

    /// Reads a counter. A missing counter reads as 0.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn long_get(&mut self, name: &str) -> Result<u64> {
        Ok(match self.read_as(name, StructureKind::AtomicLong)? {
            Some(Structure::AtomicLong(value)) => *value,
            _ => 0,
        })
    }

    /// Sets a counter, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch.
    pub fn long_set(&mut self, name: &str, value: u64) -> Result<()> {
        if let Structure::AtomicLong(current) = self.write(name, StructureKind::AtomicLong)? {
            *current = value;
        }
        Ok(())
    }

    /// Adds `delta` to a counter and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch, or `Internal` on overflow.
    pub fn long_get_and_add(&mut self, name: &str, delta: u64) -> Result<u64> {
        let previous = self.long_get(name)?;
        let next = previous.checked_add(delta).ok_or_else(|| {
            Error::new(tabula_foundation::ErrorKind::Internal(format!(
                "counter {name} overflowed"
            )))
        })?;
        self.long_set(name, next)?;
        Ok(previous)
    }

    // --- Atomic variables ---

    /// Reads a variable. A missing variable reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if the value cannot be decoded.
    pub fn var_get<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        match self.read_as(name, StructureKind::AtomicVar)? {
            Some(Structure::AtomicVar(Some(bytes))) => codec::decode(bytes).map(Some),
            _ => Ok(None),
        }
    }

    /// Sets or clears a variable, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error on a kind mismatch or if the value cannot be encoded.
    pub fn var_set<T: Serialize>(&mut self, name: &str, value: Option<&T>) -> Result<()> {
        let bytes = value.map(codec::encode).transpose()?;
        if let Structure::AtomicVar(slot) = self.write(name, StructureKind::AtomicVar)? {
            *slot = bytes;
        }
        Ok(())
    }
}
