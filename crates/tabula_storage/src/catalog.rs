//! Name-to-id catalogs.
//!
//! A catalog is a hash map from prefixed name keys to numeric ids, plus a
//! separate atomic counter handing out the next id. Ids are never reused:
//! removing an entry does not rewind the counter.

use tabula_engine::{StructureKind, Transaction};
use tabula_foundation::{Error, Result};

use crate::naming;

/// Rejects names a catalog cannot hold.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("the name must not be empty"));
    }
    Ok(())
}

/// One name-to-id catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Catalog {
    map: String,
    counter: String,
    key_prefix: &'static str,
}

impl Catalog {
    /// The storage catalog of a manager.
    pub(crate) fn storages() -> Self {
        Self {
            map: naming::STORAGE_CATALOG.to_string(),
            counter: naming::STORAGE_COUNTER.to_string(),
            key_prefix: naming::STORAGE_KEY_PREFIX,
        }
    }

    /// The array catalog of a storage.
    pub(crate) fn arrays(storage_id: u64) -> Self {
        Self {
            map: naming::array_catalog(storage_id),
            counter: naming::array_counter(storage_id),
            key_prefix: naming::ARRAY_KEY_PREFIX,
        }
    }

    /// The matrix catalog of a storage.
    pub(crate) fn matrices(storage_id: u64) -> Self {
        Self {
            map: naming::matrix_catalog(storage_id),
            counter: naming::matrix_counter(storage_id),
            key_prefix: naming::MATRIX_KEY_PREFIX,
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.key_prefix)
    }

    /// Creates the backing structures if missing.
    pub(crate) fn ensure(&self, tx: &mut Transaction<'_>) -> Result<()> {
        tx.create(&self.map, StructureKind::HashMap)?;
        tx.create(&self.counter, StructureKind::AtomicLong)
    }

    /// Entry names with the key prefix stripped, sorted.
    pub(crate) fn names(&self, tx: &mut Transaction<'_>) -> Result<Vec<String>> {
        Ok(tx
            .hash_keys(&self.map)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(self.key_prefix).map(str::to_string))
            .collect())
    }

    /// Every `(name, id)` pair, sorted by name.
    pub(crate) fn entries(&self, tx: &mut Transaction<'_>) -> Result<Vec<(String, u64)>> {
        let mut entries = Vec::new();
        for name in self.names(tx)? {
            if let Some(id) = self.get(tx, &name)? {
                entries.push((name, id));
            }
        }
        Ok(entries)
    }

    pub(crate) fn contains(&self, tx: &mut Transaction<'_>, name: &str) -> Result<bool> {
        tx.hash_contains(&self.map, &self.key(name))
    }

    pub(crate) fn get(&self, tx: &mut Transaction<'_>, name: &str) -> Result<Option<u64>> {
        tx.hash_get(&self.map, &self.key(name))
    }

    /// Returns the id of `name`, registering it under a fresh id if absent.
    /// The flag is true when the entry was created by this call.
    pub(crate) fn get_or_insert(&self, tx: &mut Transaction<'_>, name: &str) -> Result<(u64, bool)> {
        if let Some(id) = self.get(tx, name)? {
            return Ok((id, false));
        }
        let id = tx.long_get_and_add(&self.counter, 1)?;
        tx.hash_put(&self.map, &self.key(name), &id)?;
        Ok((id, true))
    }

    /// Unregisters `name` and returns the id it had.
    pub(crate) fn remove(&self, tx: &mut Transaction<'_>, name: &str) -> Result<Option<u64>> {
        let id = self.get(tx, name)?;
        if id.is_some() {
            tx.hash_remove(&self.map, &self.key(name))?;
        }
        Ok(id)
    }

    /// Deletes the catalog map and its counter.
    pub(crate) fn drop_structures(&self, tx: &mut Transaction<'_>) {
        tx.delete(&self.map);
        tx.delete(&self.counter);
    }
}
