//! Sparse, growable arrays of optional values.
//!
//! An array is three engine structures: a tree map holding only the slots
//! that were explicitly set, an atomic long with the logical size, and an
//! atomic variable with the default value. A slot with no stored entry reads
//! as the default, so an array of a million defaults costs nothing.

use std::fmt;
use std::marker::PhantomData;

use tabula_engine::{StructureKind, Transaction};
use tabula_foundation::{Element, Error, ErrorContext, Result};
use tracing::debug;

use crate::iter::{ArrayIter, IndexedIterProvider, IterProvider};
use crate::naming::ArrayKeys;
use crate::session::Session;

/// Rejects batch sizes below one.
pub(crate) fn validate_batch(batch: u64) -> Result<()> {
    if batch < 1 {
        return Err(Error::invalid_argument(
            "the number of buffered items is less than 1",
        ));
    }
    Ok(())
}

/// Upper bound on the slots reserved up front for a range read.
const MAX_PREALLOCATED: usize = 4096;

/// Returns `size + count`, or `InvalidArgument` past `u64::MAX`.
fn grown(size: u64, count: u64) -> Result<u64> {
    size.checked_add(count).ok_or_else(|| {
        Error::invalid_argument(format!("array size {size} can not grow by {count}"))
    })
}

/// A persistent sparse array of `T`.
///
/// Handles are cheap to clone; every operation runs in its own transaction
/// against the shared engine, so clones observe each other's writes.
pub struct SparseArray<T> {
    session: Session,
    name: String,
    storage_id: u64,
    id: u64,
    keys: ArrayKeys,
    _element: PhantomData<fn() -> T>,
}

impl<T> Clone for SparseArray<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            name: self.name.clone(),
            storage_id: self.storage_id,
            id: self.id,
            keys: self.keys.clone(),
            _element: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SparseArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseArray")
            .field("name", &self.name)
            .field("storage_id", &self.storage_id)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<T> SparseArray<T> {
    pub(crate) fn bind(session: Session, name: &str, storage_id: u64, id: u64) -> Self {
        Self {
            session,
            name: name.to_string(),
            storage_id,
            id,
            keys: ArrayKeys::new(storage_id, id),
            _element: PhantomData,
        }
    }

    /// Creates the backing structures of a new array.
    pub(crate) fn create_structures(
        tx: &mut Transaction<'_>,
        storage_id: u64,
        id: u64,
    ) -> Result<()> {
        let keys = ArrayKeys::new(storage_id, id);
        tx.create(&keys.values, StructureKind::TreeMap)?;
        tx.create(&keys.size, StructureKind::AtomicLong)?;
        tx.create(&keys.default_value, StructureKind::AtomicVar)
    }

    /// Deletes the backing structures of an array.
    pub(crate) fn remove(tx: &mut Transaction<'_>, storage_id: u64, id: u64) {
        let keys = ArrayKeys::new(storage_id, id);
        tx.delete(&keys.values);
        tx.delete(&keys.size);
        tx.delete(&keys.default_value);
        debug!(storage_id, array_id = id, "array structures removed");
    }

    /// Returns the array name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the array id within its storage.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the id of the owning storage.
    #[must_use]
    pub fn storage_id(&self) -> u64 {
        self.storage_id
    }

    fn context(&self, operation: &'static str) -> ErrorContext {
        ErrorContext::new()
            .with_collection(self.name.clone())
            .with_operation(operation)
    }
}

impl<T: Element> SparseArray<T> {
    // --- Helpers running inside a transaction ---

    fn size_in(&self, tx: &mut Transaction<'_>) -> Result<u64> {
        tx.long_get(&self.keys.size)
    }

    fn check_index_in(&self, tx: &mut Transaction<'_>, index: u64) -> Result<()> {
        let size = self.size_in(tx)?;
        if index >= size {
            return Err(Error::index_out_of_range(index, size));
        }
        Ok(())
    }

    fn store_in(&self, tx: &mut Transaction<'_>, index: u64, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => tx.tree_put(&self.keys.values, index, value),
            None => tx.tree_remove(&self.keys.values, index).map(drop),
        }
    }

    fn resize_in(&self, tx: &mut Transaction<'_>, size: u64) -> Result<()> {
        let current = self.size_in(tx)?;
        if size < current {
            tx.tree_remove_range(&self.keys.values, size..)?;
        }
        tx.long_set(&self.keys.size, size)
    }

    /// Reads `[from, min(to, size))` with defaults filled in.
    fn entries_in(
        &self,
        tx: &mut Transaction<'_>,
        from: u64,
        to: u64,
    ) -> Result<Vec<(u64, Option<T>)>> {
        let to = to.min(self.size_in(tx)?);
        if from >= to {
            return Ok(Vec::new());
        }
        let default: Option<T> = tx.var_get(&self.keys.default_value)?;
        let mut stored = tx
            .tree_range::<T>(&self.keys.values, from..to)?
            .into_iter()
            .peekable();

        let mut entries = Vec::with_capacity(
            usize::try_from(to - from)
                .unwrap_or(MAX_PREALLOCATED)
                .min(MAX_PREALLOCATED),
        );
        for index in from..to {
            let value = match stored.next_if(|(key, _)| *key == index) {
                Some((_, value)) => Some(value),
                None => default.clone(),
            };
            entries.push((index, value));
        }
        Ok(entries)
    }

    /// Reads one prefetch window; used by the iterators.
    pub(crate) fn fetch(&self, from: u64, to: u64) -> Result<Vec<(u64, Option<T>)>> {
        self.session.run(|tx| self.entries_in(tx, from, to))
    }

    // --- Public operations ---

    /// Returns the logical size.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn size(&self) -> Result<u64> {
        self.session
            .run(|tx| self.size_in(tx))
            .map_err(|e| e.with_context(self.context("size")))
    }

    /// Returns the value at `index`, or the default if the slot is unset.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= size()`.
    pub fn get_value(&self, index: u64) -> Result<Option<T>> {
        self.session
            .run(|tx| {
                self.check_index_in(tx, index)?;
                match tx.tree_get(&self.keys.values, index)? {
                    Some(value) => Ok(Some(value)),
                    None => tx.var_get(&self.keys.default_value),
                }
            })
            .map_err(|e| e.with_context(self.context("get_value")))
    }

    /// Returns the values in `[from, to)`, with `to` clamped to the size.
    /// Unset slots read as the default. Empty if `from >= to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn get_values(&self, from: u64, to: u64) -> Result<Vec<Option<T>>> {
        self.fetch(from, to)
            .map(|entries| entries.into_iter().map(|(_, value)| value).collect())
            .map_err(|e| e.with_context(self.context("get_values")))
    }

    /// Stores `value` at `index`. `None` clears the slot back to the default.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= size()`.
    pub fn set_value(&self, index: u64, value: impl Into<Option<T>>) -> Result<()> {
        let value = value.into();
        self.session
            .run(|tx| {
                self.check_index_in(tx, index)?;
                self.store_in(tx, index, value.as_ref())
            })
            .map_err(|e| e.with_context(self.context("set_value")))
    }

    /// Appends one value at the end of the array.
    ///
    /// # Errors
    ///
    /// Returns `NullValue` if `value` is `None`.
    pub fn append_value(&self, value: impl Into<Option<T>>) -> Result<()> {
        self.append_values(1, value)
    }

    /// Appends `count` copies of `value` at the end of the array.
    ///
    /// # Errors
    ///
    /// Returns `NullValue` if `value` is `None`, or `InvalidArgument` if the
    /// size would pass `u64::MAX`.
    pub fn append_values(&self, count: u64, value: impl Into<Option<T>>) -> Result<()> {
        let value = value
            .into()
            .ok_or_else(|| Error::null_value().with_context(self.context("append_values")))?;
        self.session
            .run(|tx| {
                let size = self.size_in(tx)?;
                let end = grown(size, count)?;
                for index in size..end {
                    tx.tree_put(&self.keys.values, index, &value)?;
                }
                tx.long_set(&self.keys.size, end)
            })
            .map_err(|e| e.with_context(self.context("append_values")))
    }

    /// Sets the logical size. Shrinking drops every stored entry at or past
    /// the new size; growing only moves the bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is exhausted.
    pub fn resize(&self, size: u64) -> Result<()> {
        self.session
            .run(|tx| self.resize_in(tx, size))
            .map_err(|e| e.with_context(self.context("resize")))?;
        debug!(array = %self.name, size, "array resized");
        Ok(())
    }

    /// Empties the array. Equivalent to `resize(0)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is exhausted.
    pub fn clear(&self) -> Result<()> {
        self.resize(0)
    }

    /// Returns the value unset slots read as.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn get_default_value(&self) -> Result<Option<T>> {
        self.session
            .run(|tx| tx.var_get(&self.keys.default_value))
            .map_err(|e| e.with_context(self.context("get_default_value")))
    }

    /// Sets the value unset slots read as.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is exhausted.
    pub fn set_default_value(&self, value: impl Into<Option<T>>) -> Result<()> {
        let value = value.into();
        self.session
            .run(|tx| tx.var_set(&self.keys.default_value, value.as_ref()))
            .map_err(|e| e.with_context(self.context("set_default_value")))
    }

    // --- Iteration ---

    /// Returns a lazy iterator prefetching `batch` values per transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`.
    pub fn iter(&self, batch: u64) -> Result<ArrayIter<T>> {
        Ok(self.iter_provider(batch)?.iter())
    }

    /// Returns a restartable source of iterators over the values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`.
    pub fn iter_provider(&self, batch: u64) -> Result<IterProvider<T>> {
        validate_batch(batch).map_err(|e| e.with_context(self.context("iter_provider")))?;
        Ok(IterProvider::new(self.clone(), batch))
    }

    /// Returns a restartable source of iterators over `(index, value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`.
    pub fn iter_provider_with_index(&self, batch: u64) -> Result<IndexedIterProvider<T>> {
        validate_batch(batch)
            .map_err(|e| e.with_context(self.context("iter_provider_with_index")))?;
        Ok(IndexedIterProvider::new(self.clone(), batch))
    }

    // --- Bulk copies ---

    /// Appends every value of `source` to this array in one unit of work,
    /// reading `batch` values per source transaction. With `clear_first`
    /// this array is emptied first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`.
    pub fn copy_from(&self, source: &SparseArray<T>, clear_first: bool, batch: u64) -> Result<()> {
        validate_batch(batch).map_err(|e| e.with_context(self.context("copy_from")))?;
        let source_size = source.size()?;

        self.session
            .run(|tx| {
                if clear_first {
                    self.resize_in(tx, 0)?;
                }
                let start = self.size_in(tx)?;
                tx.long_set(&self.keys.size, grown(start, source_size)?)?;

                let mut read = 0;
                while read < source_size {
                    let window = source.fetch(read, read.saturating_add(batch).min(source_size))?;
                    if window.is_empty() {
                        break;
                    }
                    for (index, value) in &window {
                        self.store_in(tx, start + index, value.as_ref())?;
                    }
                    read += window.len() as u64;
                }
                // The source may have shrunk since its size was read.
                if read < source_size {
                    tx.long_set(&self.keys.size, start + read)?;
                }
                Ok(())
            })
            .map_err(|e| e.with_context(self.context("copy_from")))?;

        debug!(array = %self.name, source = %source.name, items = source_size, "array copied");
        Ok(())
    }

    /// Appends every item of `values`, committing one transaction per batch
    /// of `batch` items. A `None` item leaves its slot at the default.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`. Batches committed before a
    /// failure stay committed.
    pub fn copy_from_values<I>(&self, values: I, clear_first: bool, batch: u64) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Option<T>>,
    {
        validate_batch(batch).map_err(|e| e.with_context(self.context("copy_from_values")))?;
        if clear_first {
            self.clear()?;
        }

        let chunk = usize::try_from(batch).unwrap_or(usize::MAX);
        let mut values = values.into_iter().map(Into::into);
        loop {
            let window: Vec<Option<T>> = values.by_ref().take(chunk).collect();
            if window.is_empty() {
                return Ok(());
            }
            self.session
                .run(|tx| {
                    let start = self.size_in(tx)?;
                    let end = grown(start, window.len() as u64)?;
                    for (offset, value) in (0u64..).zip(&window) {
                        self.store_in(tx, start + offset, value.as_ref())?;
                    }
                    tx.long_set(&self.keys.size, end)
                })
                .map_err(|e| e.with_context(self.context("copy_from_values")))?;
        }
    }

    /// Appends every value of this array to `dest`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`.
    pub fn copy_to(&self, dest: &SparseArray<T>, clear_first: bool, batch: u64) -> Result<()> {
        dest.copy_from(self, clear_first, batch)
    }

    /// Reads the whole array, prefetching the configured default number of
    /// values per transaction.
    ///
    /// # Errors
    ///
    /// Returns the first read failure.
    pub fn to_vec(&self) -> Result<Vec<Option<T>>> {
        let mut values = Vec::new();
        self.copy_to_vec(&mut values, false, self.session.config().default_buffer_size)?;
        Ok(values)
    }

    /// Pushes every value of this array onto `dest`, in index order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `batch < 1`, or the first read failure.
    pub fn copy_to_vec(&self, dest: &mut Vec<Option<T>>, clear_first: bool, batch: u64) -> Result<()> {
        let iter = self.iter(batch)?;
        if clear_first {
            dest.clear();
        }
        for value in iter {
            dest.push(value?);
        }
        Ok(())
    }
}
