//! Sparse two-dimensional matrices.
//!
//! Rows are materialized lazily. A row index maps each touched logical row to
//! a row id; the cells of that row live in their own tree map named after the
//! row id. Untouched rows and unset cells read as the default value.
//!
//! Resizing is destructive in both directions: every materialized row is
//! dropped and all cells read as the default afterwards.

use std::fmt;
use std::marker::PhantomData;

use tabula_engine::{StructureKind, Transaction};
use tabula_foundation::{Element, Error, ErrorContext, Result};
use tracing::debug;

use crate::naming::MatrixKeys;
use crate::session::Session;

/// Rejects matrix dimensions below one.
pub(crate) fn validate_dimensions(rows: u64, cols: u64) -> Result<()> {
    if rows < 1 || cols < 1 {
        return Err(Error::invalid_argument(format!(
            "matrix dimensions must be at least 1x1, got {rows}x{cols}"
        )));
    }
    Ok(())
}

/// A persistent sparse matrix of `T`.
pub struct SparseMatrix<T> {
    session: Session,
    name: String,
    storage_id: u64,
    id: u64,
    keys: MatrixKeys,
    _element: PhantomData<fn() -> T>,
}

impl<T> Clone for SparseMatrix<T> {
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

impl<T> fmt::Debug for SparseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMatrix")
            .field("name", &self.name)
            .field("storage_id", &self.storage_id)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<T> SparseMatrix<T> {
    pub(crate) fn bind(session: Session, name: &str, storage_id: u64, id: u64) -> Self {
        Self {
            session,
            name: name.to_string(),
            storage_id,
            id,
            keys: MatrixKeys::new(storage_id, id),
            _element: PhantomData,
        }
    }

    /// Creates the backing structures of a new `rows` x `cols` matrix.
    pub(crate) fn create_structures(
        tx: &mut Transaction<'_>,
        storage_id: u64,
        id: u64,
        rows: u64,
        cols: u64,
    ) -> Result<()> {
        let keys = MatrixKeys::new(storage_id, id);
        tx.create(&keys.row_index, StructureKind::TreeMap)?;
        tx.long_set(&keys.num_rows, rows)?;
        tx.long_set(&keys.num_cols, cols)?;
        tx.create(&keys.default_value, StructureKind::AtomicVar)?;
        tx.create(&keys.next_row_id, StructureKind::AtomicLong)
    }

    /// Deletes every row map, then the row index, counters and default.
    pub(crate) fn remove(tx: &mut Transaction<'_>, storage_id: u64, id: u64) -> Result<()> {
        let keys = MatrixKeys::new(storage_id, id);
        drop_rows(tx, &keys)?;
        tx.delete(&keys.row_index);
        tx.delete(&keys.num_rows);
        tx.delete(&keys.num_cols);
        tx.delete(&keys.default_value);
        tx.delete(&keys.next_row_id);
        debug!(storage_id, matrix_id = id, "matrix structures removed");
        Ok(())
    }

    /// Returns the matrix name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the matrix id within its storage.
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

/// Deletes every materialized row and empties the row index.
fn drop_rows(tx: &mut Transaction<'_>, keys: &MatrixKeys) -> Result<()> {
    let rows: Vec<(u64, u64)> = tx.tree_range(&keys.row_index, ..)?;
    for (_, row_id) in &rows {
        tx.delete(&keys.row(*row_id));
    }
    tx.tree_remove_range(&keys.row_index, ..)?;
    Ok(())
}

fn cell<T: Element>(
    tx: &mut Transaction<'_>,
    row_map: &str,
    col: u64,
    default: Option<&T>,
) -> Result<Option<T>> {
    Ok(tx.tree_get(row_map, col)?.or_else(|| default.cloned()))
}

fn check(index: u64, bound: u64) -> Result<()> {
    if index >= bound {
        return Err(Error::index_out_of_range(index, bound));
    }
    Ok(())
}

/// The fixed axis of a row or column slice.
#[derive(Clone, Copy)]
enum Slice {
    Row(u64),
    Col(u64),
}

fn check_range(start: u64, end: u64) -> Result<()> {
    if start > end {
        return Err(Error::invalid_range(start, end));
    }
    Ok(())
}

fn check_slice(slice: Slice, end: u64, rows: u64, cols: u64) -> Result<()> {
    let (fixed, fixed_bound, range_bound) = match slice {
        Slice::Row(row) => (row, rows, cols),
        Slice::Col(col) => (col, cols, rows),
    };
    check(fixed, fixed_bound)?;
    if end > range_bound {
        return Err(Error::index_out_of_range(end - 1, range_bound));
    }
    Ok(())
}

impl<T: Element> SparseMatrix<T> {
    fn dimensions_in(&self, tx: &mut Transaction<'_>) -> Result<(u64, u64)> {
        Ok((
            tx.long_get(&self.keys.num_rows)?,
            tx.long_get(&self.keys.num_cols)?,
        ))
    }

    fn check_cell_in(&self, tx: &mut Transaction<'_>, row: u64, col: u64) -> Result<()> {
        let (rows, cols) = self.dimensions_in(tx)?;
        check(row, rows)?;
        check(col, cols)
    }

    fn check_slice_in(&self, tx: &mut Transaction<'_>, slice: Slice, end: u64) -> Result<()> {
        let (rows, cols) = self.dimensions_in(tx)?;
        check_slice(slice, end, rows, cols)
    }

    /// Returns the row map of `row`, allocating one on first touch.
    fn materialize(&self, tx: &mut Transaction<'_>, row: u64) -> Result<String> {
        if let Some(row_id) = tx.tree_get::<u64>(&self.keys.row_index, row)? {
            return Ok(self.keys.row(row_id));
        }
        let row_id = tx.long_get_and_add(&self.keys.next_row_id, 1)?;
        tx.tree_put(&self.keys.row_index, row, &row_id)?;
        let row_map = self.keys.row(row_id);
        tx.create(&row_map, StructureKind::TreeMap)?;
        Ok(row_map)
    }

    /// Returns the number of rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn num_rows(&self) -> Result<u64> {
        self.session
            .run(|tx| tx.long_get(&self.keys.num_rows))
            .map_err(|e| e.with_context(self.context("num_rows")))
    }

    /// Returns the number of columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn num_cols(&self) -> Result<u64> {
        self.session
            .run(|tx| tx.long_get(&self.keys.num_cols))
            .map_err(|e| e.with_context(self.context("num_cols")))
    }

    /// Resets the matrix to `rows` x `cols` cells, all reading as the default.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if either dimension is zero.
    pub fn resize(&self, rows: u64, cols: u64) -> Result<()> {
        validate_dimensions(rows, cols).map_err(|e| e.with_context(self.context("resize")))?;
        self.session
            .run(|tx| {
                drop_rows(tx, &self.keys)?;
                tx.long_set(&self.keys.num_rows, rows)?;
                tx.long_set(&self.keys.num_cols, cols)
            })
            .map_err(|e| e.with_context(self.context("resize")))?;
        debug!(matrix = %self.name, rows, cols, "matrix resized");
        Ok(())
    }

    /// Returns the cell at (`row`, `col`), or the default if unset.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if the cell is outside the matrix.
    pub fn get_value(&self, row: u64, col: u64) -> Result<Option<T>> {
        self.session
            .run(|tx| {
                self.check_cell_in(tx, row, col)?;
                let row_map = self.materialize(tx, row)?;
                let default: Option<T> = tx.var_get(&self.keys.default_value)?;
                cell(tx, &row_map, col, default.as_ref())
            })
            .map_err(|e| e.with_context(self.context("get_value")))
    }

    /// Stores `value` at (`row`, `col`). `None` clears the cell.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if the cell is outside the matrix.
    pub fn set_value(&self, row: u64, col: u64, value: impl Into<Option<T>>) -> Result<()> {
        let value = value.into();
        self.session
            .run(|tx| {
                self.check_cell_in(tx, row, col)?;
                let row_map = self.materialize(tx, row)?;
                match &value {
                    Some(value) => tx.tree_put(&row_map, col, value),
                    None => tx.tree_remove(&row_map, col).map(drop),
                }
            })
            .map_err(|e| e.with_context(self.context("set_value")))
    }

    /// Returns the cells of `row` in columns `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if `start > end`, or `IndexOutOfRange` if the row
    /// or `end` is outside the matrix.
    pub fn get_row_values(&self, row: u64, start: u64, end: u64) -> Result<Vec<Option<T>>> {
        check_range(start, end)
            .and_then(|()| {
                self.session.run(|tx| {
                    self.check_slice_in(tx, Slice::Row(row), end)?;
                    if start == end {
                        return Ok(Vec::new());
                    }
                    let row_map = self.materialize(tx, row)?;
                    let default: Option<T> = tx.var_get(&self.keys.default_value)?;
                    (start..end)
                        .map(|col| cell(tx, &row_map, col, default.as_ref()))
                        .collect()
                })
            })
            .map_err(|e| e.with_context(self.context("get_row_values")))
    }

    /// Returns the cells of `col` in rows `[start, end)`. Every row read is
    /// materialized.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRange` if `start > end`, or `IndexOutOfRange` if the
    /// column or `end` is outside the matrix.
    pub fn get_col_values(&self, col: u64, start: u64, end: u64) -> Result<Vec<Option<T>>> {
        check_range(start, end)
            .and_then(|()| {
                self.session.run(|tx| {
                    self.check_slice_in(tx, Slice::Col(col), end)?;
                    let default: Option<T> = tx.var_get(&self.keys.default_value)?;
                    let mut values = Vec::new();
                    for row in start..end {
                        let row_map = self.materialize(tx, row)?;
                        values.push(cell(tx, &row_map, col, default.as_ref())?);
                    }
                    Ok(values)
                })
            })
            .map_err(|e| e.with_context(self.context("get_col_values")))
    }

    /// Returns the value unset cells read as.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn get_default_value(&self) -> Result<Option<T>> {
        self.session
            .run(|tx| tx.var_get(&self.keys.default_value))
            .map_err(|e| e.with_context(self.context("get_default_value")))
    }

    /// Sets the value unset cells read as.
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
}
