//! Named storages: a namespace of arrays and matrices.

use tabula_engine::Transaction;
use tabula_foundation::{Element, Error, ErrorContext, ErrorKind, Result};
use tracing::debug;

use crate::array::SparseArray;
use crate::catalog::{Catalog, validate_name};
use crate::matrix::{SparseMatrix, validate_dimensions};
use crate::placeholder::{DataStream, Dictionary};
use crate::session::Session;

/// A storage within a [`StorageManager`](crate::StorageManager).
///
/// Holds one catalog per collection kind. Collection ids are allocated per
/// storage and never reused.
#[derive(Clone, Debug)]
pub struct Storage {
    session: Session,
    name: String,
    id: u64,
    arrays: Catalog,
    matrices: Catalog,
}

impl Storage {
    pub(crate) fn bind(session: Session, name: &str, id: u64) -> Self {
        Self {
            session,
            name: name.to_string(),
            id,
            arrays: Catalog::arrays(id),
            matrices: Catalog::matrices(id),
        }
    }

    /// Creates the catalogs of a new storage.
    pub(crate) fn create_structures(tx: &mut Transaction<'_>, id: u64) -> Result<()> {
        Catalog::arrays(id).ensure(tx)?;
        Catalog::matrices(id).ensure(tx)
    }

    /// Deletes every collection of a storage, then its catalogs.
    pub(crate) fn remove(tx: &mut Transaction<'_>, id: u64) -> Result<()> {
        let arrays = Catalog::arrays(id);
        for (_, array_id) in arrays.entries(tx)? {
            SparseArray::<()>::remove(tx, id, array_id);
        }
        arrays.drop_structures(tx);

        let matrices = Catalog::matrices(id);
        for (_, matrix_id) in matrices.entries(tx)? {
            SparseMatrix::<()>::remove(tx, id, matrix_id)?;
        }
        matrices.drop_structures(tx);
        Ok(())
    }

    /// Returns the storage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    fn context(&self, operation: &'static str) -> ErrorContext {
        ErrorContext::new()
            .with_collection(self.name.clone())
            .with_operation(operation)
    }

    fn checked(&self, name: &str, operation: &'static str) -> Result<()> {
        validate_name(name).map_err(|e| e.with_context(self.context(operation)))
    }

    // --- Arrays ---

    /// Returns the names of every array, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn list_array_names(&self) -> Result<Vec<String>> {
        self.session
            .run(|tx| self.arrays.names(tx))
            .map_err(|e| e.with_context(self.context("list_array_names")))
    }

    /// Returns true if an array with this name exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn contains_array_name(&self, name: &str) -> Result<bool> {
        self.checked(name, "contains_array_name")?;
        self.session
            .run(|tx| self.arrays.contains(tx, name))
            .map_err(|e| e.with_context(self.context("contains_array_name")))
    }

    /// Returns the array `name`, creating an empty one if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn create_array<T: Element>(&self, name: &str) -> Result<SparseArray<T>> {
        self.checked(name, "create_array")?;
        let (id, created) = self
            .session
            .run(|tx| {
                let (id, created) = self.arrays.get_or_insert(tx, name)?;
                if created {
                    SparseArray::<T>::create_structures(tx, self.id, id)?;
                }
                Ok((id, created))
            })
            .map_err(|e| e.with_context(self.context("create_array")))?;
        if created {
            debug!(storage = %self.name, array = name, id, "array created");
        }
        Ok(SparseArray::bind(self.session.clone(), name, self.id, id))
    }

    /// Removes the array `name` and its data. Returns false if it did not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn remove_array(&self, name: &str) -> Result<bool> {
        self.checked(name, "remove_array")?;
        self.session
            .run(|tx| {
                let id = self.arrays.remove(tx, name)?;
                if let Some(id) = id {
                    SparseArray::<()>::remove(tx, self.id, id);
                }
                Ok(id.is_some())
            })
            .map_err(|e| e.with_context(self.context("remove_array")))
    }

    /// Returns the array `name`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn get_array<T: Element>(&self, name: &str) -> Result<Option<SparseArray<T>>> {
        self.checked(name, "get_array")?;
        let id = self
            .session
            .run(|tx| self.arrays.get(tx, name))
            .map_err(|e| e.with_context(self.context("get_array")))?;
        Ok(id.map(|id| SparseArray::bind(self.session.clone(), name, self.id, id)))
    }

    // --- Matrices ---

    /// Returns the names of every matrix, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the read transaction is exhausted.
    pub fn list_matrix_names(&self) -> Result<Vec<String>> {
        self.session
            .run(|tx| self.matrices.names(tx))
            .map_err(|e| e.with_context(self.context("list_matrix_names")))
    }

    /// Returns true if a matrix with this name exists.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn contains_matrix_name(&self, name: &str) -> Result<bool> {
        self.checked(name, "contains_matrix_name")?;
        self.session
            .run(|tx| self.matrices.contains(tx, name))
            .map_err(|e| e.with_context(self.context("contains_matrix_name")))
    }

    /// Returns the matrix `name`, creating a `rows` x `cols` one if it does
    /// not exist. The dimensions of an existing matrix are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty or a dimension is zero.
    pub fn create_matrix<T: Element>(
        &self,
        name: &str,
        rows: u64,
        cols: u64,
    ) -> Result<SparseMatrix<T>> {
        self.checked(name, "create_matrix")?;
        validate_dimensions(rows, cols).map_err(|e| e.with_context(self.context("create_matrix")))?;
        let (id, created) = self
            .session
            .run(|tx| {
                let (id, created) = self.matrices.get_or_insert(tx, name)?;
                if created {
                    SparseMatrix::<T>::create_structures(tx, self.id, id, rows, cols)?;
                }
                Ok((id, created))
            })
            .map_err(|e| e.with_context(self.context("create_matrix")))?;
        if created {
            debug!(storage = %self.name, matrix = name, id, rows, cols, "matrix created");
        }
        Ok(SparseMatrix::bind(self.session.clone(), name, self.id, id))
    }

    /// Removes the matrix `name` and every row it materialized. Returns false
    /// if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn remove_matrix(&self, name: &str) -> Result<bool> {
        self.checked(name, "remove_matrix")?;
        self.session
            .run(|tx| match self.matrices.remove(tx, name)? {
                Some(id) => SparseMatrix::<()>::remove(tx, self.id, id).map(|()| true),
                None => Ok(false),
            })
            .map_err(|e| e.with_context(self.context("remove_matrix")))
    }

    /// Returns the matrix `name`, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the name is empty.
    pub fn get_matrix<T: Element>(&self, name: &str) -> Result<Option<SparseMatrix<T>>> {
        self.checked(name, "get_matrix")?;
        let id = self
            .session
            .run(|tx| self.matrices.get(tx, name))
            .map_err(|e| e.with_context(self.context("get_matrix")))?;
        Ok(id.map(|id| SparseMatrix::bind(self.session.clone(), name, self.id, id)))
    }

    // --- Dictionaries and data streams ---

    fn unsupported<T>(&self, feature: &'static str, operation: &'static str) -> Result<T> {
        Err(Error::not_implemented(feature).with_context(self.context(operation)))
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn list_dictionary_names(&self) -> Result<Vec<String>> {
        self.unsupported("dictionaries", "list_dictionary_names")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn contains_dictionary_name(&self, _name: &str) -> Result<bool> {
        self.unsupported("dictionaries", "contains_dictionary_name")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn create_dictionary(&self, _name: &str) -> Result<Dictionary> {
        self.unsupported("dictionaries", "create_dictionary")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn remove_dictionary(&self, _name: &str) -> Result<bool> {
        self.unsupported("dictionaries", "remove_dictionary")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn get_dictionary(&self, _name: &str) -> Result<Option<Dictionary>> {
        self.unsupported("dictionaries", "get_dictionary")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn list_data_stream_names(&self) -> Result<Vec<String>> {
        self.unsupported("data streams", "list_data_stream_names")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn contains_data_stream_name(&self, _name: &str) -> Result<bool> {
        self.unsupported("data streams", "contains_data_stream_name")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn create_data_stream(&self, _name: &str) -> Result<DataStream> {
        self.unsupported("data streams", "create_data_stream")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn remove_data_stream(&self, _name: &str) -> Result<bool> {
        self.unsupported("data streams", "remove_data_stream")
    }

    /// Not implemented.
    ///
    /// # Errors
    ///
    /// Always returns `NotImplemented`.
    pub fn get_data_stream(&self, _name: &str) -> Result<Option<DataStream>> {
        self.unsupported("data streams", "get_data_stream")
    }

    /// Flushes pending data. Every commit is already durable, so this only
    /// checks that the engine is still open.
    ///
    /// # Errors
    ///
    /// Returns `Closed` if the engine was closed.
    pub fn flush_data(&self) -> Result<()> {
        if self.session.engine().is_closed() {
            return Err(Error::new(ErrorKind::Closed)
                .with_context(self.context("flush_data")));
        }
        Ok(())
    }
}
