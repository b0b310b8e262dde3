//! Structure names for every catalog and collection.
//!
//! Each physical structure name is a fixed prefix followed by numeric ids, so
//! names never collide across storages or collections. These strings are the
//! on-disk layout: changing any of them makes existing files unreadable.

/// Hash map holding the storage catalog.
pub const STORAGE_CATALOG: &str = "st_storages";
/// Id counter of the storage catalog.
pub const STORAGE_COUNTER: &str = "st_num_storages";
/// Key prefix of storage catalog entries.
pub const STORAGE_KEY_PREFIX: &str = "st_name_key_";

/// Key prefix of array catalog entries.
pub const ARRAY_KEY_PREFIX: &str = "storage_array_k_";
/// Key prefix of matrix catalog entries.
pub const MATRIX_KEY_PREFIX: &str = "storage_matrix_k_";

/// Array catalog of a storage.
#[must_use]
pub fn array_catalog(storage_id: u64) -> String {
    format!("storage_arrays_{storage_id}")
}

/// Array id counter of a storage.
#[must_use]
pub fn array_counter(storage_id: u64) -> String {
    format!("storage_arrays_keys_{storage_id}")
}

/// Matrix catalog of a storage.
#[must_use]
pub fn matrix_catalog(storage_id: u64) -> String {
    format!("storage_matrices_{storage_id}")
}

/// Matrix id counter of a storage.
#[must_use]
pub fn matrix_counter(storage_id: u64) -> String {
    format!("storage_matrices_keys_{storage_id}")
}

/// Structure names backing one sparse array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayKeys {
    /// Tree map: index -> value.
    pub values: String,
    /// Atomic long: logical size.
    pub size: String,
    /// Atomic var: default value.
    pub default_value: String,
}

impl ArrayKeys {
    /// Derives the names for array `array_id` of storage `storage_id`.
    #[must_use]
    pub fn new(storage_id: u64, array_id: u64) -> Self {
        Self {
            values: format!("storage_array_{storage_id}_{array_id}"),
            size: format!("arr_num_items_stored_{storage_id}_{array_id}"),
            default_value: format!("arr_default_value_{storage_id}_{array_id}"),
        }
    }
}

/// Structure names backing one sparse matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixKeys {
    storage_id: u64,
    matrix_id: u64,
    /// Tree map: logical row -> row id.
    pub row_index: String,
    /// Atomic long: number of rows.
    pub num_rows: String,
    /// Atomic long: number of columns.
    pub num_cols: String,
    /// Atomic var: default value.
    pub default_value: String,
    /// Atomic long: next row id to hand out.
    pub next_row_id: String,
}

impl MatrixKeys {
    /// Derives the names for matrix `matrix_id` of storage `storage_id`.
    #[must_use]
    pub fn new(storage_id: u64, matrix_id: u64) -> Self {
        Self {
            storage_id,
            matrix_id,
            row_index: format!("storage_matrix_rows_{storage_id}_{matrix_id}"),
            num_rows: format!("mat_num_rows_{storage_id}_{matrix_id}"),
            num_cols: format!("mat_num_cols_{storage_id}_{matrix_id}"),
            default_value: format!("mat_default_value_{storage_id}_{matrix_id}"),
            next_row_id: format!("mat_next_row_id_{storage_id}_{matrix_id}"),
        }
    }

    /// Tree map holding the cells of a materialized row: column -> value.
    #[must_use]
    pub fn row(&self, row_id: u64) -> String {
        format!(
            "storage_matrix_row_{}_{}_{row_id}",
            self.storage_id, self.matrix_id
        )
    }
}
