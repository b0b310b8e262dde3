//! Transactional sparse collections for Tabula.
//!
//! This crate provides:
//! - [`StorageManagerProvider`] - Opens an engine and hands out managers
//! - [`StorageManager`] - The catalog of named storages
//! - [`Storage`] - A namespace of arrays and matrices
//! - [`SparseArray`] - Growable arrays with a default value for unset slots
//! - [`SparseMatrix`] - Matrices with lazily materialized rows
//!
//! Every operation runs as a unit of work retried on conflict, so handles can
//! be shared freely between threads.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod array;
mod catalog;
pub mod iter;
pub mod manager;
pub mod matrix;
pub mod naming;
pub mod placeholder;
pub mod provider;
mod session;
pub mod storage;

pub use array::SparseArray;
pub use iter::{ArrayIter, IndexedArrayIter, IndexedIterProvider, IterProvider};
pub use manager::StorageManager;
pub use matrix::SparseMatrix;
pub use placeholder::{DataStream, Dictionary};
pub use provider::StorageManagerProvider;
pub use storage::Storage;
