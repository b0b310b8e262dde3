//! Tabula - Transactional sparse collections
//!
//! This crate re-exports all layers of the Tabula system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: tabula_storage    — Storage managers, sparse arrays and matrices
//! Layer 1: tabula_engine     — Transactional engine, retry executor
//! Layer 0: tabula_foundation — Errors, element codec, configuration
//! ```

pub use tabula_engine as engine;
pub use tabula_foundation as foundation;
pub use tabula_storage as storage;
