//! Embedded transactional key-value engine for Tabula.
//!
//! This crate provides:
//! - [`Engine`] - Optimistic, snapshot-isolated store of named structures
//! - [`Transaction`] - Tree maps, hash maps, atomic longs and atomic variables
//! - [`retry`] - The bounded-retry unit-of-work executor
//! - Memory and `fjall` keyspace backings ([`Backing`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod engine;
pub mod persist;
pub mod retry;
pub mod structure;
pub mod transaction;

pub use engine::{Backing, Engine, EngineConfig};
pub use retry::{atomic, atomic_get};
pub use structure::{Structure, StructureKind};
pub use transaction::Transaction;
