//! Cross-layer integration tests for Tabula
//!
//! Tests that drive the storage layer end to end on in-memory and
//! file-backed engines.

mod concurrency;
mod properties;
mod scenarios;
