//! Integration tests for Layer 1: Engine
//!
//! Tests for transactions, commit validation, the retry executor and the
//! disk backing.

mod concurrency;
mod persistence;
mod transactions;
