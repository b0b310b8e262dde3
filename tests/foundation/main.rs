//! Integration tests for Layer 0: Foundation
//!
//! Tests for error types, the element codec and configuration.

mod codec;
mod config;
mod errors;
