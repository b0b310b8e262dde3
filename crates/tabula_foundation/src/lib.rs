//! Core types for Tabula.
//!
//! This crate provides:
//! - [`Error`] - Rich error types with context
//! - [`Element`] and the `MessagePack` [`codec`] for stored values
//! - [`StoreConfig`] - Retry bounds and batch sizes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod config;
pub mod error;

pub use codec::Element;
pub use config::StoreConfig;
pub use error::{Error, ErrorContext, ErrorKind, Result};
