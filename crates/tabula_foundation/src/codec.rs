//! Element encoding using `MessagePack`.
//!
//! The engine stores opaque byte strings; collections encode their elements
//! through this module on the way in and decode them on the way out.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, ErrorKind, Result};

/// Values that can be stored in a collection.
///
/// Blanket-implemented for every cloneable, thread-safe serde type.
pub trait Element: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Encodes a value to `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec(value).map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
}

/// Decodes a value from `MessagePack` bytes.
///
/// # Errors
///
/// Returns an error if the bytes do not hold a valid `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
}
