//! Collection kinds a storage can name but not yet hold.
//!
//! Every [`Storage`](crate::Storage) operation on dictionaries or data streams
//! fails with `NotImplemented`, so values of these types are never handed out.

/// A named key-value dictionary within a storage.
#[derive(Clone, Debug)]
pub struct Dictionary {
    name: String,
}

impl Dictionary {
    /// Returns the dictionary name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A named append-only data stream within a storage.
#[derive(Clone, Debug)]
pub struct DataStream {
    name: String,
}

impl DataStream {
    /// Returns the stream name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
