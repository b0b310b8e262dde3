//! Configuration for catalog and collection operations.

/// Retry bound used by every read and write unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Retry bound used for one-time catalog initialization.
pub const DEFAULT_INIT_RETRIES: u32 = 1;

/// Default number of items prefetched per transaction by iterators and copies.
pub const DEFAULT_BUFFER_SIZE: u64 = 100;

/// Configuration shared by a storage manager and everything it hands out.
///
/// Controls the retry bounds of the transactional executor and the default
/// batch size for bulk reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Attempts per operation before giving up with `TransactionExhausted`.
    pub max_retries: u32,

    /// Attempts for creating catalog structures at construction time.
    pub init_retries: u32,

    /// Items fetched per transaction when no explicit batch size is given.
    pub default_buffer_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            init_retries: DEFAULT_INIT_RETRIES,
            default_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the retry bound for operations.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder method to set the retry bound for catalog initialization.
    #[must_use]
    pub fn with_init_retries(mut self, init_retries: u32) -> Self {
        self.init_retries = init_retries;
        self
    }

    /// Builder method to set the default prefetch size.
    #[must_use]
    pub fn with_default_buffer_size(mut self, size: u64) -> Self {
        self.default_buffer_size = size;
        self
    }
}
