//! Error types for the Tabula system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

/// The main error type for Tabula operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument(message.into()))
    }

    /// Creates an index out of range error.
    #[must_use]
    pub fn index_out_of_range(index: u64, bound: u64) -> Self {
        Self::new(ErrorKind::IndexOutOfRange { index, bound })
    }

    /// Creates an invalid range error.
    #[must_use]
    pub fn invalid_range(start: u64, end: u64) -> Self {
        Self::new(ErrorKind::InvalidRange { start, end })
    }

    /// Creates a null value error.
    #[must_use]
    pub fn null_value() -> Self {
        Self::new(ErrorKind::NullValue)
    }

    /// Creates a transaction exhausted error wrapping the last failure.
    #[must_use]
    pub fn transaction_exhausted(attempts: u32, last: Option<Error>) -> Self {
        Self::new(ErrorKind::TransactionExhausted {
            attempts,
            last: last.map(Box::new),
        })
    }

    /// Creates a write conflict error for the named structure.
    #[must_use]
    pub fn conflict(structure: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict(structure.into()))
    }

    /// Creates a structure kind mismatch error.
    #[must_use]
    pub fn structure_kind(
        name: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        Self::new(ErrorKind::StructureKind {
            name: name.into(),
            expected,
            actual,
        })
    }

    /// Creates a not implemented error.
    #[must_use]
    pub fn not_implemented(feature: &'static str) -> Self {
        Self::new(ErrorKind::NotImplemented(feature))
    }

    /// Returns true if this error is an engine write conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict(_))
    }

    /// Returns true for argument and bounds errors. Running the same work
    /// again cannot change their outcome.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidArgument(_)
                | ErrorKind::IndexOutOfRange { .. }
                | ErrorKind::InvalidRange { .. }
                | ErrorKind::NullValue
        )
    }

    /// Returns the last failure wrapped by a [`ErrorKind::TransactionExhausted`].
    #[must_use]
    pub fn last_failure(&self) -> Option<&Error> {
        match &self.kind {
            ErrorKind::TransactionExhausted { last, .. } => last.as_deref(),
            _ => None,
        }
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A caller-supplied argument was rejected (empty name, zero size, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Index, row or column outside the current bounds.
    #[error("index out of range: {index} (valid range [0, {bound}))")]
    IndexOutOfRange {
        /// The index that was accessed.
        index: u64,
        /// The exclusive upper bound at the time of access.
        bound: u64,
    },

    /// Malformed start/end pair.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange {
        /// Start of the requested range.
        start: u64,
        /// End of the requested range.
        end: u64,
    },

    /// An operation that requires an explicit value received none.
    #[error("the specified value is absent")]
    NullValue,

    /// Every attempt of a retried unit of work failed.
    #[error("unable to perform transaction after {attempts} attempts")]
    TransactionExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The failure recorded by the last attempt.
        #[source]
        last: Option<Box<Error>>,
    },

    /// Commit validation failed: a touched structure changed concurrently.
    #[error("write conflict on structure {0}")]
    Conflict(String),

    /// A structure was accessed as a kind it is not.
    #[error("structure {name} is a {actual}, not a {expected}")]
    StructureKind {
        /// The structure name.
        name: String,
        /// The kind the caller asked for.
        expected: &'static str,
        /// The kind actually stored.
        actual: &'static str,
    },

    /// The engine was closed before the operation began.
    #[error("the storage engine is closed")]
    Closed,

    /// Placeholder collection types.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Value encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// File backing I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Name of the collection or catalog involved.
    pub collection: Option<String>,
    /// The public operation that failed.
    pub operation: Option<&'static str>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the collection name.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.operation, &self.collection) {
            (Some(op), Some(name)) => write!(f, "in {op} on {name}"),
            (Some(op), None) => write!(f, "in {op}"),
            (None, Some(name)) => write!(f, "on {name}"),
            (None, None) => Ok(()),
        }
    }
}

/// Result type alias for Tabula operations.
pub type Result<T> = std::result::Result<T, Error>;
