//! Named structures held by the engine.
//!
//! Every persistent object in the engine is one [`Structure`] stored under a
//! unique string name in the [`Directory`]. Structures are built from `im`
//! persistent collections, so snapshotting the whole directory is O(1).

use std::fmt;

use im::{HashMap, OrdMap};

/// Encoded element bytes, as produced by `tabula_foundation::codec`.
pub type Bytes = Vec<u8>;

/// A single named object in the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Structure {
    /// Ordered map keyed by `u64`.
    TreeMap(OrdMap<u64, Bytes>),
    /// Hash map keyed by strings.
    HashMap(HashMap<String, Bytes>),
    /// Atomic unsigned counter.
    AtomicLong(u64),
    /// Atomic cell holding an optional encoded value.
    AtomicVar(Option<Bytes>),
}

impl Structure {
    /// Returns the kind of this structure.
    #[must_use]
    pub fn kind(&self) -> StructureKind {
        match self {
            Self::TreeMap(_) => StructureKind::TreeMap,
            Self::HashMap(_) => StructureKind::HashMap,
            Self::AtomicLong(_) => StructureKind::AtomicLong,
            Self::AtomicVar(_) => StructureKind::AtomicVar,
        }
    }
}

/// Discriminant of [`Structure`], used for kind checks and creation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    /// See [`Structure::TreeMap`].
    TreeMap,
    /// See [`Structure::HashMap`].
    HashMap,
    /// See [`Structure::AtomicLong`].
    AtomicLong,
    /// See [`Structure::AtomicVar`].
    AtomicVar,
}

impl StructureKind {
    /// Human-readable name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TreeMap => "tree map",
            Self::HashMap => "hash map",
            Self::AtomicLong => "atomic long",
            Self::AtomicVar => "atomic var",
        }
    }

    /// Creates an empty structure of this kind.
    #[must_use]
    pub fn empty(self) -> Structure {
        match self {
            Self::TreeMap => Structure::TreeMap(OrdMap::new()),
            Self::HashMap => Structure::HashMap(HashMap::new()),
            Self::AtomicLong => Structure::AtomicLong(0),
            Self::AtomicVar => Structure::AtomicVar(None),
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A structure together with the commit sequence that last wrote it.
#[derive(Clone, Debug, PartialEq)]
pub struct Versioned {
    /// Commit sequence number of the last write. Never 0 for a stored entry.
    pub version: u64,
    /// The structure itself.
    pub structure: Structure,
}

/// The committed state of the engine: every structure by name.
///
/// Clone is O(1) due to structural sharing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Directory {
    /// Sequence number of the last successful commit.
    pub commit_seq: u64,
    /// Structures by name.
    pub entries: OrdMap<String, Versioned>,
}

impl Directory {
    /// Returns the version of the named structure, or 0 if it does not exist.
    #[must_use]
    pub fn version_of(&self, name: &str) -> u64 {
        self.entries.get(name).map_or(0, |v| v.version)
    }

    /// Returns the named structure, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Structure> {
        self.entries.get(name).map(|v| &v.structure)
    }
}
