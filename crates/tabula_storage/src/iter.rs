//! Lazy, prefetching iteration over sparse arrays.
//!
//! Iterators read the array one window at a time, each window in its own
//! transaction. Iteration ends at the first empty window, so an iterator sees
//! the array as it is when each window is fetched, not as it was at creation.

use std::collections::VecDeque;
use std::fmt;

use tabula_foundation::{Element, Result};

use crate::array::SparseArray;

struct Cursor<T> {
    array: SparseArray<T>,
    batch: u64,
    next: u64,
    buffer: VecDeque<(u64, Option<T>)>,
    finished: bool,
}

impl<T: Element> Cursor<T> {
    fn new(array: SparseArray<T>, batch: u64) -> Self {
        Self {
            array,
            batch,
            next: 0,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    fn advance(&mut self) -> Option<Result<(u64, Option<T>)>> {
        if self.buffer.is_empty() && !self.finished {
            let to = self.next.saturating_add(self.batch);
            match self.array.fetch(self.next, to) {
                Ok(window) if window.is_empty() => self.finished = true,
                Ok(window) => {
                    self.next += window.len() as u64;
                    self.buffer.extend(window);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// Iterator over the values of a [`SparseArray`], in index order.
///
/// A failed fetch is yielded once as `Err` and ends the iteration.
pub struct ArrayIter<T> {
    cursor: Cursor<T>,
}

impl<T: Element> Iterator for ArrayIter<T> {
    type Item = Result<Option<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor
            .advance()
            .map(|entry| entry.map(|(_, value)| value))
    }
}

impl<T> fmt::Debug for ArrayIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayIter")
            .field("array", &self.cursor.array)
            .field("next", &self.cursor.next)
            .finish_non_exhaustive()
    }
}

/// Iterator over `(index, value)` pairs of a [`SparseArray`].
pub struct IndexedArrayIter<T> {
    cursor: Cursor<T>,
}

impl<T: Element> Iterator for IndexedArrayIter<T> {
    type Item = Result<(u64, Option<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance()
    }
}

impl<T> fmt::Debug for IndexedArrayIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedArrayIter")
            .field("array", &self.cursor.array)
            .field("next", &self.cursor.next)
            .finish_non_exhaustive()
    }
}

/// Hands out fresh [`ArrayIter`]s, each starting from index 0.
#[derive(Clone, Debug)]
pub struct IterProvider<T> {
    array: SparseArray<T>,
    batch: u64,
}

impl<T: Element> IterProvider<T> {
    pub(crate) fn new(array: SparseArray<T>, batch: u64) -> Self {
        Self { array, batch }
    }

    /// Returns a new iterator from the start of the array.
    #[must_use]
    pub fn iter(&self) -> ArrayIter<T> {
        ArrayIter {
            cursor: Cursor::new(self.array.clone(), self.batch),
        }
    }
}

impl<T: Element> IntoIterator for &IterProvider<T> {
    type Item = Result<Option<T>>;
    type IntoIter = ArrayIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Hands out fresh [`IndexedArrayIter`]s, each starting from index 0.
#[derive(Clone, Debug)]
pub struct IndexedIterProvider<T> {
    array: SparseArray<T>,
    batch: u64,
}

impl<T: Element> IndexedIterProvider<T> {
    pub(crate) fn new(array: SparseArray<T>, batch: u64) -> Self {
        Self { array, batch }
    }

    /// Returns a new iterator from the start of the array.
    #[must_use]
    pub fn iter(&self) -> IndexedArrayIter<T> {
        IndexedArrayIter {
            cursor: Cursor::new(self.array.clone(), self.batch),
        }
    }
}

impl<T: Element> IntoIterator for &IndexedIterProvider<T> {
    type Item = Result<(u64, Option<T>)>;
    type IntoIter = IndexedArrayIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
