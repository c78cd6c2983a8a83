// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;
use core::fmt::Debug;
use kurbo::{Point, Rect};

use crate::backend::Backend;
use crate::backends::{FlatVec, Grid};

/// Generational handle for entries.
///
/// A key stays valid until its entry is removed or the index is cleared.
/// Slots are reused, but the generation bump keeps stale keys from aliasing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(u32, u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Keys are 32-bit; an index never holds anywhere near u32::MAX slots."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Entry<P> {
    generation: u32,
    rect: Rect,
    payload: P,
}

/// A rect index parameterized by a spatial backend.
///
/// Unlike a batched scene index, every mutation is visible to the very next
/// query: overlay placement interleaves "who overlaps me?" queries with
/// inserts and evictions of the winners and losers.
pub struct IndexGeneric<P: Copy + Debug, B: Backend> {
    entries: Vec<Option<Entry<P>>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    len: usize,
    backend: B,
}

impl<P: Copy + Debug, B: Backend + Debug> Debug for IndexGeneric<P, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexGeneric")
            .field("len", &self.len)
            .field("slots", &self.entries.len())
            .field("free_list", &self.free_list.len())
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl<P: Copy + Debug, B: Backend + Default> Default for IndexGeneric<P, B> {
    fn default() -> Self {
        Self::with_backend(B::default())
    }
}

impl<P: Copy + Debug, B: Backend + Default> IndexGeneric<P, B> {
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Copy + Debug, B: Backend> IndexGeneric<P, B> {
    /// Create an empty index around an explicitly configured backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            backend,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a rect with payload. Returns a stable handle `Key`.
    pub fn insert(&mut self, rect: Rect, payload: P) -> Key {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.entries.push(None);
            self.generations.push(1);
            (self.entries.len() - 1, 1)
        };
        self.entries[idx] = Some(Entry {
            generation,
            rect,
            payload,
        });
        self.backend.insert(idx, rect);
        self.len += 1;
        Key::new(idx, generation)
    }

    /// Remove an entry, returning its payload. Stale keys return `None`.
    pub fn remove(&mut self, key: Key) -> Option<P> {
        self.entry(key)?;
        let entry = self.entries[key.idx()].take()?;
        self.backend.remove(key.idx());
        self.free_list.push(key.idx());
        self.len -= 1;
        Some(entry.payload)
    }

    /// Rect and payload of a live entry.
    pub fn get(&self, key: Key) -> Option<(Rect, P)> {
        self.entry(key).map(|e| (e.rect, e.payload))
    }

    /// Whether `key` refers to a live entry.
    pub fn contains_key(&self, key: Key) -> bool {
        self.entry(key).is_some()
    }

    /// Remove every entry. Outstanding keys become stale.
    pub fn clear(&mut self) {
        for (idx, slot) in self.entries.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.free_list.push(idx);
            }
        }
        self.backend.clear();
        self.len = 0;
    }

    /// Visit entries whose rect intersects `rect` (closed intervals, any order).
    pub fn for_each_in_rect<F: FnMut(Key, P)>(&self, rect: Rect, mut f: F) {
        self.backend.visit_rect(rect, |i| {
            if let Some(Some(e)) = self.entries.get(i) {
                f(Key::new(i, e.generation), e.payload);
            }
        });
    }

    /// Query for entries whose rect intersects the given rectangle.
    pub fn query_rect(&self, rect: Rect) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut out = Vec::new();
        self.for_each_in_rect(rect, |k, p| out.push((k, p)));
        out.into_iter()
    }

    /// Query for entries whose rect contains the point.
    pub fn query_point(&self, pt: Point) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut out = Vec::new();
        self.backend.visit_point(pt, |i| {
            if let Some(Some(e)) = self.entries.get(i) {
                out.push((Key::new(i, e.generation), e.payload));
            }
        });
        out.into_iter()
    }

    fn entry(&self, key: Key) -> Option<&Entry<P>> {
        let e = self.entries.get(key.idx())?.as_ref()?;
        if e.generation != key.1 {
            return None;
        }
        Some(e)
    }
}

/// Grid-backed index: the default for overlay placement.
pub type OverlayIndex<P> = IndexGeneric<P, Grid>;

/// Linear-scan index, mostly useful as a reference in tests.
pub type LinearIndex<P> = IndexGeneric<P, FlatVec>;

impl<P: Copy + Debug> OverlayIndex<P> {
    /// Create a grid-backed index with square cells of `cell_size` pixels.
    pub fn with_cell_size(cell_size: f64) -> Self {
        Self::with_backend(Grid::new(cell_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn insert_query_remove() {
        let mut idx: OverlayIndex<u32> = OverlayIndex::new();
        let k1 = idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
        let _k2 = idx.insert(Rect::new(5.0, 5.0, 15.0, 15.0), 2);
        assert_eq!(idx.len(), 2);

        let mut hits: Vec<_> = idx.query_point(Point::new(6.0, 6.0)).map(|(_, p)| p).collect();
        hits.sort_unstable();
        assert_eq!(hits, [1, 2]);

        assert_eq!(idx.remove(k1), Some(1));
        let hits: Vec<_> = idx.query_point(Point::new(6.0, 6.0)).map(|(_, p)| p).collect();
        assert_eq!(hits, [2]);
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn stale_key_does_not_alias_reused_slot() {
        let mut idx: OverlayIndex<u32> = OverlayIndex::new();
        let k = idx.insert(Rect::new(0.0, 0.0, 1.0, 1.0), 7);
        idx.remove(k);
        let k2 = idx.insert(Rect::new(0.0, 0.0, 1.0, 1.0), 8);
        assert_ne!(k, k2);
        assert!(!idx.contains_key(k));
        assert_eq!(idx.remove(k), None);
        assert_eq!(idx.get(k2).map(|(_, p)| p), Some(8));
    }

    #[test]
    fn clear_invalidates_keys_and_empties() {
        let mut idx: LinearIndex<u32> = LinearIndex::new();
        let k = idx.insert(Rect::new(0.0, 0.0, 1.0, 1.0), 1);
        idx.clear();
        assert!(idx.is_empty());
        assert!(!idx.contains_key(k));
        assert_eq!(idx.query_rect(Rect::new(-10.0, -10.0, 10.0, 10.0)).count(), 0);
        let k2 = idx.insert(Rect::new(0.0, 0.0, 1.0, 1.0), 2);
        assert_ne!(k, k2);
    }
}
