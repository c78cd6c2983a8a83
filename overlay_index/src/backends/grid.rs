// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform grid backend over pixel coordinates.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt::Debug;
use kurbo::Rect;

use crate::backend::Backend;
use crate::rect::intersects;

/// Default cell edge in pixels.
pub const DEFAULT_CELL_SIZE: f64 = 64.0;

/// Entries spanning more cells than this go to a linearly scanned side list.
const MAX_CELLS_PER_ENTRY: i64 = 1024;

/// Cell coordinates are clamped to `±2^40`. Anything reaching the bound is
/// far past `MAX_CELLS_PER_ENTRY` and lands in the oversized list.
const MAX_CELL_COORD: f64 = 1_099_511_627_776.0;

/// Inclusive range of cell coordinates covered by a rect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CellRange {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl CellRange {
    fn cell_count(&self) -> i64 {
        let w = self.x1.saturating_sub(self.x0).saturating_add(1);
        let h = self.y1.saturating_sub(self.y0).saturating_add(1);
        w.saturating_mul(h)
    }
}

#[derive(Clone, Debug)]
struct GridEntry {
    rect: Rect,
    // `None` when the entry lives in the oversized list.
    cells: Option<CellRange>,
}

/// Uniform grid backend.
///
/// Cells are stored sparsely, keyed row-major by `(row, column)`, so the grid has no fixed
/// extent and negative coordinates work without an origin offset. An entry is
/// registered in every cell its rect touches; queries report it once, from the
/// first cell shared by the entry and the query.
#[derive(Clone)]
pub struct Grid {
    cell_size: f64,
    entries: Vec<Option<GridEntry>>,
    cells: BTreeMap<(i64, i64), Vec<usize>>,
    oversized: Vec<usize>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl Grid {
    /// Create a grid backend with square cells of `cell_size` pixels.
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            entries: Vec::new(),
            cells: BTreeMap::new(),
            oversized: Vec::new(),
        }
    }

    /// Cell edge in pixels.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    fn floor_to_i64(v: f64) -> i64 {
        // NaN survives the clamp and casts to 0.
        let v = v.clamp(-MAX_CELL_COORD, MAX_CELL_COORD);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "The clamp keeps the value well inside the i64 range."
        )]
        let i = v as i64;
        if (i as f64) > v { i - 1 } else { i }
    }

    fn cell_of(&self, v: f64) -> i64 {
        Self::floor_to_i64(v / self.cell_size)
    }

    fn range_for(&self, r: &Rect) -> CellRange {
        CellRange {
            x0: self.cell_of(r.x0),
            y0: self.cell_of(r.y0),
            x1: self.cell_of(r.x1),
            y1: self.cell_of(r.y1),
        }
    }
}

impl Backend for Grid {
    fn insert(&mut self, slot: usize, rect: Rect) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        let range = self.range_for(&rect);
        let cells = if range.cell_count() > MAX_CELLS_PER_ENTRY {
            self.oversized.push(slot);
            None
        } else {
            for cy in range.y0..=range.y1 {
                for cx in range.x0..=range.x1 {
                    self.cells.entry((cy, cx)).or_default().push(slot);
                }
            }
            Some(range)
        };
        self.entries[slot] = Some(GridEntry { rect, cells });
    }

    fn remove(&mut self, slot: usize) {
        let Some(entry) = self.entries.get_mut(slot).and_then(Option::take) else {
            return;
        };
        match entry.cells {
            Some(range) => {
                for cy in range.y0..=range.y1 {
                    for cx in range.x0..=range.x1 {
                        let Some(bucket) = self.cells.get_mut(&(cy, cx)) else {
                            continue;
                        };
                        if let Some(pos) = bucket.iter().position(|&s| s == slot) {
                            bucket.swap_remove(pos);
                        }
                        if bucket.is_empty() {
                            self.cells.remove(&(cy, cx));
                        }
                    }
                }
            }
            None => {
                if let Some(pos) = self.oversized.iter().position(|&s| s == slot) {
                    self.oversized.swap_remove(pos);
                }
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.cells.clear();
        self.oversized.clear();
    }

    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, mut f: F) {
        let q = self.range_for(&rect);
        for &slot in &self.oversized {
            if let Some(Some(e)) = self.entries.get(slot)
                && intersects(&e.rect, &rect)
            {
                f(slot);
            }
        }
        if q.cell_count() > MAX_CELLS_PER_ENTRY {
            // Huge query: walking the stored entries is cheaper than the cells.
            for (slot, e) in self.entries.iter().enumerate() {
                if let Some(e) = e
                    && e.cells.is_some()
                    && intersects(&e.rect, &rect)
                {
                    f(slot);
                }
            }
            return;
        }
        for cy in q.y0..=q.y1 {
            for (&(_, cx), bucket) in self.cells.range((cy, q.x0)..=(cy, q.x1)) {
                for &slot in bucket {
                    let Some(Some(e)) = self.entries.get(slot) else {
                        continue;
                    };
                    let Some(own) = e.cells else {
                        continue;
                    };
                    // Report from the first cell shared by entry and query only.
                    if cx != own.x0.max(q.x0) || cy != own.y0.max(q.y0) {
                        continue;
                    }
                    if intersects(&e.rect, &rect) {
                        f(slot);
                    }
                }
            }
        }
    }
}

impl Debug for Grid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.entries.len();
        let alive = self.entries.iter().filter(|e| e.is_some()).count();
        f.debug_struct("Grid")
            .field("cell_size", &self.cell_size)
            .field("total_slots", &total)
            .field("alive", &alive)
            .field("cells", &self.cells.len())
            .field("oversized", &self.oversized.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn spanning_entry_reported_once() {
        let mut g = Grid::new(10.0);
        g.insert(0, Rect::new(0.0, 0.0, 35.0, 35.0));
        let hits = g.query_rect(Rect::new(-5.0, -5.0, 50.0, 50.0));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn negative_coordinates_map_to_distinct_cells() {
        let mut g = Grid::new(10.0);
        g.insert(0, Rect::new(-15.0, -15.0, -11.0, -11.0));
        g.insert(1, Rect::new(1.0, 1.0, 4.0, 4.0));
        assert_eq!(g.query_rect(Rect::new(-14.0, -14.0, -12.0, -12.0)), vec![0]);
        assert_eq!(g.query_rect(Rect::new(2.0, 2.0, 3.0, 3.0)), vec![1]);
        assert_eq!(
            sorted(g.query_rect(Rect::new(-20.0, -20.0, 20.0, 20.0))),
            vec![0, 1]
        );
    }

    #[test]
    fn remove_drops_empty_cells() {
        let mut g = Grid::new(10.0);
        g.insert(3, Rect::new(0.0, 0.0, 25.0, 5.0));
        assert_eq!(g.cells.len(), 3);
        g.remove(3);
        assert!(g.cells.is_empty());
        assert!(g.query_rect(Rect::new(0.0, 0.0, 30.0, 30.0)).is_empty());
        // Removing twice is a no-op.
        g.remove(3);
    }

    #[test]
    fn oversized_entries_are_scanned() {
        let mut g = Grid::new(1.0);
        g.insert(0, Rect::new(0.0, 0.0, 1000.0, 1000.0));
        g.insert(1, Rect::new(2.0, 2.0, 3.0, 3.0));
        assert!(g.oversized.contains(&0));
        assert_eq!(sorted(g.query_rect(Rect::new(2.5, 2.5, 2.6, 2.6))), vec![0, 1]);
        g.remove(0);
        assert!(g.oversized.is_empty());
        assert_eq!(g.query_rect(Rect::new(500.0, 500.0, 501.0, 501.0)), Vec::<usize>::new());
    }

    #[test]
    fn astronomically_large_rects_are_clamped_and_found() {
        let mut g = Grid::default();
        g.insert(0, Rect::new(-5e23, 490.0, 5e23, 510.0));
        g.insert(1, Rect::new(90.0, 490.0, 110.0, 510.0));
        g.insert(2, Rect::new(f64::MIN, f64::MIN, f64::MAX, f64::MAX));
        assert!(g.oversized.contains(&0), "wide rect is oversized");
        assert!(g.oversized.contains(&2), "full-range rect is oversized");
        assert_eq!(sorted(g.query_rect(Rect::new(95.0, 495.0, 105.0, 505.0))), vec![0, 1, 2]);
        assert_eq!(
            sorted(g.query_rect(Rect::new(-1e30, -1e30, 1e30, 1e30))),
            vec![0, 1, 2]
        );
        g.remove(0);
        g.remove(2);
        assert_eq!(g.query_rect(Rect::new(1e20, 495.0, 1e20 + 1.0, 505.0)), Vec::<usize>::new());
    }

    #[test]
    fn huge_query_falls_back_to_entry_scan() {
        let mut g = Grid::new(1.0);
        g.insert(0, Rect::new(5.0, 5.0, 6.0, 6.0));
        g.insert(1, Rect::new(5000.0, 5000.0, 5001.0, 5001.0));
        assert_eq!(
            sorted(g.query_rect(Rect::new(0.0, 0.0, 10_000.0, 10_000.0))),
            vec![0, 1]
        );
    }
}
