// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial indexing implementations.

use alloc::vec::Vec;
use kurbo::{Point, Rect};

use crate::rect::point_rect;

/// Spatial backend abstraction used by [`IndexGeneric`](crate::IndexGeneric).
///
/// Backends only see slot numbers; payloads and generations live in the index.
/// A slot is inserted at most once before being removed again.
pub trait Backend {
    /// Insert a new slot into the spatial structure.
    fn insert(&mut self, slot: usize, rect: Rect);

    /// Remove a slot from the spatial structure.
    fn remove(&mut self, slot: usize);

    /// Clear all spatial structures.
    fn clear(&mut self);

    /// Visit slots whose rect intersects `rect` (closed intervals).
    ///
    /// Each matching slot is visited exactly once, in no particular order.
    fn visit_rect<F: FnMut(usize)>(&self, rect: Rect, f: F);

    /// Visit slots whose rect contains the point.
    fn visit_point<F: FnMut(usize)>(&self, pt: Point, f: F) {
        self.visit_rect(point_rect(pt), f);
    }

    /// Query slots whose rect intersects the rectangle.
    ///
    /// The default implementation collects [`visit_rect`][Backend::visit_rect].
    fn query_rect(&self, rect: Rect) -> Vec<usize> {
        let mut out = Vec::new();
        self.visit_rect(rect, |i| out.push(i));
        out
    }
}
