// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Closed-interval rectangle predicates.
//!
//! Kurbo's [`Rect::contains`] is half-open and [`Rect::intersect`] needs a
//! follow-up emptiness check. Overlay placement treats touching edges as a
//! collision, so the index and its callers share these closed variants.
//! All functions assume normalized rects (`x0 <= x1`, `y0 <= y1`) and no NaN.

use kurbo::{Point, Rect};

/// Whether two rects share at least one point (touching edges count).
#[inline]
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Whether `pt` lies inside `rect` or on its boundary.
#[inline]
pub fn contains_point(rect: &Rect, pt: Point) -> bool {
    rect.x0 <= pt.x && pt.x <= rect.x1 && rect.y0 <= pt.y && pt.y <= rect.y1
}

/// A degenerate rect covering exactly one point.
#[inline]
pub fn point_rect(pt: Point) -> Rect {
    Rect::new(pt.x, pt.y, pt.x, pt.y)
}
