// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay Index: an immediate-mode 2D rect index for screen-space overlays.
//!
//! - Insert and remove pixel rects carrying a small `Copy` payload.
//! - Query every entry intersecting a rect (or containing a point).
//! - Every mutation is visible to the next query; there is no commit step.
//!
//! Rects are [`kurbo::Rect`]s in pixel space. Intersection uses closed
//! intervals: rects that merely touch are reported as overlapping, which is the
//! conservative answer for collision-based placement.
//!
//! Backends are pluggable via the [`Backend`] trait. The default used by
//! [`OverlayIndex`] is a sparse uniform [`Grid`]; [`FlatVec`] is a linear scan
//! kept as a reference implementation.
//!
//! # Example
//!
//! ```rust
//! use kurbo::{Point, Rect};
//! use overlay_index::OverlayIndex;
//!
//! let mut idx: OverlayIndex<u32> = OverlayIndex::new();
//! let k1 = idx.insert(Rect::new(0.0, 0.0, 10.0, 10.0), 1);
//! let _k2 = idx.insert(Rect::new(5.0, 5.0, 15.0, 15.0), 2);
//!
//! let hits: Vec<_> = idx.query_point(Point::new(12.0, 12.0)).collect();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].1, 2);
//!
//! idx.remove(k1);
//! assert_eq!(idx.len(), 1);
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes normalized rects and no NaNs. Debug builds may assert.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod index;
pub mod rect;

pub use backend::Backend;
pub use backends::{FlatVec, Grid};
pub use index::{IndexGeneric, Key, LinearIndex, OverlayIndex};
pub use rect::{contains_point, intersects};
