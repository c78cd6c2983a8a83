// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay Tree: collision-free placement of map overlays.
//!
//! Map icons and labels are anchored in world space, but they collide in
//! screen space. Each time the view settles the tree decides which of them are
//! drawn, so that no two drawn overlays overlap and an icon and its captions
//! appear or disappear together.
//!
//! - Handles ([`OverlayHandle`]) carry identity ([`OverlayId`]), a numeric
//!   priority, a [`Rank`] and state flags ([`HandleFlags`]).
//! - Ranks are placed in increasing order. A handle at rank `n > 0` needs its
//!   same-id sibling at rank `n - 1` to be placed first.
//! - Collisions are resolved by [`HandleComparator`]. Losers are evicted along
//!   with every handle bound to them.
//! - Rebuilds are staggered: a placement is reused for a number of frames that
//!   grows with the scene size ([`FrameSchedule`]), unless something
//!   invalidates it.
//!
//! Placed rects live in an [`overlay_index::OverlayIndex`], so collision and
//! hit-test queries do not scan every placed handle.
//!
//! ## Rebuild protocol
//!
//! ```text
//! every frame:
//!   if tree.frame():
//!     tree.start_overlay_placing(screen, zoom)
//!     for each candidate: tree.add(&candidate)
//!     tree.end_overlay_placing()
//!   draw handles whose is_visible() is set
//! ```
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Affine, Point, Rect, Size};
//! use overlay_tree::{
//!     FeatureId, HandleRef, HandleState, OverlayId, OverlayTree, PointHandle, Rank, Screen,
//! };
//!
//! let screen = Screen::new(Affine::IDENTITY, Rect::new(0.0, 0.0, 800.0, 600.0));
//! let icon = |feature, priority, x| {
//!     let state = HandleState::new(OverlayId::new(FeatureId(feature), 0), priority, Rank::Rank0);
//!     HandleRef::new(PointHandle::new(state, Point::new(x, 100.0), Size::new(24.0, 24.0)))
//! };
//! let cafe = icon(1, 10, 100.0);
//! let bank = icon(2, 5, 110.0);
//!
//! let mut tree = OverlayTree::new();
//! assert!(tree.frame());
//! tree.start_overlay_placing(screen, 16);
//! tree.add(&cafe);
//! tree.add(&bank);
//! tree.end_overlay_placing();
//!
//! assert!(cafe.borrow().state().is_visible());
//! assert!(!bank.borrow().state().is_visible());
//! assert_eq!(tree.select_point(Point::new(100.0, 100.0)), vec![cafe.clone()]);
//! ```
//!
//! ## Features
//!
//! - `std` (default): forwards to `kurbo/std`.
//! - `libm`: forwards to `kurbo/libm` for `no_std` builds.
//!
//! Diagnostics go through the [`log`] facade: `debug` per rebuild, `trace`
//! per invalidation and eviction. The displacement event log used for debug
//! rendering is separate and opt-in, see [`OverlayTree::set_debug_displacement`].

#![no_std]

extern crate alloc;

mod comparator;
mod config;
mod debug;
mod handle;
mod schedule;
mod screen;
mod shapes;
mod tree;
mod types;

pub use comparator::HandleComparator;
pub use config::TreeConfig;
pub use debug::{DisplacementCase, DisplacementInfo, Rgba8};
pub use handle::{HandleKey, HandleRef, HandleState, OverlayHandle};
pub use schedule::FrameSchedule;
pub use screen::{Perspective, Screen};
pub use shapes::{Anchor, PathTextHandle, PointHandle};
pub use tree::OverlayTree;
pub use types::{DisplacementMode, FeatureId, HandleFlags, OverlayId, Rank};
