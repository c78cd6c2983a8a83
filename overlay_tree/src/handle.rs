// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The overlay handle contract and the shared reference type the tree stores.
//!
//! ## Ownership
//!
//! Render buckets create handles and keep them between frames. The tree only
//! keeps [`HandleRef`] clones in its per-placement caches and drops them all
//! on the next rebuild or [`clear`](crate::OverlayTree::clear).
//! Identity, used both for cache membership and for the comparator's last
//! tie-break, is the address of the shared allocation.
//!
//! ## Mutation discipline
//!
//! During a rebuild the tree is the only writer of the `VISIBLE`, `DISPLAY`,
//! `READY` and `CACHING` flags. Between rebuilds the owner is the only writer
//! of geometry and content. Placement is single-threaded, so `RefCell`
//! borrows never overlap in practice.

use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, Ref, RefCell, RefMut};
use core::cmp::Ordering;
use core::fmt::Debug;
use kurbo::{Point, Rect, Vec2};
use overlay_index::intersects;

use crate::screen::Screen;
use crate::types::{DisplacementMode, HandleFlags, OverlayId, Rank};

/// State every handle carries: identity, priority, flags, and cached extended geometry.
///
/// Concrete handles embed one and expose it through [`OverlayHandle::state`].
#[derive(Clone, Debug)]
pub struct HandleState {
    overlay_id: OverlayId,
    priority: u64,
    rank: Rank,
    min_visible_zoom: u8,
    displacement_mode: DisplacementMode,
    extension: Vec2,
    flags: HandleFlags,
    extended_rect: Cell<Option<Rect>>,
    extended_shape: RefCell<Option<Vec<Rect>>>,
}

impl HandleState {
    /// Create the state of a ready, not yet visible handle.
    pub fn new(overlay_id: OverlayId, priority: u64, rank: Rank) -> Self {
        Self {
            overlay_id,
            priority,
            rank,
            min_visible_zoom: 0,
            displacement_mode: DisplacementMode::default(),
            extension: Vec2::ZERO,
            flags: HandleFlags::default(),
            extended_rect: Cell::new(None),
            extended_shape: RefCell::new(None),
        }
    }

    /// Hide the handle below this zoom level.
    #[must_use]
    pub fn with_min_visible_zoom(mut self, zoom: u8) -> Self {
        self.min_visible_zoom = zoom;
        self
    }

    /// Pad the pixel rect by `extension` on each side to get the extended rect.
    #[must_use]
    pub fn with_extension(mut self, extension: Vec2) -> Self {
        self.extension = extension;
        self
    }

    /// Set the displacement groups.
    #[must_use]
    pub fn with_displacement_mode(mut self, mode: DisplacementMode) -> Self {
        self.displacement_mode = mode;
        self
    }

    /// Tie the handle's placement fate to its same-id parent one rank below.
    #[must_use]
    pub fn bound_to_parent(mut self) -> Self {
        self.flags.insert(HandleFlags::BOUND_TO_PARENT);
        self
    }

    /// Mark as special layer: always compares as displayed.
    #[must_use]
    pub fn special_layer(mut self) -> Self {
        self.flags.insert(HandleFlags::SPECIAL_LAYER);
        self
    }

    /// Mark as laid out along a path.
    #[must_use]
    pub fn linear_shape(mut self) -> Self {
        self.flags.insert(HandleFlags::LINEAR_SHAPE);
        self
    }

    /// Logical overlay this handle belongs to.
    pub fn overlay_id(&self) -> OverlayId {
        self.overlay_id
    }

    /// Numeric priority; higher wins.
    pub fn priority(&self) -> u64 {
        self.priority
    }

    /// Placement tier.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Lowest zoom level at which the handle is considered.
    pub fn min_visible_zoom(&self) -> u8 {
        self.min_visible_zoom
    }

    /// Displacement groups.
    pub fn displacement_mode(&self) -> DisplacementMode {
        self.displacement_mode
    }

    /// Padding applied around the pixel geometry.
    pub fn extension(&self) -> Vec2 {
        self.extension
    }

    /// Raw flags.
    pub fn flags(&self) -> HandleFlags {
        self.flags
    }

    /// Placed by the last rebuild.
    pub fn is_visible(&self) -> bool {
        self.flags.contains(HandleFlags::VISIBLE)
    }

    /// Set the visibility decision.
    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(HandleFlags::VISIBLE, visible);
    }

    /// Geometry was computable for the last view.
    pub fn is_ready(&self) -> bool {
        self.flags.contains(HandleFlags::READY)
    }

    /// Set readiness.
    pub fn set_ready(&mut self, ready: bool) {
        self.flags.set(HandleFlags::READY, ready);
    }

    /// Displayed in the last stable frame.
    pub fn display_flag(&self) -> bool {
        self.flags.contains(HandleFlags::DISPLAY)
    }

    /// Set the sticky display flag.
    pub fn set_display_flag(&mut self, display: bool) {
        self.flags.set(HandleFlags::DISPLAY, display);
    }

    /// Whether extended geometry is cached.
    pub fn caching_enabled(&self) -> bool {
        self.flags.contains(HandleFlags::CACHING)
    }

    /// Toggle extended-geometry caching. Enabling always starts from an empty cache.
    pub fn set_caching_enabled(&mut self, enabled: bool) {
        self.flags.set(HandleFlags::CACHING, enabled);
        if enabled {
            self.invalidate_cache();
        }
    }

    /// Drop cached extended geometry.
    pub fn invalidate_cache(&mut self) {
        self.extended_rect.set(None);
        *self.extended_shape.get_mut() = None;
    }

    /// Tied to the same-id parent one rank below.
    pub fn is_bound_to_parent(&self) -> bool {
        self.flags.contains(HandleFlags::BOUND_TO_PARENT)
    }

    /// Always compares as displayed.
    pub fn is_special_layer(&self) -> bool {
        self.flags.contains(HandleFlags::SPECIAL_LAYER)
    }

    /// Laid out along a path.
    pub fn has_linear_feature_shape(&self) -> bool {
        self.flags.contains(HandleFlags::LINEAR_SHAPE)
    }
}

fn extend(r: Rect, e: Vec2) -> Rect {
    r.inflate(e.x, e.y)
}

/// One placeable decoration.
///
/// Implementors provide geometry; identity, priority and flags come from the
/// embedded [`HandleState`]. Extended geometry is derived and cached by the
/// provided methods.
pub trait OverlayHandle: Debug {
    /// Shared state.
    fn state(&self) -> &HandleState;

    /// Shared state, mutably.
    fn state_mut(&mut self) -> &mut HandleState;

    /// Recompute geometry for `screen`.
    ///
    /// Returns false if the handle is degenerate or cannot be placed in this
    /// view; the tree then skips it and schedules another rebuild.
    fn update(&mut self, screen: &Screen) -> bool;

    /// Anchor point in displayed pixels.
    fn pivot(&self, screen: &Screen) -> Point;

    /// Bounding box in displayed pixels.
    fn pixel_rect(&self, screen: &Screen) -> Rect;

    /// Constituent rects in displayed pixels. Defaults to the bounding box.
    fn pixel_shape(&self, screen: &Screen) -> Vec<Rect> {
        vec![self.pixel_rect(screen)]
    }

    /// Bounding box padded by the handle's extension, cached while caching is on.
    fn extended_pixel_rect(&self, screen: &Screen) -> Rect {
        let st = self.state();
        if st.caching_enabled()
            && let Some(r) = st.extended_rect.get()
        {
            return r;
        }
        let r = extend(self.pixel_rect(screen), st.extension);
        if st.caching_enabled() {
            st.extended_rect.set(Some(r));
        }
        r
    }

    /// Constituent rects padded by the handle's extension, cached while caching is on.
    fn extended_pixel_shape(&self, screen: &Screen) -> Vec<Rect> {
        let st = self.state();
        if st.caching_enabled()
            && let Some(shape) = st.extended_shape.borrow().as_ref()
        {
            return shape.clone();
        }
        let shape: Vec<Rect> = self
            .pixel_shape(screen)
            .into_iter()
            .map(|r| extend(r, st.extension))
            .collect();
        if st.caching_enabled() {
            *st.extended_shape.borrow_mut() = Some(shape.clone());
        }
        shape
    }

    /// Whether any extended sub-shape of `self` intersects one of `other`.
    fn is_intersect(&self, screen: &Screen, other: &dyn OverlayHandle) -> bool {
        let mine = self.extended_pixel_shape(screen);
        let theirs = other.extended_pixel_shape(screen);
        mine.iter().any(|a| theirs.iter().any(|b| intersects(a, b)))
    }

    /// Logical overlay this handle belongs to.
    fn overlay_id(&self) -> OverlayId {
        self.state().overlay_id
    }

    /// Numeric priority; higher wins.
    fn priority(&self) -> u64 {
        self.state().priority
    }

    /// Placement tier.
    fn rank(&self) -> Rank {
        self.state().rank
    }
}

/// Address-based identity of a handle allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleKey(usize);

/// Shared reference to a handle.
///
/// Equality, ordering and hashing follow [`HandleKey`], not handle contents.
#[derive(Clone)]
pub struct HandleRef(Rc<RefCell<dyn OverlayHandle>>);

impl HandleRef {
    /// Wrap a freshly created handle.
    pub fn new<H: OverlayHandle + 'static>(handle: H) -> Self {
        Self(Rc::new(RefCell::new(handle)))
    }

    /// Identity of the underlying allocation.
    pub fn key(&self) -> HandleKey {
        HandleKey(Rc::as_ptr(&self.0).cast::<()>() as usize)
    }

    /// Borrow the handle.
    pub fn borrow(&self) -> Ref<'_, dyn OverlayHandle> {
        self.0.borrow()
    }

    /// Borrow the handle mutably.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn OverlayHandle> {
        self.0.borrow_mut()
    }

    /// Whether two refs point at the same handle.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<H: OverlayHandle + 'static> From<Rc<RefCell<H>>> for HandleRef {
    fn from(rc: Rc<RefCell<H>>) -> Self {
        Self(rc)
    }
}

impl PartialEq for HandleRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for HandleRef {}

impl PartialOrd for HandleRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HandleRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl core::hash::Hash for HandleRef {
    fn hash<S: core::hash::Hasher>(&self, state: &mut S) {
        self.key().hash(state);
    }
}

impl Debug for HandleRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut d = f.debug_struct("HandleRef");
        d.field("key", &self.key());
        if let Ok(h) = self.0.try_borrow() {
            d.field("overlay_id", &h.overlay_id())
                .field("rank", &h.rank())
                .field("priority", &h.priority());
        }
        d.finish_non_exhaustive()
    }
}
