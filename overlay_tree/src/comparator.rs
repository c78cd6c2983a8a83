// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority order over overlay handles.

use core::cmp::Ordering;

use crate::handle::{HandleRef, OverlayHandle};

/// Total order used for candidate sorting and rival resolution.
///
/// Keys, most significant first:
/// 1. effective display flag (special-layer handles, or every handle when the
///    mask is disabled, count as displayed),
/// 2. numeric priority,
/// 3. [`OverlayId`](crate::OverlayId),
/// 4. handle identity.
///
/// Greater means "wins".
#[derive(Copy, Clone, Debug)]
pub struct HandleComparator {
    enable_mask: bool,
}

impl HandleComparator {
    /// Create a comparator. With `enable_mask` off, the display flag is ignored.
    pub const fn new(enable_mask: bool) -> Self {
        Self { enable_mask }
    }

    fn displayed(&self, h: &dyn OverlayHandle) -> bool {
        let st = h.state();
        !self.enable_mask || st.is_special_layer() || st.display_flag()
    }

    /// Compare two handles on keys 1 to 3.
    pub fn compare_handles(&self, l: &dyn OverlayHandle, r: &dyn OverlayHandle) -> Ordering {
        self.displayed(l)
            .cmp(&self.displayed(r))
            .then_with(|| l.priority().cmp(&r.priority()))
            .then_with(|| l.overlay_id().cmp(&r.overlay_id()))
    }

    /// Compare two handles on all keys.
    pub fn compare(&self, l: &HandleRef, r: &HandleRef) -> Ordering {
        let ord = self.compare_handles(&*l.borrow(), &*r.borrow());
        ord.then_with(|| l.key().cmp(&r.key()))
    }

    /// Whether `l` beats `r`.
    pub fn is_greater(&self, l: &HandleRef, r: &HandleRef) -> bool {
        self.compare(l, r) == Ordering::Greater
    }

    /// Equality on keys 1 and 2 only.
    pub fn is_equal(&self, l: &dyn OverlayHandle, r: &dyn OverlayHandle) -> bool {
        self.displayed(l) == self.displayed(r) && l.priority() == r.priority()
    }
}
