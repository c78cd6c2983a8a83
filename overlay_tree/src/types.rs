// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public identity and classification types: features, overlay ids, ranks, and flags.

/// Identifier of a map feature (a POI, a road, a building).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u64);

/// Identity of a logical overlay.
///
/// Several handles (an icon at [`Rank::Rank0`], its caption at [`Rank::Rank1`], ...)
/// share one `OverlayId` and are displaced or evicted together.
///
/// The order is total and sorts by feature first, so every overlay of one
/// feature forms a contiguous range in an ordered map.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId {
    /// The feature this overlay decorates.
    pub feature_id: FeatureId,
    /// Disambiguates several overlays generated for the same feature.
    pub index: u32,
}

impl OverlayId {
    /// Create an overlay id.
    pub const fn new(feature_id: FeatureId, index: u32) -> Self {
        Self { feature_id, index }
    }
}

/// Placement tier.
///
/// Ranks are placed strictly in increasing order. A handle at rank `n > 0` is
/// only placed if a handle with the same [`OverlayId`] survived at rank `n - 1`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    /// Primary tier, typically icons.
    #[default]
    Rank0 = 0,
    /// Secondary tier, typically the primary caption.
    Rank1 = 1,
    /// Tertiary tier, typically a secondary caption.
    Rank2 = 2,
}

impl Rank {
    /// Number of ranks.
    pub const COUNT: usize = 3;

    /// All ranks in placement order.
    pub const ALL: [Self; Self::COUNT] = [Self::Rank0, Self::Rank1, Self::Rank2];

    /// Position in [`Rank::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The rank a handle at this rank depends on, if any.
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Rank0 => None,
            Self::Rank1 => Some(Self::Rank0),
            Self::Rank2 => Some(Self::Rank1),
        }
    }
}

bitflags::bitflags! {
    /// Per-handle state flags.
    ///
    /// The tree owns `VISIBLE`, `DISPLAY` and `CACHING` during a rebuild; the
    /// remaining bits describe the handle and are set by whoever creates it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct HandleFlags: u8 {
        /// Placed by the last rebuild; downstream rendering draws it.
        const VISIBLE         = 0b0000_0001;
        /// Geometry could be computed for the current view.
        const READY           = 0b0000_0010;
        /// Was displayed in the last stable frame. Only a comparator tie-break.
        const DISPLAY         = 0b0000_0100;
        /// Extended geometry may be served from the handle's cache.
        const CACHING         = 0b0000_1000;
        /// Placement fate is tied to the same-id handle one rank below.
        const BOUND_TO_PARENT = 0b0001_0000;
        /// Always compares as displayed (e.g. always-on UI glyphs).
        const SPECIAL_LAYER   = 0b0010_0000;
        /// Laid out along a path; skipped by hit tests and the perspective tie-break.
        const LINEAR_SHAPE    = 0b0100_0000;
    }
}

impl Default for HandleFlags {
    fn default() -> Self {
        Self::READY
    }
}

bitflags::bitflags! {
    /// Displacement groups.
    ///
    /// Handles only compete with handles sharing at least one group, and the
    /// tree only admits handles sharing a group with its current mode.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DisplacementMode: u8 {
        /// Ordinary map overlays.
        const REGULAR = 0b01;
        /// Overlays of the hotel layer.
        const HOTELS  = 0b10;
    }
}

impl Default for DisplacementMode {
    fn default() -> Self {
        Self::REGULAR
    }
}
