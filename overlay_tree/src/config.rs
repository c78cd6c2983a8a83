// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning constants for [`OverlayTree`](crate::OverlayTree).

use crate::schedule::FrameSchedule;

/// Tuned constants of the placement engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TreeConfig {
    /// Rebuild cadence.
    pub schedule: FrameSchedule,
    /// Scale applied to the viewport around its center to get the area in
    /// which candidates are admitted.
    pub screen_rect_scale: f64,
    /// Half size of the point hit-test square, in logical pixels.
    pub search_half_size: f64,
    /// Spatial index cell size in pixels.
    pub grid_cell_size: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            schedule: FrameSchedule::default(),
            screen_rect_scale: 1.2,
            search_half_size: 10.0,
            grid_cell_size: overlay_index::backends::grid::DEFAULT_CELL_SIZE,
        }
    }
}
