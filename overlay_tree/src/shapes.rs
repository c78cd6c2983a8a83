// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Concrete handles: point-anchored icons and captions, and text laid along a path.

use alloc::vec::Vec;
use kurbo::{Point, Rect, Size, Vec2};

use crate::handle::{HandleState, OverlayHandle};
use crate::screen::Screen;

/// Where a [`PointHandle`]'s box sits relative to its pivot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Anchor {
    /// Box centered on the pivot.
    #[default]
    Center,
    /// Pivot at the middle of the top edge; the box hangs below.
    Top,
    /// Pivot at the middle of the bottom edge; the box stands above.
    Bottom,
    /// Pivot at the middle of the left edge.
    Left,
    /// Pivot at the middle of the right edge.
    Right,
}

impl Anchor {
    fn place(self, pivot: Point, size: Size) -> Rect {
        let (w, h) = (size.width, size.height);
        let origin = match self {
            Self::Center => Point::new(pivot.x - w / 2.0, pivot.y - h / 2.0),
            Self::Top => Point::new(pivot.x - w / 2.0, pivot.y),
            Self::Bottom => Point::new(pivot.x - w / 2.0, pivot.y - h),
            Self::Left => Point::new(pivot.x, pivot.y - h / 2.0),
            Self::Right => Point::new(pivot.x - w, pivot.y - h / 2.0),
        };
        Rect::from_origin_size(origin, size)
    }
}

/// An icon or caption anchored at a single world-space point.
#[derive(Clone, Debug)]
pub struct PointHandle {
    state: HandleState,
    world_pivot: Point,
    size: Size,
    offset: Vec2,
    anchor: Anchor,
    pixel_pivot: Point,
    behind_camera: bool,
}

impl PointHandle {
    /// Create a centered handle of `size` pixels at `world_pivot`.
    pub fn new(state: HandleState, world_pivot: Point, size: Size) -> Self {
        Self {
            state,
            world_pivot,
            size,
            offset: Vec2::ZERO,
            anchor: Anchor::Center,
            pixel_pivot: Point::ORIGIN,
            behind_camera: false,
        }
    }

    /// Set the anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Shift the box by a fixed pixel offset from the projected pivot.
    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Move the handle. Takes effect on the next `update`.
    pub fn set_world_pivot(&mut self, world_pivot: Point) {
        self.world_pivot = world_pivot;
    }

    /// World-space anchor point.
    pub fn world_pivot(&self) -> Point {
        self.world_pivot
    }

    /// Pixel size of the box.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Whether the last `update` found the pivot behind the camera.
    pub fn is_behind_camera(&self) -> bool {
        self.behind_camera
    }
}

/// Displayed point standing in for a world point behind the camera: just
/// above the horizon, where only reverse projections land.
fn above_horizon(screen: &Screen, world: Point) -> Option<Point> {
    let y = screen.horizon_y()?;
    Some(Point::new(screen.to_pixel(world).x, y - 1.0))
}

impl OverlayHandle for PointHandle {
    fn state(&self) -> &HandleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandleState {
        &mut self.state
    }

    fn update(&mut self, screen: &Screen) -> bool {
        if !(self.size.width > 0.0 && self.size.height > 0.0) {
            return false;
        }
        if let Some(p) = screen.world_to_screen(self.world_pivot) {
            self.pixel_pivot = p;
            self.behind_camera = false;
            return true;
        }
        let Some(p) = above_horizon(screen, self.world_pivot) else {
            return false;
        };
        self.pixel_pivot = p;
        self.behind_camera = true;
        true
    }

    fn pivot(&self, _screen: &Screen) -> Point {
        // The offset must not push a stand-in pivot back below the horizon.
        if self.behind_camera {
            self.pixel_pivot
        } else {
            self.pixel_pivot + self.offset
        }
    }

    fn pixel_rect(&self, screen: &Screen) -> Rect {
        self.anchor.place(self.pivot(screen), self.size)
    }
}

/// Text laid along a world-space polyline.
///
/// The text is centered on the path. Its shape is one rect per path segment
/// it covers, so a bend does not claim the whole bounding box.
#[derive(Clone, Debug)]
pub struct PathTextHandle {
    state: HandleState,
    world_path: Vec<Point>,
    glyph_height: f64,
    text_length: f64,
    segments: Vec<Rect>,
    pixel_pivot: Point,
}

impl PathTextHandle {
    /// Create a path label `text_length` pixels long with glyphs `glyph_height` tall.
    pub fn new(state: HandleState, world_path: Vec<Point>, text_length: f64, glyph_height: f64) -> Self {
        Self {
            state: state.linear_shape(),
            world_path,
            glyph_height,
            text_length,
            segments: Vec::new(),
            pixel_pivot: Point::ORIGIN,
        }
    }

    /// World-space polyline.
    pub fn world_path(&self) -> &[Point] {
        &self.world_path
    }
}

impl OverlayHandle for PathTextHandle {
    fn state(&self) -> &HandleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandleState {
        &mut self.state
    }

    fn update(&mut self, screen: &Screen) -> bool {
        self.segments.clear();
        if self.world_path.len() < 2 || self.text_length <= 0.0 || self.glyph_height <= 0.0 {
            return false;
        }
        let mut path = Vec::with_capacity(self.world_path.len());
        for &p in &self.world_path {
            let Some(px) = screen.world_to_screen(p) else {
                // Part of the path is behind the camera; report it as such.
                let Some(stand_in) = above_horizon(screen, p) else {
                    return false;
                };
                self.pixel_pivot = stand_in;
                self.segments.push(Rect::from_center_size(stand_in, Size::ZERO));
                return true;
            };
            path.push(px);
        }
        let total: f64 = path.windows(2).map(|w| (w[1] - w[0]).hypot()).sum();
        if self.text_length > total {
            return false;
        }

        let start = (total - self.text_length) / 2.0;
        let end = start + self.text_length;
        let mid = total / 2.0;
        let pad = self.glyph_height / 2.0;
        let mut walked = 0.0;
        for w in path.windows(2) {
            let (a, b) = (w[0], w[1]);
            let len = (b - a).hypot();
            let (s0, s1) = (walked, walked + len);
            walked = s1;
            if len == 0.0 || s1 < start || s0 > end {
                continue;
            }
            let t0 = ((start - s0) / len).max(0.0);
            let t1 = ((end - s0) / len).min(1.0);
            self.segments
                .push(Rect::from_points(a.lerp(b, t0), a.lerp(b, t1)).inflate(pad, pad));
            if (s0..=s1).contains(&mid) {
                self.pixel_pivot = a.lerp(b, (mid - s0) / len);
            }
        }
        !self.segments.is_empty()
    }

    fn pivot(&self, _screen: &Screen) -> Point {
        self.pixel_pivot
    }

    fn pixel_rect(&self, _screen: &Screen) -> Rect {
        self.segments
            .iter()
            .copied()
            .reduce(|a, b| a.union(b))
            .unwrap_or(Rect::ZERO)
    }

    fn pixel_shape(&self, _screen: &Screen) -> Vec<Rect> {
        self.segments.clone()
    }
}
