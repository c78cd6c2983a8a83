// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View transform: world → pixel mapping plus an optional perspective tilt.

use kurbo::{Affine, Point, Rect, Vec2};

/// Tilt of the map plane away from the viewer.
///
/// Pixel coordinates are taken relative to the viewport center. A point at
/// relative height `y` sits at depth `d = focal - y * sin(tilt)` and projects
/// to `(focal * x / d, focal * y * cos(tilt) / d)`. The top of the map recedes;
/// points with `d <= 0` are behind the camera. Everything in front projects
/// below the horizon line at `-focal * cos(tilt) / sin(tilt)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Perspective {
    focal: f64,
    cos: f64,
    sin: f64,
}

impl Perspective {
    /// Create a perspective with `tilt` radians (in `(0, π/2)`) and focal
    /// distance `focal` in pixels.
    pub fn new(tilt: f64, focal: f64) -> Self {
        debug_assert!(focal > 0.0, "focal distance must be positive");
        let dir = Vec2::from_angle(tilt);
        Self {
            focal,
            cos: dir.x,
            sin: dir.y,
        }
    }

    /// Project a center-relative pixel offset. `None` if behind the camera.
    pub fn project(&self, rel: Vec2) -> Option<Vec2> {
        let d = self.focal - rel.y * self.sin;
        if d <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            self.focal * rel.x / d,
            self.focal * rel.y * self.cos / d,
        ))
    }

    /// Center-relative height of the horizon in projected space.
    /// `None` for a zero tilt, which has no horizon.
    pub fn horizon(&self) -> Option<f64> {
        (self.sin > 0.0).then(|| -self.focal * self.cos / self.sin)
    }
}

/// The camera state used for one placement pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Screen {
    world_to_pixel: Affine,
    viewport: Rect,
    perspective: Option<Perspective>,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(Affine::IDENTITY, Rect::ZERO)
    }
}

impl Screen {
    /// Create a flat (2D) screen.
    pub fn new(world_to_pixel: Affine, viewport: Rect) -> Self {
        Self {
            world_to_pixel,
            viewport,
            perspective: None,
        }
    }

    /// Tilt the view.
    #[must_use]
    pub fn with_perspective(mut self, perspective: Perspective) -> Self {
        self.perspective = Some(perspective);
        self
    }

    /// The pixel viewport.
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// The world → pixel transform.
    pub fn world_to_pixel(&self) -> Affine {
        self.world_to_pixel
    }

    /// Whether a perspective tilt is applied.
    pub fn is_perspective(&self) -> bool {
        self.perspective.is_some()
    }

    /// Map a world point to flat pixel space.
    pub fn to_pixel(&self, world: Point) -> Point {
        self.world_to_pixel * world
    }

    /// Map a flat pixel point into the displayed (possibly tilted) pixel space.
    /// `None` if the point is behind the camera.
    pub fn project(&self, pixel: Point) -> Option<Point> {
        let Some(p) = self.perspective else {
            return Some(pixel);
        };
        let c = self.viewport.center();
        p.project(pixel - c).map(|v| c + v)
    }

    /// Map a world point all the way to displayed pixels.
    pub fn world_to_screen(&self, world: Point) -> Option<Point> {
        self.project(self.to_pixel(world))
    }

    /// Whether a displayed pixel point can only stem from geometry behind the
    /// camera, i.e. it lies on or above the horizon. Always false in 2D.
    pub fn is_reverse_projection(&self, pixel: Point) -> bool {
        let Some(horizon) = self.perspective.and_then(|p| p.horizon()) else {
            return false;
        };
        pixel.y - self.viewport.center().y <= horizon
    }

    /// Displayed height of the horizon line. `None` without a tilt.
    pub fn horizon_y(&self) -> Option<f64> {
        let horizon = self.perspective.and_then(|p| p.horizon())?;
        Some(self.viewport.center().y + horizon)
    }

    /// The displayed pixel area.
    pub fn pixel_rect_in_3d(&self) -> Rect {
        self.viewport
    }
}
