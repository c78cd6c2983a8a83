// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Displacement events for debug rendering.

use kurbo::Point;

/// 8-bit RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8 {
    /// Create a color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How a displacement was decided.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DisplacementCase {
    /// An already placed rival beat the candidate.
    RivalWon,
    /// The candidate beat and evicted a placed rival.
    CandidateWon,
    /// The rival belongs to the selected feature and cannot lose.
    SelectedRival,
}

impl DisplacementCase {
    /// Fixed color a debug renderer draws this case with.
    pub const fn color(self) -> Rgba8 {
        match self {
            Self::RivalWon => Rgba8::new(255, 0, 0, 255),
            Self::CandidateWon => Rgba8::new(0, 0, 255, 255),
            Self::SelectedRival => Rgba8::new(0, 255, 0, 255),
        }
    }
}

/// One displacement: an arrow from the winner to the loser.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DisplacementInfo {
    /// Center of the winner's extended rect.
    pub displacer_center: Point,
    /// Center of the loser's extended rect.
    pub displaced_center: Point,
    /// How it was decided.
    pub case: DisplacementCase,
    /// Arrow color.
    pub color: Rgba8,
}
