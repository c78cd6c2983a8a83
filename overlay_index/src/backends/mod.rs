// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: flat vector with linear scans (small, simple, the reference for tests).
//! - `grid`: uniform pixel grid with sparse cells; the default for overlay placement.
//!
//! Overlay rects are small relative to the screen and their count per frame is
//! bounded by what fits on screen, so a uniform grid keyed by cell coordinate
//! keeps each placement query proportional to the local density instead of the
//! total handle count.

pub mod flatvec;
pub mod grid;

pub use flatvec::FlatVec;
pub use grid::Grid;
