// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small render loop: pan a map and let the tree decide which labels show.
//!
//! Run:
//! - `cargo run -p overlay_demos --example placement_pass`

use kurbo::{Affine, Point, Rect, Size, Vec2};
use overlay_tree::{
    FeatureId, HandleRef, HandleState, OverlayId, OverlayTree, PointHandle, Rank, Screen,
};

struct Poi {
    name: &'static str,
    icon: HandleRef,
    caption: HandleRef,
}

fn poi(feature: u64, name: &'static str, priority: u64, at: Point) -> Poi {
    let id = OverlayId::new(FeatureId(feature), 0);
    let icon = HandleRef::new(PointHandle::new(
        HandleState::new(id, priority, Rank::Rank0),
        at,
        Size::new(24.0, 24.0),
    ));
    let caption = HandleRef::new(
        PointHandle::new(
            HandleState::new(id, priority, Rank::Rank1)
                .bound_to_parent()
                .with_extension(Vec2::new(2.0, 2.0)),
            at,
            Size::new(8.0 * name.len() as f64, 14.0),
        )
        .with_offset(Vec2::new(0.0, 20.0)),
    );
    Poi { name, icon, caption }
}

fn main() {
    let pois = [
        poi(1, "Museum", 90, Point::new(100.0, 100.0)),
        poi(2, "Cafe", 40, Point::new(115.0, 110.0)),
        poi(3, "Bakery", 60, Point::new(190.0, 100.0)),
        poi(4, "Railway Station", 120, Point::new(300.0, 240.0)),
        poi(5, "Kiosk", 10, Point::new(330.0, 262.0)),
    ];

    let mut tree = OverlayTree::new();
    for frame in 0..30 {
        // Pan right by 4 px per frame.
        let pan = Affine::translate((-4.0 * f64::from(frame), 0.0));
        let screen = Screen::new(pan, Rect::new(0.0, 0.0, 400.0, 300.0));
        if !tree.frame() {
            continue;
        }
        tree.start_overlay_placing(screen, 17);
        for p in &pois {
            tree.add(&p.icon);
            tree.add(&p.caption);
        }
        tree.end_overlay_placing();

        let shown: Vec<_> = pois
            .iter()
            .filter(|p| p.icon.borrow().state().is_visible())
            .map(|p| {
                let captioned = p.caption.borrow().state().is_visible();
                if captioned { p.name.to_string() } else { format!("({})", p.name) }
            })
            .collect();
        println!(
            "frame {frame:2}: rebuilt, period {:2}, shown {:?}",
            tree.frame_update_period(),
            shown
        );
    }
}
