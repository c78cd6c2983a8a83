// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Full placement passes over synthetic scenes.

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Affine, Point, Rect, Size};
use overlay_tree::{
    FeatureId, HandleRef, HandleState, OverlayId, OverlayTree, Perspective, PointHandle, Rank,
    Screen,
};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// `groups` icons, each with a bound caption below it.
fn gen_scene(groups: u64, seed: u64) -> Vec<HandleRef> {
    let mut rng = Rng::new(seed);
    let mut out = Vec::new();
    for g in 0..groups {
        let id = OverlayId::new(FeatureId(g), 0);
        let priority = rng.next_u64() % 1000;
        let pivot = Point::new(rng.next_f64() * 1920.0, rng.next_f64() * 1080.0);
        out.push(HandleRef::new(PointHandle::new(
            HandleState::new(id, priority, Rank::Rank0),
            pivot,
            Size::new(24.0, 24.0),
        )));
        out.push(HandleRef::new(PointHandle::new(
            HandleState::new(id, priority, Rank::Rank1).bound_to_parent(),
            pivot + (0.0, 20.0),
            Size::new(40.0 + rng.next_f64() * 80.0, 14.0),
        )));
    }
    out
}

fn rebuild(tree: &mut OverlayTree, screen: Screen, handles: &[HandleRef]) -> usize {
    tree.invalidate_on_next_frame();
    tree.start_overlay_placing(screen, 16);
    for h in handles {
        tree.add(h);
    }
    tree.end_overlay_placing();
    tree.placed_count()
}

fn bench_rebuild(c: &mut Criterion) {
    let flat = Screen::new(Affine::IDENTITY, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    let tilted = flat.with_perspective(Perspective::new(0.6, 1500.0));
    let mut group = c.benchmark_group("rebuild");
    for &groups in &[100u64, 1000, 5000] {
        let handles = gen_scene(groups, 0xC1A5_7E55_9999_ABCD);
        group.throughput(Throughput::Elements(handles.len() as u64));
        for (name, screen) in [("flat", flat), ("tilted", tilted)] {
            let mut tree = OverlayTree::new();
            group.bench_function(format!("{name}_groups{groups}"), |b| {
                b.iter(|| black_box(rebuild(&mut tree, screen, &handles)));
            });
        }
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let screen = Screen::new(Affine::IDENTITY, Rect::new(0.0, 0.0, 1920.0, 1080.0));
    let handles = gen_scene(5000, 0xDEAD_BEEF_0BAD_F00D);
    let mut tree = OverlayTree::new();
    rebuild(&mut tree, screen, &handles);
    let mut rng = Rng::new(7);
    let points: Vec<_> = (0..256)
        .map(|_| Point::new(rng.next_f64() * 1920.0, rng.next_f64() * 1080.0))
        .collect();
    c.bench_function("select_point_x256", |b| {
        b.iter(|| {
            let hits: usize = points.iter().map(|&p| tree.select_point(p).len()).sum();
            black_box(hits)
        });
    });
}

criterion_group!(benches, bench_rebuild, bench_select);
criterion_main!(benches);
