// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grid versus linear scan on label-sized rects.

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Rect;
use overlay_index::{LinearIndex, OverlayIndex};

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

/// Label-sized rects scattered over a 2000 x 2000 px screen.
fn gen_labels(count: usize, seed: u64) -> Vec<Rect> {
    let mut rng = Rng::new(seed);
    (0..count)
        .map(|_| {
            let x = rng.next_f64() * 1900.0;
            let y = rng.next_f64() * 1950.0;
            Rect::new(x, y, x + 20.0 + rng.next_f64() * 80.0, y + 16.0)
        })
        .collect()
}

/// Insert `rects` one by one, querying before each insert as placement does.
fn bench_insert_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_query");
    for &n in &[256usize, 1024, 4096] {
        let rects = gen_labels(n, 0xCAFE_F00D_DEAD_BEEF);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter_batched(
                OverlayIndex::<u32>::new,
                |mut idx| {
                    let mut hits = 0_usize;
                    for (i, r) in (0_u32..).zip(rects.iter().copied()) {
                        idx.for_each_in_rect(r, |_, _| hits += 1);
                        let _ = idx.insert(r, i);
                    }
                    black_box(hits);
                },
                BatchSize::SmallInput,
            );
        });
        if n <= 1024 {
            group.bench_function(format!("flatvec_n{n}"), |b| {
                b.iter_batched(
                    LinearIndex::<u32>::new,
                    |mut idx| {
                        let mut hits = 0_usize;
                        for (i, r) in (0_u32..).zip(rects.iter().copied()) {
                            idx.for_each_in_rect(r, |_, _| hits += 1);
                            let _ = idx.insert(r, i);
                        }
                        black_box(hits);
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }
    group.finish();
}

fn bench_grid_cell_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_cell_size");
    let rects = gen_labels(4096, 0xBADC_F00D_1234_5678);
    let queries = gen_labels(256, 0xFACE_FEED_CAFE_BABE);
    for &cell in &[16.0_f64, 64.0, 256.0] {
        let mut idx = OverlayIndex::<u32>::with_cell_size(cell);
        for (i, r) in (0_u32..).zip(rects.iter().copied()) {
            let _ = idx.insert(r, i);
        }
        group.bench_function(format!("query_cell{cell}"), |b| {
            b.iter(|| {
                let mut hits = 0_usize;
                for q in &queries {
                    hits += idx.query_rect(*q).count();
                }
                black_box(hits)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert_query, bench_grid_cell_size);
criterion_main!(benches);
