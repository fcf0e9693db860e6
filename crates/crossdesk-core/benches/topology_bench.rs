//! Criterion benchmarks for [`EntityTopology`] hot paths.
//!
//! `jump_target` runs on every mouse move while the cursor is near an edge;
//! `rebuild_links` runs whenever an entity's displays or offsets change.
//!
//! Run with:
//! ```bash
//! cargo bench --package crossdesk-core --bench topology_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crossdesk_core::{Display, EntityIdx, EntityTopology, Point, Rect};

/// Builds a horizontal chain of `n` 1000×1000 entities.
fn build_chain(n: usize) -> EntityTopology {
    let mut topo = EntityTopology::new();
    for i in 0..n {
        let idx = topo.add_entity(format!("machine-{i}"));
        topo.add_display(
            idx,
            Display::new(0, Rect::new(Point::new(0, 0), Point::new(1000, 1000))),
        )
        .expect("fresh index must be valid");
        topo.set_display_offsets(idx, Point::new(1000 * i as i32, 0))
            .expect("fresh index must be valid");
    }
    topo.rebuild_links();
    topo
}

fn bench_jump_target(c: &mut Criterion) {
    let topo = build_chain(4);
    let mut group = c.benchmark_group("jump_target");

    // Central position: all four edge tests miss.
    group.bench_function("miss_center", |b| {
        b.iter(|| topo.jump_target(black_box(EntityIdx(0)), black_box(Point::new(500, 500))))
    });

    // Right jump zone with a neighbor present.
    group.bench_function("hit_right_edge", |b| {
        b.iter(|| topo.jump_target(black_box(EntityIdx(0)), black_box(Point::new(995, 500))))
    });

    group.finish();
}

fn bench_rebuild_links_scaling(c: &mut Criterion) {
    let counts = [2usize, 4, 8, 16];
    let mut group = c.benchmark_group("rebuild_links");

    for &count in &counts {
        group.bench_with_input(BenchmarkId::new("entities", count), &count, |b, &n| {
            let mut topo = build_chain(n);
            b.iter(|| topo.rebuild_links())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_jump_target, bench_rebuild_links_scaling);
criterion_main!(benches);
