//! Benchmarks for drawing grouping and reference resolution.
//!
//! Run with: cargo bench
//!
//! Pages are synthetic: scattered small boxes standing in for the thousands
//! of path fragments a plotted chart leaves behind.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pdfgfx::extract::{group_boxes, GroupingParams};
use pdfgfx::BoundingBox;

/// Pseudo-random but reproducible boxes spread over a Letter page.
fn scattered_boxes(count: usize) -> Vec<Option<BoundingBox>> {
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 10_000) as f64 / 10_000.0
    };
    (0..count)
        .map(|_| {
            let x = next() * 600.0;
            let y = next() * 780.0;
            let size = 1.0 + next() * 6.0;
            Some(BoundingBox::new(x, y, x + size, y + size))
        })
        .collect()
}

/// Benchmark grouping under both parameter profiles.
fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping");

    for count in [100, 800, 3000].iter() {
        let boxes = scattered_boxes(*count);

        group.bench_function(format!("scan_{}", count), |b| {
            b.iter(|| group_boxes(black_box(&boxes), GroupingParams::scan()));
        });
        group.bench_function(format!("export_{}", count), |b| {
            b.iter(|| group_boxes(black_box(&boxes), GroupingParams::export()));
        });
    }

    group.finish();
}

/// Benchmark reference extraction over a long generated answer.
fn bench_reference_resolution(c: &mut Criterion) {
    let text: String = (0..500)
        .map(|i| {
            format!(
                "Section {} discusses the result. ![fig](gfx/docreport_page{}_fig{}_hash{:08x}.png)\n",
                i,
                i / 4,
                i % 4,
                i * 7919
            )
        })
        .collect();
    let resolver = pdfgfx::ReferenceResolver::new();

    c.bench_function("resolve_500_references", |b| {
        b.iter(|| resolver.resolve(black_box(&text)));
    });
}

criterion_group!(benches, bench_grouping, bench_reference_resolution);
criterion_main!(benches);
