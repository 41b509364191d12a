//! Benchmarks for the query hot path.
//!
//! Run with: `cargo bench --bench sample_bench`
//!
//! Measures 2-D and 3-D point sampling on a loaded stack (no I/O) and
//! stage-weight computation with and without the repeat-query cache.

use std::path::Path;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::NamedTempFile;

use grdstack::grid::testdata::SyntheticBackend;
use grdstack::{GridStack, QueryPoint, StackConfig, StageBlender, StageTable};

/// Deterministic scatter of query points covering the globe.
fn query_points(n: usize) -> Vec<QueryPoint> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            QueryPoint::new(
                (t * 37.7) % 360.0,
                -88.0 + (t * 13.3) % 176.0,
                (t * 7.9) % 600.0,
            )
        })
        .collect()
}

fn loaded_stack(levels: &[f64]) -> GridStack<SyntheticBackend> {
    use std::io::Write;

    let geom = SyntheticBackend::global_one_degree();
    let backend = SyntheticBackend::new(
        geom,
        Arc::new(|lon, lat, layer| (lon * 0.02).sin() + lat * 0.01 + layer as f64),
    );
    let mut stack = GridStack::new(backend);
    if levels.len() > 1 {
        let mut file = NamedTempFile::new().unwrap();
        for z in levels {
            writeln!(file, "{z}").unwrap();
        }
        file.flush().unwrap();
        let config = StackConfig {
            edge_flags: "g".into(),
            ..StackConfig::three_d(file.path())
        };
        stack.load(Path::new("bench"), &config).unwrap();
    } else {
        let config = StackConfig {
            edge_flags: "g".into(),
            ..StackConfig::default()
        };
        stack.load(Path::new("bench.grd"), &config).unwrap();
    }
    stack
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    let points = query_points(1000);

    let flat = loaded_stack(&[0.0]);
    group.bench_function("single_layer_1000pts", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for p in &points {
                if let Ok(Some(v)) = flat.sample(black_box(p)) {
                    acc += v;
                }
            }
            acc
        })
    });

    let layered = loaded_stack(&[0.0, 100.0, 250.0, 410.0, 660.0, 1000.0]);
    group.bench_function("six_layer_1000pts", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for p in &points {
                if let Ok(Some(v)) = layered.sample(black_box(p)) {
                    acc += v;
                }
            }
            acc
        })
    });

    group.finish();
}

fn bench_stage_weights(c: &mut Criterion) {
    let mut group = c.benchmark_group("stage_weights");

    let pairs: Vec<(f64, f64)> = (0..20).map(|i| (i as f64 * 5.0, (i + 1) as f64 * 5.0)).collect();
    let table = StageTable::from_pairs(&pairs).unwrap();

    group.bench_function("scan_1000_times", |b| {
        let mut blender = StageBlender::new(table.clone());
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1000 {
                let t = (i as f64 * 0.171) % 100.0;
                let w = blender.weights(black_box(t)).unwrap();
                acc += w.f1;
            }
            acc
        })
    });

    // Repeated identical times hit the per-instance cache.
    group.bench_function("cached_repeat", |b| {
        let mut blender = StageBlender::new(table.clone());
        b.iter(|| {
            let w = blender.weights(black_box(42.5)).unwrap();
            w.f2
        })
    });

    group.finish();
}

criterion_group!(benches, bench_sampling, bench_stage_weights);
criterion_main!(benches);
