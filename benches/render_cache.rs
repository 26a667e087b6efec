//! Preview composition with and without a warm scaled-surface cache.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use daily_portrait::models::{Frame, GuideRegion};
use daily_portrait::render::{ScaledSurfaceCache, compose_surface};
use std::hint::black_box;

fn camera_frame(sequence: u64) -> Frame {
    let (width, height) = (640u32, 480u32);
    let pixels = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
    Frame::from_rgb(pixels, width, height, sequence).expect("frame size")
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_surface");
    let guide = GuideRegion::default();

    for (width, height) in [(320u32, 240u32), (800, 600), (1280, 960)] {
        let label = format!("{}x{}", width, height);

        // Same frame every tick: scaled surface reused
        group.bench_with_input(BenchmarkId::new("cached", &label), &(width, height), |b, &(w, h)| {
            let frame = camera_frame(1);
            let mut cache = ScaledSurfaceCache::new();
            b.iter(|| compose_surface(&mut cache, black_box(&frame), w, h, Some(&guide)));
        });

        // New frame every tick: rescaled each time
        group.bench_with_input(BenchmarkId::new("fresh", &label), &(width, height), |b, &(w, h)| {
            let frames: Vec<Frame> = (1..=8).map(camera_frame).collect();
            let mut cache = ScaledSurfaceCache::new();
            let mut next = 0;
            b.iter(|| {
                next = (next + 1) % frames.len();
                compose_surface(&mut cache, black_box(&frames[next]), w, h, Some(&guide))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
