//! Criterion benchmarks for spritetint critical paths
//!
//! Benchmarks the operations that run per pixel or per frame:
//! - HSL: RGB to HSL conversion and back
//! - Recolor: the selective pixel transform at common sprite sizes
//! - Classify: coverage computation
//! - Color: target color parsing (hex and CSS)
//! - Cache: the hit path a palette rebuild takes after prewarm

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use spritetint::cache::RecolorCache;
use spritetint::codec::MemoryCodec;
use spritetint::color::{parse_color, TargetColor};
use spritetint::engine::RecolorEngine;
use spritetint::families::get_builtin;
use spritetint::hsl::{hsl_to_rgb, rgb_to_hsl};
use spritetint::recolor::{classify_image, recolor_pixels};

// =============================================================================
// Test Data Generators
// =============================================================================

/// Sprite with roughly a third of its pixels in the blue family, the rest
/// outline, skin and transparent padding.
fn make_sprite(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| match (x * 7 + y * 3) % 6 {
        0 => Rgba([0x33, 0x66, 0xCC, 255]),
        1 => Rgba([0x1F, 0x3D, 0x7A, 255]),
        2 => Rgba([0, 0, 0, 255]),
        3 => Rgba([0xE0, 0xAC, 0x69, 255]),
        4 => Rgba([0xF0, 0xF4, 0xFF, 255]),
        _ => Rgba([0, 0, 0, 0]),
    })
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_hsl(c: &mut Criterion) {
    let mut group = c.benchmark_group("hsl");

    group.bench_function("rgb_to_hsl", |b| b.iter(|| rgb_to_hsl(black_box(0x33), black_box(0x66), black_box(0xCC))));
    group.bench_function("rgb_to_hsl_gray", |b| b.iter(|| rgb_to_hsl(black_box(128), black_box(128), black_box(128))));
    group.bench_function("hsl_to_rgb", |b| b.iter(|| hsl_to_rgb(black_box(348.0), black_box(83.0), black_box(47.0))));

    group.finish();
}

fn bench_recolor(c: &mut Criterion) {
    let mut group = c.benchmark_group("recolor");
    let blue = get_builtin("blue").expect("blue family");
    let (hue, saturation) = TargetColor::new(0xDC, 0x14, 0x3C).hue_saturation();

    for size in [32u32, 64, 256] {
        let sprite = make_sprite(size);
        group.throughput(Throughput::Elements(u64::from(size * size)));
        group.bench_with_input(BenchmarkId::new("recolor_pixels", size), &sprite, |b, sprite| {
            b.iter(|| recolor_pixels(black_box(sprite.as_raw()), size, size, blue.range(), hue, saturation))
        });
        group.bench_with_input(BenchmarkId::new("classify", size), &sprite, |b, sprite| {
            b.iter(|| classify_image(black_box(sprite), blue.range()))
        });
    }

    group.finish();
}

fn bench_color(c: &mut Criterion) {
    let mut group = c.benchmark_group("color");

    group.bench_function("parse_hex_6", |b| b.iter(|| parse_color(black_box("#DC143C"))));
    group.bench_function("parse_named", |b| b.iter(|| parse_color(black_box("crimson"))));
    group.bench_function("parse_hsl", |b| b.iter(|| parse_color(black_box("hsl(348, 83%, 47%)"))));

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime");

    let codec = MemoryCodec::new();
    codec.insert("ninja/idle.png", make_sprite(64));
    let engine = RecolorEngine::new(Arc::new(codec), RecolorCache::default());
    let blue = get_builtin("blue").expect("blue family");
    let target = TargetColor::new(0xDC, 0x14, 0x3C);
    let source = "ninja/idle.png".into();

    rt.block_on(engine.recolor(&source, &blue, target)).expect("warm cache");

    group.bench_function("hit", |b| {
        b.iter(|| rt.block_on(engine.recolor(black_box(&source), &blue, target)))
    });
    group.bench_function("cold_64", |b| {
        b.iter(|| {
            engine.cache().clear();
            rt.block_on(engine.recolor(black_box(&source), &blue, target))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_hsl, bench_recolor, bench_color, bench_cache);

criterion_main!(benches);
