//! Criterion benchmarks for animation encoding and decoding.
//!
//! Tracks performance across:
//! - Lossless vs lossy at methods 0, 4 and 6
//! - Sub-frame optimisation on and off
//! - Full container decode

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use webpanim::{decode_webp, EncodingOptions, WebpEncoder};

const WIDTH: u32 = 128;
const HEIGHT: u32 = 96;
const FRAMES: u32 = 8;

/// A square sliding across a gradient, so consecutive frames differ locally.
fn moving_square(frame: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((WIDTH * HEIGHT * 4) as usize);
    let left = frame * 12;
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if (left..left + 24).contains(&x) && (30..54).contains(&y) {
                pixels.extend_from_slice(&[240, 40, 40, 255]);
            } else {
                pixels.extend_from_slice(&[(x * 2) as u8, (y * 2) as u8, 128, 255]);
            }
        }
    }
    pixels
}

fn encoder_with(options: EncodingOptions, frames: &[Vec<u8>]) -> WebpEncoder {
    let mut encoder = WebpEncoder::new(WIDTH, HEIGHT, Some(options)).unwrap();
    for frame in frames {
        encoder.add_frame(frame.as_slice(), Some(80)).unwrap();
    }
    encoder
}

fn bench_encode_methods(c: &mut Criterion) {
    let frames: Vec<_> = (0..FRAMES).map(moving_square).collect();
    let mut group = c.benchmark_group("encode_method");
    group.throughput(Throughput::Elements(u64::from(WIDTH * HEIGHT * FRAMES)));

    for lossless in [true, false] {
        for method in [0u8, 4, 6] {
            let options = EncodingOptions::new()
                .lossless(lossless)
                .quality(75.0)
                .method(method);
            let encoder = encoder_with(options, &frames);
            let name = if lossless { "lossless" } else { "lossy" };
            group.bench_with_input(BenchmarkId::new(name, method), &encoder, |b, encoder| {
                b.iter(|| encoder.encode(black_box(&Default::default())).unwrap());
            });
        }
    }

    group.finish();
}

fn bench_minimize_size(c: &mut Criterion) {
    let frames: Vec<_> = (0..FRAMES).map(moving_square).collect();
    let mut group = c.benchmark_group("minimize_size");
    group.throughput(Throughput::Elements(u64::from(WIDTH * HEIGHT * FRAMES)));

    for minimize in [false, true] {
        let options = EncodingOptions::new().lossless(false).quality(75.0).minimize_size(minimize);
        let encoder = encoder_with(options, &frames);
        group.bench_with_input(BenchmarkId::new("lossy", minimize), &encoder, |b, encoder| {
            b.iter(|| encoder.encode(black_box(&Default::default())).unwrap());
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let frames: Vec<_> = (0..FRAMES).map(moving_square).collect();
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(u64::from(WIDTH * HEIGHT * FRAMES)));

    for lossless in [true, false] {
        let data = encoder_with(EncodingOptions::new().lossless(lossless).quality(75.0), &frames)
            .finish(None)
            .unwrap();
        let name = if lossless { "lossless" } else { "lossy" };
        group.bench_with_input(BenchmarkId::new("decode_webp", name), &data, |b, data| {
            b.iter(|| decode_webp(black_box(data)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode_methods, bench_minimize_size, bench_decode);
criterion_main!(benches);
