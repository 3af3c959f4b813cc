//! Criterion benchmarks for the LPVC encoder and decoder.

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use lpvc::{BitmapInfo, Color, Decoder, Encoder, EncoderSettings};

/// A screen-like frame: vertical bars from a small color set.
fn generate_bars_frame(width: usize, height: usize, colors: usize) -> Vec<Color> {
    let mut frame = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let bar = (x / 8 + y / 64) % colors;
            frame.push(Color {
                r: (bar * 31) as u8,
                g: (bar * 17) as u8,
                b: (bar * 7) as u8,
            });
        }
    }
    frame
}

/// A deterministic high-entropy frame that defeats the palette path.
fn generate_noise_frame(width: usize, height: usize) -> Vec<Color> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..width * height)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            Color {
                r: (state >> 40) as u8,
                g: (state >> 48) as u8,
                b: (state >> 56) as u8,
            }
        })
        .collect()
}

const SIZES: &[(usize, usize, &str)] = &[
    (320, 240, "320x240"),
    (640, 480, "640x480"),
    (1280, 720, "1280x720"),
];

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for &(width, height, label) in SIZES {
        let info = BitmapInfo { width, height };
        group.throughput(Throughput::Bytes((info.pixel_count() * 3) as u64));

        let paletted = generate_bars_frame(width, height, 12);
        group.bench_with_input(BenchmarkId::new("indexed", label), &paletted, |b, frame| {
            let mut encoder = Encoder::new(info, EncoderSettings::default()).unwrap();
            let mut buffer = vec![0u8; encoder.safe_output_buffer_size()];
            b.iter(|| {
                let result = encoder.encode(frame, &mut buffer, true).unwrap();
                black_box(result.bytes_written)
            });
        });

        let noise = generate_noise_frame(width, height);
        group.bench_with_input(BenchmarkId::new("raw", label), &noise, |b, frame| {
            let mut encoder = Encoder::new(info, EncoderSettings::default()).unwrap();
            let mut buffer = vec![0u8; encoder.safe_output_buffer_size()];
            b.iter(|| {
                let result = encoder.encode(frame, &mut buffer, true).unwrap();
                black_box(result.bytes_written)
            });
        });
    }

    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for &(width, height, label) in SIZES {
        let info = BitmapInfo { width, height };
        group.throughput(Throughput::Bytes((info.pixel_count() * 3) as u64));

        let frame = generate_bars_frame(width, height, 12);
        let mut encoder = Encoder::new(info, EncoderSettings::default()).unwrap();
        let mut buffer = vec![0u8; encoder.safe_output_buffer_size()];
        let result = encoder.encode(&frame, &mut buffer, true).unwrap();
        let encoded = buffer[..result.bytes_written].to_vec();

        group.bench_with_input(BenchmarkId::new("indexed", label), &encoded, |b, encoded| {
            let mut decoder = Decoder::new(info).unwrap();
            let mut output = vec![Color { r: 0, g: 0, b: 0 }; info.pixel_count()];
            b.iter(|| {
                decoder.decode(encoded, &mut output).unwrap();
                black_box(output[0])
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
