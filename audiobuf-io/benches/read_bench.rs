//! Read Performance Benchmark
//!
//! Measures whole-file read throughput, with and without resampling.
//!
//! ## Scenarios
//!
//! - Native rate (pass-through): decode only
//! - 48000 Hz → 44100 Hz at every enabled quality preset
//! - 44100 Hz → 16000 Hz (typical ML front end)

use audiobuf_io::{read_audio, ReadOptions, ResampleQuality};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DURATION_S: u32 = 10;

/// Write a stereo 16-bit sine fixture
fn generate_fixture(dir: &Path, sample_rate: u32) -> PathBuf {
    let path = dir.join(format!("fixture_{}.wav", sample_rate));
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&path, spec).expect("Failed to create fixture");
    for i in 0..sample_rate * DURATION_S {
        let t = i as f32 / sample_rate as f32;
        let sample = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
        writer.write_sample(sample).expect("Failed to write sample");
        writer.write_sample(sample).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize fixture");
    path
}

fn bench_passthrough(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = generate_fixture(dir.path(), 44100);

    let mut group = c.benchmark_group("read_passthrough");
    group.throughput(Throughput::Elements((DURATION_S * 1000) as u64)); // ms of audio
    group.sample_size(20);

    group.bench_function("44100_stereo_f32", |b| {
        b.iter(|| {
            let result = read_audio::<f32>(black_box(&path), ReadOptions::default()).expect("read failed");
            black_box(result)
        });
    });

    group.finish();
}

fn bench_resample_qualities(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = generate_fixture(dir.path(), 48000);

    let mut group = c.benchmark_group("read_resample_48k_to_44k");
    group.throughput(Throughput::Elements((DURATION_S * 1000) as u64));
    group.sample_size(10);

    for quality in ResampleQuality::ALL.into_iter().filter(|q| q.is_enabled()) {
        let options = ReadOptions::default().with_sample_rate(44100).with_quality(quality);
        group.bench_with_input(BenchmarkId::from_parameter(quality), &options, |b, options| {
            b.iter(|| {
                let result = read_audio::<f32>(black_box(&path), *options).expect("read failed");
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_downsample_16k(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = generate_fixture(dir.path(), 44100);

    let mut group = c.benchmark_group("read_resample_44k_to_16k");
    group.throughput(Throughput::Elements((DURATION_S * 1000) as u64));
    group.sample_size(10);

    group.bench_function("high_f32", |b| {
        let options = ReadOptions::default().with_sample_rate(16000);
        b.iter(|| {
            let result = read_audio::<f32>(black_box(&path), options).expect("read failed");
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_passthrough, bench_resample_qualities, bench_downsample_16k);
criterion_main!(benches);
