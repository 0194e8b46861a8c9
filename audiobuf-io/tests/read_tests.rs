//! Whole-file read tests against generated WAV fixtures and mock sources

mod helpers;

use audiobuf_io::{
    read_audio, Container, Encoding, Error, ErrorCategory, ReadOptions, Reader, ResampleQuality,
    SourceErrorKind,
};
use helpers::audio_generator::tone_sample;
use helpers::{generate_empty_wav, generate_test_wav, AudioConfig, MockSource};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_native_rate_read_is_exact() {
    let temp_dir = TempDir::new().unwrap();
    let config = AudioConfig {
        duration_seconds: 0.5,
        sample_rate: 48000,
        channels: 2,
        ..AudioConfig::default()
    };
    let path = generate_test_wav(&temp_dir.path().join("native.wav"), &config).unwrap();

    // Same rate requested explicitly: still no resampling
    let options = ReadOptions::default().with_sample_rate(48000);
    let (samples, metadata) = read_audio::<f32>(&path, options).unwrap();

    assert_eq!(metadata.frames, 24000);
    assert_eq!(metadata.padded_frames, metadata.frames);
    assert_eq!(metadata.channels, 2);
    assert_eq!(metadata.sample_rate, 48000);
    assert_eq!(metadata.format.container(), Some(Container::Wav));
    assert_eq!(metadata.format.encoding(), Some(Encoding::Pcm16));
    assert_eq!(samples.len(), 48000);

    for frame in [0, 1, 100, 12345, 23999] {
        let expected = tone_sample(&config, frame) as f32 / 32768.0;
        assert_eq!(samples[frame * 2], expected);
        assert_eq!(samples[frame * 2 + 1], expected);
    }
}

#[test]
fn test_quality_none_never_resamples() {
    let temp_dir = TempDir::new().unwrap();
    let path = generate_test_wav(&temp_dir.path().join("a.wav"), &AudioConfig::default()).unwrap();

    let options = ReadOptions::default()
        .with_sample_rate(16000)
        .with_quality(ResampleQuality::None);
    let (_, metadata) = read_audio::<f32>(&path, options).unwrap();

    assert_eq!(metadata.sample_rate, 44100);
    assert_eq!(metadata.frames, 44100);
}

#[test]
fn test_one_second_downsample_to_22050() {
    let temp_dir = TempDir::new().unwrap();
    let path = generate_test_wav(&temp_dir.path().join("tone.wav"), &AudioConfig::default()).unwrap();

    let options = ReadOptions::default()
        .with_sample_rate(22050)
        .with_quality(ResampleQuality::Medium);
    let (samples, metadata) = read_audio::<f32>(&path, options).unwrap();

    assert_eq!(metadata.channels, 1);
    assert_eq!(metadata.sample_rate, 22050);
    assert!(metadata.frames.abs_diff(22050) <= 1, "frames = {}", metadata.frames);
    assert!(metadata.padded_frames >= metadata.frames);
    assert_eq!(samples.len(), metadata.padded_frames);

    // The tone survives: peak close to the generated amplitude
    let peak = samples[1000..21000].iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!((peak - 0.3).abs() < 0.03, "peak = {}", peak);
}

#[test]
fn test_upsample_as_f64() {
    let temp_dir = TempDir::new().unwrap();
    let config = AudioConfig {
        duration_seconds: 0.25,
        sample_rate: 22050,
        channels: 2,
        ..AudioConfig::default()
    };
    let path = generate_test_wav(&temp_dir.path().join("low.wav"), &config).unwrap();

    let options = ReadOptions::default().with_sample_rate(44100);
    let (samples, metadata) = read_audio::<f64>(&path, options).unwrap();

    assert_eq!(metadata.sample_rate, 44100);
    assert!(metadata.frames.abs_diff(11025) <= 1);
    assert_eq!(samples.len(), metadata.padded_frames * 2);
}

#[test]
fn test_padding_is_silence() {
    let temp_dir = TempDir::new().unwrap();
    let config = AudioConfig {
        duration_seconds: 0.1,
        ..AudioConfig::default()
    };
    let path = generate_test_wav(&temp_dir.path().join("short.wav"), &config).unwrap();

    let options = ReadOptions::default().with_sample_rate(48000);
    let (samples, metadata) = read_audio::<f32>(&path, options).unwrap();

    assert!(metadata.padded_frames >= metadata.frames);
    assert!(samples[metadata.frames..metadata.padded_frames].iter().all(|s| *s == 0.0));
}

#[test]
fn test_inexact_nominal_count_pads_from_frames_read() {
    // 2-channel source that decodes 30000 frames but declares 36000
    let mut source = MockSource::new(30000, 2, 48000).with_nominal_frames(36000);
    let reader = Reader::new(ReadOptions::default().with_sample_rate(24000));

    let (samples, metadata) = reader
        .process_source::<f32, _>(&mut source, Path::new("inexact.mp3"))
        .unwrap();

    assert_eq!(metadata.channels, 2);
    assert!(metadata.frames <= 15000);
    // ceil(30000 × 24000 / 48000), not the 18000 implied by the nominal count
    assert_eq!(metadata.padded_frames, 15000);
    assert_eq!(samples.len(), 30000);
}

#[test]
fn test_understated_nominal_count_is_internal_error() {
    let mut source = MockSource::new(40000, 2, 48000).with_nominal_frames(20000);
    let reader = Reader::new(ReadOptions::default().with_sample_rate(24000));

    let err = reader
        .process_source::<f32, _>(&mut source, Path::new("understated.mp3"))
        .unwrap_err();

    assert!(matches!(err, Error::Internal { .. }), "{}", err);
    assert_eq!(err.category(), ErrorCategory::Internal);
    assert_eq!(err.path(), Path::new("understated.mp3"));
}

#[test]
fn test_empty_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = generate_empty_wav(&temp_dir.path().join("empty.wav")).unwrap();

    let err = read_audio::<f32>(&path, ReadOptions::default()).unwrap_err();

    assert!(matches!(err, Error::Source { .. }), "{}", err);
    assert_eq!(err.category(), ErrorCategory::InvalidFormat);
    assert_eq!(err.path(), path.as_path());
}

#[test]
fn test_missing_file() {
    let err = read_audio::<f32>("/nonexistent/audio.wav", ReadOptions::default()).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::FileNotFound);
    assert!(err.to_string().contains("/nonexistent/audio.wav"));
}

#[test]
fn test_not_an_audio_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("notes.wav");
    std::fs::write(&path, "definitely not RIFF data").unwrap();

    let err = read_audio::<f32>(&path, ReadOptions::default()).unwrap_err();

    assert!(matches!(
        err,
        Error::Source {
            kind: SourceErrorKind::UnrecognisedFormat(_),
            ..
        }
    ));
    assert_eq!(err.category(), ErrorCategory::InvalidFormat);
}

#[test]
fn test_container_detected_from_contents_not_name() {
    let temp_dir = TempDir::new().unwrap();
    let config = AudioConfig::default();

    for name in ["clip.dat", "clip", "clip.mp3"] {
        let path = generate_test_wav(&temp_dir.path().join(name), &config).unwrap();

        let (samples, metadata) = read_audio::<f32>(&path, ReadOptions::default()).unwrap();

        assert_eq!(metadata.format.container(), Some(Container::Wav), "{}", name);
        assert_eq!(metadata.format.encoding(), Some(Encoding::Pcm16), "{}", name);
        assert_eq!(metadata.frames, 44100, "{}", name);

        // The reported format is writable as-is
        let copy = temp_dir.path().join(format!("{}.copy", name));
        audiobuf_io::write_audio(&copy, &samples, &metadata).unwrap();
    }
}
