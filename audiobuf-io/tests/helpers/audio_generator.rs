//! Audio Test Fixture Generator
//!
//! Utilities for generating 16-bit PCM WAV files with a sine tone

use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f32,
    pub amplitude: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.0,
            sample_rate: 44100,
            channels: 1,
            frequency: 440.0,
            amplitude: 0.3,
        }
    }
}

impl AudioConfig {
    pub fn frames(&self) -> usize {
        (self.duration_seconds * self.sample_rate as f64) as usize
    }
}

/// Sample values written for frame `i` (same value on every channel)
pub fn tone_sample(config: &AudioConfig, i: usize) -> i16 {
    let t = i as f32 / config.sample_rate as f32;
    (config.amplitude * (2.0 * std::f32::consts::PI * config.frequency * t).sin() * i16::MAX as f32) as i16
}

/// Generate a test WAV file with specified configuration
///
/// # Arguments
/// * `path` - Output file path
/// * `config` - Audio configuration
///
/// # Returns
/// Generated file path
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;

    for i in 0..config.frames() {
        let sample = tone_sample(config, i);
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(path.to_path_buf())
}

/// Generate a WAV file with a valid header and no frames
pub fn generate_empty_wav(path: &Path) -> anyhow::Result<PathBuf> {
    let config = AudioConfig {
        duration_seconds: 0.0,
        ..AudioConfig::default()
    };
    generate_test_wav(path, &config)
}

/// Generate multiple test audio files in a directory
///
/// File `i` uses `base.sample_rate` and a tone of `base.frequency × (i + 1)`.
pub fn generate_test_library(dir: &Path, count: usize, base: &AudioConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for i in 0..count {
        let file_path = dir.join(format!("test_track_{:03}.wav", i + 1));
        let config = AudioConfig {
            frequency: base.frequency * (i + 1) as f32,
            ..base.clone()
        };
        generate_test_wav(&file_path, &config)?;
        files.push(file_path);
    }

    Ok(files)
}
