//! In-memory decode source with a configurable nominal frame count
//!
//! Stands in for compressed files whose declared length differs from what
//! actually decodes.

use audiobuf_io::audio::source::DecodeSource;
use audiobuf_io::{AudioFormat, Container, Encoding, SourceErrorKind};

pub struct MockSource {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
    nominal_frames: u64,
    format: AudioFormat,
    pos: usize,
}

impl MockSource {
    /// `frames` frames of a slow ramp, reported as exactly `frames` long
    pub fn new(frames: usize, channels: usize, sample_rate: u32) -> Self {
        let samples = (0..frames * channels)
            .map(|i| ((i / channels) % 2000) as f32 / 4000.0)
            .collect();
        Self {
            samples,
            channels,
            sample_rate,
            nominal_frames: frames as u64,
            format: AudioFormat::new(Container::Mpeg, Encoding::MpegLayerIII),
            pos: 0,
        }
    }

    pub fn with_nominal_frames(mut self, frames: u64) -> Self {
        self.nominal_frames = frames;
        self
    }
}

impl DecodeSource<f32> for MockSource {
    fn frames(&self) -> u64 {
        self.nominal_frames
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_chunk(&mut self, dst: &mut [f32]) -> Result<usize, SourceErrorKind> {
        let total = self.samples.len() / self.channels;
        let frames = (dst.len() / self.channels).min(total - self.pos);
        let start = self.pos * self.channels;
        dst[..frames * self.channels].copy_from_slice(&self.samples[start..start + frames * self.channels]);
        self.pos += frames;
        Ok(frames)
    }
}
