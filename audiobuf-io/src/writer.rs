//! Single-shot write of an in-memory buffer
//!
//! The buffer layout is the one the reader returns (interleaved). Output goes
//! through hound, so only the WAV container is supported; integer encodings
//! are quantized with round-to-nearest and clamped, which makes a PCM
//! read → write → read cycle bit-identical.

use crate::audio::types::{AudioFormat, AudioMetadata, AudioSample, Container, Encoding};
use crate::error::{Error, Result, SourceErrorKind};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info, warn};

/// Encodings the writer can produce
pub const SUPPORTED_ENCODINGS: [Encoding; 6] = [
    Encoding::PcmS8,
    Encoding::PcmU8,
    Encoding::Pcm16,
    Encoding::Pcm24,
    Encoding::Pcm32,
    Encoding::Float,
];

/// Open WAV file accepting interleaved frames
struct WavSink {
    writer: WavWriter<BufWriter<File>>,
    encoding: Encoding,
    channels: usize,
    last_error: Option<SourceErrorKind>,
}

impl WavSink {
    fn create(path: &Path, format: AudioFormat, channels: usize, sample_rate: u32) -> std::result::Result<Self, SourceErrorKind> {
        match format.container() {
            Some(Container::Wav) => {}
            _ => {
                return Err(SourceErrorKind::UnrecognisedFormat(format!(
                    "cannot write container of {}",
                    format
                )))
            }
        }

        let encoding = format
            .encoding()
            .filter(|e| SUPPORTED_ENCODINGS.contains(e))
            .ok_or_else(|| SourceErrorKind::UnsupportedEncoding(format!("cannot write {}", format)))?;

        let channels_u16 = u16::try_from(channels)
            .map_err(|_| SourceErrorKind::MalformedFile(format!("{} channels", channels)))?;

        let (bits_per_sample, sample_format) = match encoding {
            Encoding::PcmS8 | Encoding::PcmU8 => (8, SampleFormat::Int),
            Encoding::Pcm16 => (16, SampleFormat::Int),
            Encoding::Pcm24 => (24, SampleFormat::Int),
            Encoding::Pcm32 => (32, SampleFormat::Int),
            _ => (32, SampleFormat::Float),
        };

        let spec = WavSpec {
            channels: channels_u16,
            sample_rate,
            bits_per_sample,
            sample_format,
        };

        let writer = WavWriter::create(path, spec).map_err(|e| SourceErrorKind::System(e.to_string()))?;

        Ok(Self {
            writer,
            encoding,
            channels,
            last_error: None,
        })
    }

    /// Write up to `nframes` frames from `src`; returns the frames fully written
    fn write_frames<T: AudioSample>(&mut self, src: &[T], nframes: usize) -> usize {
        let frames = nframes.min(src.len() / self.channels);

        for (index, frame) in src.chunks_exact(self.channels).take(frames).enumerate() {
            for sample in frame {
                if let Err(e) = self.write_sample(sample.as_f64()) {
                    self.last_error = Some(SourceErrorKind::System(e.to_string()));
                    return index;
                }
            }
        }
        frames
    }

    fn write_sample(&mut self, value: f64) -> std::result::Result<(), hound::Error> {
        match self.encoding {
            Encoding::PcmS8 | Encoding::PcmU8 => self.writer.write_sample(quantize(value, 8) as i8),
            Encoding::Pcm16 => self.writer.write_sample(quantize(value, 16) as i16),
            Encoding::Pcm24 => self.writer.write_sample(quantize(value, 24) as i32),
            Encoding::Pcm32 => self.writer.write_sample(quantize(value, 32) as i32),
            _ => self.writer.write_sample(value as f32),
        }
    }

    fn last_error(&self) -> Option<&SourceErrorKind> {
        self.last_error.as_ref()
    }

    fn finalize(self) -> std::result::Result<(), SourceErrorKind> {
        self.writer
            .finalize()
            .map_err(|e| SourceErrorKind::System(e.to_string()))
    }
}

/// Remove the output of a failed write
fn discard_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Failed to remove partial output {}: {}", path.display(), e);
    }
}

/// Scale a [-1, 1) float to a signed integer of `bits` bits
fn quantize(value: f64, bits: u32) -> i64 {
    let scale = (1i64 << (bits - 1)) as f64;
    let max = (1i64 << (bits - 1)) - 1;
    let min = -(1i64 << (bits - 1));
    ((value * scale).round() as i64).clamp(min, max)
}

/// Write `metadata.frames` interleaved frames of `samples` to a new file.
///
/// # Arguments
/// * `path` - File to create (overwritten if present)
/// * `samples` - Interleaved samples, at least `frames × channels` long
/// * `metadata` - Frame count, channels, rate and the output format code
///
/// # Errors
/// `Source` if the format cannot be written, the file cannot be created, or
/// fewer than `metadata.frames` frames reach the file.
pub fn write_audio<T: AudioSample>(path: impl AsRef<Path>, samples: &[T], metadata: &AudioMetadata) -> Result<()> {
    let path = path.as_ref();

    if metadata.channels == 0 {
        return Err(Error::source_error(
            SourceErrorKind::MalformedFile("channel count is not positive".to_string()),
            path,
        ));
    }
    if metadata.sample_rate == 0 {
        return Err(Error::source_error(
            SourceErrorKind::MalformedFile("sample rate is not positive".to_string()),
            path,
        ));
    }

    debug!(
        "Writing {}: {} frames, {} channels, {} Hz, {}",
        path.display(),
        metadata.frames,
        metadata.channels,
        metadata.sample_rate,
        metadata.format
    );

    let mut sink = WavSink::create(path, metadata.format, metadata.channels, metadata.sample_rate)
        .map_err(|kind| Error::source_error(kind, path))?;

    let written = sink.write_frames(samples, metadata.frames);
    if written != metadata.frames {
        let kind = sink.last_error().cloned().unwrap_or(SourceErrorKind::ShortWrite {
            expected: metadata.frames,
            written,
        });
        drop(sink);
        discard_partial(path);
        return Err(Error::source_error(kind, path));
    }

    if let Err(kind) = sink.finalize() {
        discard_partial(path);
        return Err(Error::source_error(kind, path));
    }

    info!("Wrote {} frames to {}", written, path.display());
    Ok(())
}
