//! Whole-file reader
//!
//! [`Reader`] opens a source, validates its nominal metadata, sizes the
//! destination once and runs one of two strategies:
//! - pass-through when no rate conversion is needed
//! - streaming resample otherwise
//!
//! The returned buffer is interleaved and holds `padded_frames × channels`
//! samples.

pub mod passthrough;
pub mod resampling;

use crate::audio::resampler::RubatoResampler;
use crate::audio::source::{DecodeSource, SymphoniaSource};
use crate::audio::types::{AudioMetadata, AudioSample};
use crate::error::{Error, Result, SourceErrorKind};
use crate::native::{Detached, HostRuntime, NativeSection};
use audiobuf_common::config::{ReadSettings, DEFAULT_CHUNK_FRAMES};
use audiobuf_common::ResampleQuality;
use passthrough::read_passthrough;
use resampling::{scaled_frames_ceil, ResamplingReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Options for one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Output rate; `None` or `Some(0)` keeps the native rate
    pub target_sample_rate: Option<u32>,
    pub quality: ResampleQuality,
    /// Zero-fill up to the length implied by the frames read
    pub padding: bool,
    /// Frames requested from the source per read
    pub chunk_frames: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            target_sample_rate: None,
            quality: ResampleQuality::default(),
            padding: true,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}

impl From<&ReadSettings> for ReadOptions {
    fn from(settings: &ReadSettings) -> Self {
        Self {
            target_sample_rate: settings.sample_rate,
            quality: settings.quality,
            padding: settings.padding,
            chunk_frames: settings.chunk_frames,
        }
    }
}

impl ReadOptions {
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = Some(rate);
        self
    }

    pub fn with_quality(mut self, quality: ResampleQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }
}

/// How a file will be read, decided once per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    PassThrough,
    Resample { target_rate: u32 },
}

impl ReadStrategy {
    pub fn select(options: &ReadOptions, native_rate: u32) -> Self {
        if !options.quality.is_enabled() {
            return ReadStrategy::PassThrough;
        }
        match options.target_sample_rate {
            None | Some(0) => ReadStrategy::PassThrough,
            Some(rate) if rate == native_rate => ReadStrategy::PassThrough,
            Some(rate) => ReadStrategy::Resample { target_rate: rate },
        }
    }
}

/// Counters reported by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Frames pulled from the source
    pub frames_read: u64,
    /// Frames produced into the destination
    pub frames: usize,
    /// Valid frames in the destination, including padding
    pub padded_frames: usize,
}

/// Output frames to allocate for a read.
///
/// Rounded up so a resampler honouring its ratio always fits.
pub fn estimate_output_frames(nominal_frames: u64, input_rate: u32, output_rate: u32) -> u64 {
    scaled_frames_ceil(nominal_frames, input_rate, output_rate)
}

/// Reads whole files into sample buffers
#[derive(Clone)]
pub struct Reader {
    options: ReadOptions,
    host: Arc<dyn HostRuntime>,
}

impl Reader {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            host: Arc::new(Detached),
        }
    }

    /// Reader that releases `host` around each decode loop
    pub fn with_host(options: ReadOptions, host: Arc<dyn HostRuntime>) -> Self {
        Self { options, host }
    }

    /// Decode (and optionally resample) a whole file.
    ///
    /// # Arguments
    /// * `path` - Audio file to read
    ///
    /// # Returns
    /// Interleaved samples (`padded_frames × channels`) and their metadata
    ///
    /// # Errors
    /// - `Source`: open/decode failure or malformed nominal metadata
    /// - `Resample`: converter creation or processing failure
    /// - `Internal`: output capacity estimate violated
    pub fn process<T: AudioSample>(&self, path: impl AsRef<Path>) -> Result<(Vec<T>, AudioMetadata)> {
        let path = path.as_ref();
        let mut source = SymphoniaSource::<T>::open(path).map_err(|kind| Error::source_error(kind, path))?;
        self.process_source(&mut source, path)
    }

    /// Same as [`Reader::process`] for an already opened source.
    ///
    /// `path` is only used for error reporting and logging.
    pub fn process_source<T, S>(&self, source: &mut S, path: &Path) -> Result<(Vec<T>, AudioMetadata)>
    where
        T: AudioSample,
        S: DecodeSource<T> + ?Sized,
    {
        validate_source::<T, S>(source, path)?;

        let channels = source.channels();
        let native_rate = source.sample_rate();
        let format = source.format();
        let nominal_frames = source.frames();
        let chunk_frames = self.options.chunk_frames.max(1);

        let strategy = ReadStrategy::select(&self.options, native_rate);
        debug!(
            "Reading {}: {} frames, {} channels, {} Hz, {} ({:?})",
            path.display(),
            nominal_frames,
            channels,
            native_rate,
            format,
            strategy
        );

        let (mut buffer, outcome, sample_rate) = match strategy {
            ReadStrategy::PassThrough => {
                let mut buffer = allocate::<T>(nominal_frames, channels, path)?;
                let outcome = {
                    let _section = NativeSection::enter(self.host.clone());
                    read_passthrough(source, &mut buffer, chunk_frames, path)?
                };
                (buffer, outcome, native_rate)
            }
            ReadStrategy::Resample { target_rate } => {
                let resampler = RubatoResampler::<T>::new(native_rate, target_rate, channels, self.options.quality)
                    .map_err(|e| Error::resample(e.to_string(), path))?;

                let estimated = estimate_output_frames(nominal_frames, native_rate, target_rate);
                let mut buffer = allocate::<T>(estimated, channels, path)?;

                let reader = ResamplingReader::new(resampler, native_rate, target_rate, chunk_frames, self.options.padding);
                let outcome = {
                    let _section = NativeSection::enter(self.host.clone());
                    reader.run(source, &mut buffer, path)?
                };
                (buffer, outcome, target_rate)
            }
        };

        let metadata = AudioMetadata {
            frames: outcome.frames,
            channels,
            sample_rate,
            padded_frames: outcome.padded_frames,
            format,
        };
        buffer.truncate(metadata.padded_samples());

        info!(
            "Read {}: {} frames ({} padded) at {} Hz",
            path.display(),
            metadata.frames,
            metadata.padded_frames,
            metadata.sample_rate
        );

        Ok((buffer, metadata))
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new(ReadOptions::default())
    }
}

/// Reject sources whose nominal frames, channels, rate or format are not positive
fn validate_source<T, S>(source: &S, path: &Path) -> Result<()>
where
    T: AudioSample,
    S: DecodeSource<T> + ?Sized,
{
    let malformed = |field: &str| {
        Err(Error::source_error(
            SourceErrorKind::MalformedFile(format!("{} is not positive", field)),
            path,
        ))
    };

    if source.frames() == 0 {
        return malformed("frame count");
    }
    if source.channels() == 0 {
        return malformed("channel count");
    }
    if source.sample_rate() == 0 {
        return malformed("sample rate");
    }
    if !source.format().is_known() {
        return malformed("format");
    }
    Ok(())
}

/// Allocate the destination once
fn allocate<T: AudioSample>(frames: u64, channels: usize, path: &Path) -> Result<Vec<T>> {
    let samples = usize::try_from(frames)
        .ok()
        .and_then(|f| f.checked_mul(channels))
        .ok_or_else(|| {
            Error::internal(
                format!("Output buffer of {} frames × {} channels is too large", frames, channels),
                path,
            )
        })?;
    Ok(vec![T::default(); samples])
}
