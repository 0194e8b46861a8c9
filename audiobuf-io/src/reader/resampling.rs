//! Streaming decode-and-resample loop
//!
//! Pulls bounded chunks from a [`DecodeSource`], pushes them through a
//! [`StreamingResampler`] and writes the output directly into a destination
//! that was sized once, up front, from the nominal frame count.
//!
//! ```text
//! Streaming --(source returns 0)--> Flushing --(produced == 0)--> Done
//!     |                                 |
//!     +------------ Failed <------------+
//! ```
//!
//! Capacity rules:
//! - Capacity exhausted while still streaming: the estimate was too small,
//!   `Internal` error.
//! - Capacity exhausted once the source ended: fine if the resampler is
//!   drained, otherwise `Internal` error (output would be silently lost).
//! - A resampler reporting more output than the region it was given:
//!   `Internal` error.
//!
//! The resampler is owned by the reader and dropped on every exit path.

use super::ReadOutcome;
use crate::audio::resampler::StreamingResampler;
use crate::audio::source::DecodeSource;
use crate::audio::types::AudioSample;
use crate::error::{Error, Result};
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Source still has input
    Streaming,
    /// Source exhausted, draining the resampler
    Flushing,
}

/// Number of output frames for `input_frames` at the given rates, rounded up
pub fn scaled_frames_ceil(input_frames: u64, input_rate: u32, output_rate: u32) -> u64 {
    let numerator = input_frames as u128 * output_rate as u128;
    let denominator = input_rate as u128;
    numerator.div_ceil(denominator) as u64
}

/// One resampled read of one source.
pub struct ResamplingReader<T, R> {
    resampler: R,
    input_rate: u32,
    output_rate: u32,
    chunk_frames: usize,
    padding: bool,
    _sample: PhantomData<T>,
}

impl<T, R> ResamplingReader<T, R>
where
    T: AudioSample,
    R: StreamingResampler<T>,
{
    pub fn new(resampler: R, input_rate: u32, output_rate: u32, chunk_frames: usize, padding: bool) -> Self {
        Self {
            resampler,
            input_rate,
            output_rate,
            chunk_frames,
            padding,
            _sample: PhantomData,
        }
    }

    /// Drive `source` through the resampler into `dest`.
    ///
    /// `dest.len() / channels` is the capacity in frames; nothing is ever
    /// written past it. On success the first `padded_frames` frames of `dest`
    /// are valid.
    ///
    /// # Errors
    /// - `Source`: a chunk read failed
    /// - `Resample`: the resampler failed
    /// - `Internal`: the capacity estimate was violated
    pub fn run<S>(mut self, source: &mut S, dest: &mut [T], path: &Path) -> Result<ReadOutcome>
    where
        S: DecodeSource<T> + ?Sized,
    {
        let channels = source.channels();
        let capacity = dest.len() / channels;
        let mut chunk = vec![T::default(); self.chunk_frames * channels];

        let mut phase = Phase::Streaming;
        let mut total_read: u64 = 0;
        let mut total_generated: usize = 0;

        debug!(
            "Resampling {} -> {} Hz into {} frames of capacity",
            self.input_rate, self.output_rate, capacity
        );

        loop {
            let frames_in = match phase {
                Phase::Streaming => {
                    let read = source
                        .read_chunk(&mut chunk)
                        .map_err(|kind| Error::source_error(kind, path))?;
                    if read == 0 {
                        debug!(
                            "Source exhausted after {} frames, flushing ({} generated)",
                            total_read, total_generated
                        );
                        phase = Phase::Flushing;
                    }
                    read
                }
                Phase::Flushing => 0,
            };
            total_read += frames_in as u64;

            let remaining = capacity - total_generated;
            if remaining == 0 {
                match phase {
                    Phase::Streaming => {
                        return Err(Error::internal(
                            "Output buffer insufficient based on estimate",
                            path,
                        ))
                    }
                    Phase::Flushing if self.resampler.is_drained() => break,
                    Phase::Flushing => {
                        return Err(Error::internal(
                            "Output buffer insufficient based on estimate while flushing",
                            path,
                        ))
                    }
                }
            }

            let input = match phase {
                Phase::Streaming => Some(&chunk[..frames_in * channels]),
                Phase::Flushing => None,
            };
            let (consumed, produced) = self
                .resampler
                .process(input, &mut dest[total_generated * channels..])
                .map_err(|e| Error::resample(e.to_string(), path))?;

            total_generated += produced;
            trace!(
                "process: phase={:?}, in={}, consumed={}, produced={}, generated={}",
                phase,
                frames_in,
                consumed,
                produced,
                total_generated
            );

            if total_generated > capacity {
                return Err(Error::internal("Output buffer overflow after process", path));
            }

            if phase == Phase::Flushing && produced == 0 {
                break;
            }
        }

        let padded_frames = self.pad(dest, channels, capacity, total_read, total_generated, path)?;

        Ok(ReadOutcome {
            frames_read: total_read,
            frames: total_generated,
            padded_frames,
        })
    }

    /// Zero-fill up to the length implied by the frames actually read.
    ///
    /// Returns the padded frame count.
    fn pad(
        &self,
        dest: &mut [T],
        channels: usize,
        capacity: usize,
        total_read: u64,
        total_generated: usize,
        path: &Path,
    ) -> Result<usize> {
        let accurate = scaled_frames_ceil(total_read, self.input_rate, self.output_rate);

        if !self.padding || total_generated as u64 >= accurate {
            return Ok(total_generated);
        }

        if accurate > capacity as u64 {
            return Err(Error::internal(
                format!(
                    "Output buffer insufficient for padding: need {} frames, have {}",
                    accurate, capacity
                ),
                path,
            ));
        }

        let accurate = accurate as usize;
        dest[total_generated * channels..accurate * channels].fill(T::default());
        warn!(
            "Padded {} with {} frames of silence ({} generated, {} expected)",
            path.display(),
            accurate - total_generated,
            total_generated,
            accurate
        );
        Ok(accurate)
    }
}
