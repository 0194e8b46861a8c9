//! Identity read: decoded chunks go straight into the destination

use super::ReadOutcome;
use crate::audio::source::DecodeSource;
use crate::audio::types::AudioSample;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{trace, warn};

/// Copy every decoded frame into `dest` until the source ends or `dest` is full.
///
/// No padding is applied: `frames == padded_frames == frames read`.
///
/// # Errors
/// `Source` if a chunk read fails.
pub fn read_passthrough<T, S>(
    source: &mut S,
    dest: &mut [T],
    chunk_frames: usize,
    path: &Path,
) -> Result<ReadOutcome>
where
    T: AudioSample,
    S: DecodeSource<T> + ?Sized,
{
    let channels = source.channels();
    let capacity = dest.len() / channels;
    let mut total_read = 0usize;

    while total_read < capacity {
        let frames = chunk_frames.min(capacity - total_read);
        let region = &mut dest[total_read * channels..(total_read + frames) * channels];

        let read = source
            .read_chunk(region)
            .map_err(|kind| Error::source_error(kind, path))?;
        if read == 0 {
            break;
        }

        total_read += read;
        trace!("pass-through: {} of {} frames", total_read, capacity);
    }

    // Nominal length too short: report what was dropped
    if total_read == capacity {
        let mut probe = vec![T::default(); channels];
        if let Ok(extra) = source.read_chunk(&mut probe) {
            if extra > 0 {
                warn!(
                    "{} holds more frames than its declared {}; the excess is dropped",
                    path.display(),
                    capacity
                );
            }
        }
    }

    Ok(ReadOutcome {
        frames_read: total_read as u64,
        frames: total_read,
        padded_frames: total_read,
    })
}
