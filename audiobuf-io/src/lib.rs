//! # audiobuf I/O Library (audiobuf-io)
//!
//! Decodes audio files into flat sample buffers, optionally converting the
//! sample rate in a single streaming pass, and writes buffers back to disk.
//!
//! **Architecture:** symphonia (decode) + rubato (resample) + hound (write)
//!
//! **Buffer layout:** interleaved, `frames × channels`. The buffer returned by
//! a read holds `padded_frames × channels` samples and is allocated exactly
//! once, before the first sample is decoded.
//!
//! ```no_run
//! use audiobuf_io::{read_audio, ReadOptions};
//!
//! # fn main() -> audiobuf_io::Result<()> {
//! let options = ReadOptions::default().with_sample_rate(22050);
//! let (_samples, metadata) = read_audio::<f32>("input.mp3", options)?;
//! println!("{} frames at {} Hz", metadata.frames, metadata.sample_rate);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod error;
pub mod native;
pub mod reader;
pub mod writer;

pub use audio::types::{AudioFormat, AudioMetadata, AudioSample, Container, Encoding};
pub use audiobuf_common::ResampleQuality;
pub use error::{Error, ErrorCategory, Result, SourceErrorKind};
pub use native::{Detached, HostRuntime, NativeSection};
pub use reader::{ReadOptions, ReadStrategy, Reader};
pub use writer::write_audio;

use std::path::Path;

/// Read a whole file with the given options.
///
/// Shorthand for `Reader::new(options).process(path)`.
pub fn read_audio<T: AudioSample>(path: impl AsRef<Path>, options: ReadOptions) -> Result<(Vec<T>, AudioMetadata)> {
    Reader::new(options).process(path)
}
