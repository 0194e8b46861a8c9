//! Audio decoding and sample-rate conversion

pub mod resampler;
pub mod source;
pub mod types;

pub use resampler::{RubatoResampler, ResamplerError, StreamingResampler};
pub use source::{DecodeSource, SymphoniaSource};
pub use types::{AudioFormat, AudioMetadata, AudioSample, Container, Encoding};
