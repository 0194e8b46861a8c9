//! Core audio data types
//!
//! Defines the sample trait, the file format code and the metadata returned
//! alongside every decoded buffer.
//!
//! **Buffer layout:** all sample buffers are interleaved, `frames × channels`:
//! sample `c` of frame `f` lives at index `f * channels + c`.

use serde::{Deserialize, Serialize};
use std::fmt;
use symphonia::core::conv::ConvertibleSample;

/// Floating point sample type the reader can produce and the writer can consume.
///
/// Implemented for `f32` and `f64`. The bounds tie together what symphonia
/// needs for sample conversion and what rubato needs for resampling.
pub trait AudioSample:
    rubato::Sample + ConvertibleSample + Default + Copy + Send + Sync + fmt::Debug + 'static
{
    /// Widen to f64 (lossless for both implementations)
    fn as_f64(self) -> f64;
}

impl AudioSample for f32 {
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl AudioSample for f64 {
    fn as_f64(self) -> f64 {
        self
    }
}

/// Container ("major format") part of an [`AudioFormat`] code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Container {
    Wav = 0x01_0000,
    Aiff = 0x02_0000,
    Flac = 0x17_0000,
    Caf = 0x18_0000,
    Ogg = 0x20_0000,
    Mpeg = 0x23_0000,
    Mp4 = 0x40_0000,
    Matroska = 0x41_0000,
}

/// Encoding ("subtype") part of an [`AudioFormat`] code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Encoding {
    PcmS8 = 0x0001,
    Pcm16 = 0x0002,
    Pcm24 = 0x0003,
    Pcm32 = 0x0004,
    PcmU8 = 0x0005,
    Float = 0x0006,
    Double = 0x0007,
    Ulaw = 0x0010,
    Alaw = 0x0011,
    Vorbis = 0x0060,
    Opus = 0x0064,
    Alac = 0x0070,
    MpegLayerIII = 0x0082,
    Aac = 0x0090,
}

const CONTAINER_MASK: u32 = 0x0FFF_0000;
const ENCODING_MASK: u32 = 0x0000_FFFF;

impl Container {
    const ALL: [Container; 8] = [
        Container::Wav,
        Container::Aiff,
        Container::Flac,
        Container::Caf,
        Container::Ogg,
        Container::Mpeg,
        Container::Mp4,
        Container::Matroska,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| *c as u32 == code & CONTAINER_MASK)
    }

    /// Identify the container from the first bytes of a file.
    ///
    /// Needs at least 12 bytes for RIFF, AIFF and MP4; shorter headers only
    /// match the signatures they fully contain.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        let at = |offset: usize, magic: &[u8]| header.get(offset..offset + magic.len()) == Some(magic);

        if (at(0, b"RIFF") || at(0, b"RIFX") || at(0, b"RF64")) && at(8, b"WAVE") {
            Some(Container::Wav)
        } else if at(0, b"FORM") && (at(8, b"AIFF") || at(8, b"AIFC")) {
            Some(Container::Aiff)
        } else if at(0, b"fLaC") {
            Some(Container::Flac)
        } else if at(0, b"OggS") {
            Some(Container::Ogg)
        } else if at(0, b"caff") {
            Some(Container::Caf)
        } else if at(4, b"ftyp") {
            Some(Container::Mp4)
        } else if at(0, &[0x1A, 0x45, 0xDF, 0xA3]) {
            Some(Container::Matroska)
        } else if at(0, b"ID3") {
            Some(Container::Mpeg)
        } else {
            match header {
                // Frame sync with a non-zero layer (layer 0 is ADTS AAC)
                [0xFF, b, ..] if b & 0xE0 == 0xE0 && b & 0x06 != 0 => Some(Container::Mpeg),
                _ => None,
            }
        }
    }

    /// Guess the container from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Some(Container::Wav),
            "aif" | "aiff" | "aifc" => Some(Container::Aiff),
            "flac" => Some(Container::Flac),
            "caf" => Some(Container::Caf),
            "ogg" | "oga" | "opus" => Some(Container::Ogg),
            "mp1" | "mp2" | "mp3" => Some(Container::Mpeg),
            "m4a" | "mp4" | "m4b" => Some(Container::Mp4),
            "mka" | "mkv" | "webm" => Some(Container::Matroska),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Container::Wav => "WAV",
            Container::Aiff => "AIFF",
            Container::Flac => "FLAC",
            Container::Caf => "CAF",
            Container::Ogg => "OGG",
            Container::Mpeg => "MPEG",
            Container::Mp4 => "MP4",
            Container::Matroska => "MATROSKA",
        }
    }
}

impl Encoding {
    const ALL: [Encoding; 14] = [
        Encoding::PcmS8,
        Encoding::Pcm16,
        Encoding::Pcm24,
        Encoding::Pcm32,
        Encoding::PcmU8,
        Encoding::Float,
        Encoding::Double,
        Encoding::Ulaw,
        Encoding::Alaw,
        Encoding::Vorbis,
        Encoding::Opus,
        Encoding::Alac,
        Encoding::MpegLayerIII,
        Encoding::Aac,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|e| *e as u32 == code & ENCODING_MASK)
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::PcmS8 => "PCM_S8",
            Encoding::Pcm16 => "PCM_16",
            Encoding::Pcm24 => "PCM_24",
            Encoding::Pcm32 => "PCM_32",
            Encoding::PcmU8 => "PCM_U8",
            Encoding::Float => "FLOAT",
            Encoding::Double => "DOUBLE",
            Encoding::Ulaw => "ULAW",
            Encoding::Alaw => "ALAW",
            Encoding::Vorbis => "VORBIS",
            Encoding::Opus => "OPUS",
            Encoding::Alac => "ALAC",
            Encoding::MpegLayerIII => "MPEG_LAYER_III",
            Encoding::Aac => "AAC",
        }
    }
}

/// Opaque file format code: container in the high bits, encoding in the low 16 bits.
///
/// A code of `0` means "unknown" and is rejected when a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioFormat(u32);

impl AudioFormat {
    pub const UNKNOWN: AudioFormat = AudioFormat(0);

    pub fn new(container: Container, encoding: Encoding) -> Self {
        AudioFormat(container as u32 | encoding as u32)
    }

    pub fn from_code(code: u32) -> Self {
        AudioFormat(code)
    }

    pub fn code(self) -> u32 {
        self.0
    }

    pub fn container(self) -> Option<Container> {
        Container::from_code(self.0)
    }

    pub fn encoding(self) -> Option<Encoding> {
        Encoding::from_code(self.0)
    }

    pub fn is_known(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.container(), self.encoding()) {
            (Some(c), Some(e)) => write!(f, "{}/{}", c.name(), e.name()),
            (Some(c), None) => write!(f, "{}", c.name()),
            _ => write!(f, "unknown (0x{:06x})", self.0),
        }
    }
}

/// Metadata returned with every decoded buffer.
///
/// - `frames`: frames actually produced
/// - `padded_frames`: frames in the returned buffer (`>= frames` when padding applied)
/// - `sample_rate`: rate of the returned samples (the target rate when resampled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioMetadata {
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    pub padded_frames: usize,
    pub format: AudioFormat,
}

impl AudioMetadata {
    /// Number of samples in the returned buffer
    pub fn padded_samples(&self) -> usize {
        self.padded_frames * self.channels
    }

    /// Get duration in seconds of the produced frames
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}
