//! Decoded audio sources
//!
//! [`DecodeSource`] is the contract the readers pull from: nominal metadata
//! plus bounded chunks of interleaved samples. [`SymphoniaSource`] implements
//! it on top of symphonia's probe, format reader and codec registry.
//!
//! # Nominal frame count
//!
//! Taken from the track's codec parameters. Containers that do not declare a
//! length (MP3 without a Xing/Info header, some Ogg streams) get a demux-only
//! scan summing packet durations. That value is an estimate: it includes
//! encoder delay and padding, so callers must not treat it as exact.

use crate::audio::types::{AudioFormat, AudioSample, Container, Encoding};
use crate::error::SourceErrorKind;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{self, CodecParameters, CodecType, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace, warn};

/// A file opened for decoding.
///
/// Metadata accessors report *nominal* values, possibly inaccurate for
/// compressed formats. A value of 0 means the container did not provide it.
pub trait DecodeSource<T: AudioSample> {
    /// Nominal number of frames
    fn frames(&self) -> u64;

    /// Number of interleaved channels
    fn channels(&self) -> usize;

    /// Native sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Container/encoding code
    fn format(&self) -> AudioFormat;

    /// Decode up to `dst.len() / channels()` frames into `dst` (interleaved).
    ///
    /// Returns the number of frames written; 0 means end of stream.
    fn read_chunk(&mut self, dst: &mut [T]) -> Result<usize, SourceErrorKind>;

    /// Error recorded by the most recent failing call, if any
    fn last_error(&self) -> Option<&SourceErrorKind> {
        None
    }
}

/// Audio file decoder using symphonia
pub struct SymphoniaSource<T: AudioSample> {
    /// Symphonia format reader
    format: Box<dyn FormatReader>,

    /// Symphonia decoder
    decoder: Box<dyn Decoder>,

    /// Track being decoded
    track_id: u32,

    frames: u64,
    channels: usize,
    sample_rate: u32,
    audio_format: AudioFormat,

    /// Conversion buffer, reallocated only when a packet exceeds its capacity
    sample_buf: Option<SampleBuffer<T>>,
    sample_buf_capacity: usize,

    /// Decoded samples not yet handed out
    pending: Vec<T>,
    pending_pos: usize,

    finished: bool,
    last_error: Option<SourceErrorKind>,
}

impl<T: AudioSample> SymphoniaSource<T> {
    /// Open and probe an audio file.
    ///
    /// # Errors
    /// - `System`: file cannot be opened
    /// - `UnrecognisedFormat`: probe failed or no audio track
    /// - `UnsupportedEncoding`: no decoder for the track's codec
    pub fn open(path: &Path) -> Result<Self, SourceErrorKind> {
        debug!("Opening audio file: {}", path.display());

        let format = probe(path)?;

        // Get the default audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SourceErrorKind::UnrecognisedFormat("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| SourceErrorKind::UnsupportedEncoding(format!("Failed to create decoder: {}", e)))?;

        let sample_rate = codec_params.sample_rate.unwrap_or(0);
        let channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
        let audio_format = detect_format(&read_header(path), path, &codec_params);

        let frames = match codec_params.n_frames {
            Some(n) => n,
            None => {
                let estimate = scan_frame_count(path, track_id)?;
                debug!(
                    "No declared length, estimated {} frames from packet durations",
                    estimate
                );
                estimate
            }
        };

        debug!(
            "Audio format: frames={}, sample_rate={}, channels={}, format={}",
            frames, sample_rate, channels, audio_format
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            frames,
            channels,
            sample_rate,
            audio_format,
            sample_buf: None,
            sample_buf_capacity: 0,
            pending: Vec::new(),
            pending_pos: 0,
            finished: false,
            last_error: None,
        })
    }

    /// Decode the next packet of our track into `pending`.
    ///
    /// Returns `Ok(false)` at end of stream.
    fn decode_next_packet(&mut self) -> Result<bool, SourceErrorKind> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    debug!("Stream reset required, treating as end of stream");
                    return Ok(false);
                }
                Err(e) => return Err(packet_error("Failed to read packet", e)),
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(packet_error("Failed to decode packet", e)),
            };

            let spec = *decoded.spec();
            if spec.channels.count() != self.channels {
                return Err(SourceErrorKind::Decode(format!(
                    "Channel count changed mid-stream: expected {}, got {}",
                    self.channels,
                    spec.channels.count()
                )));
            }

            if decoded.frames() == 0 {
                continue;
            }

            let capacity = decoded.capacity();
            if capacity > self.sample_buf_capacity {
                self.sample_buf = None;
                self.sample_buf_capacity = capacity;
            }
            let sample_buf = self
                .sample_buf
                .get_or_insert_with(|| SampleBuffer::new(capacity as u64, spec));
            sample_buf.copy_interleaved_ref(decoded);

            self.pending.clear();
            self.pending.extend_from_slice(sample_buf.samples());
            self.pending_pos = 0;
            return Ok(true);
        }
    }
}

impl<T: AudioSample> DecodeSource<T> for SymphoniaSource<T> {
    fn frames(&self) -> u64 {
        self.frames
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn format(&self) -> AudioFormat {
        self.audio_format
    }

    fn read_chunk(&mut self, dst: &mut [T]) -> Result<usize, SourceErrorKind> {
        if self.channels == 0 {
            return Ok(0);
        }

        let wanted = (dst.len() / self.channels) * self.channels;
        let mut written = 0;

        while written < wanted {
            if self.pending_pos < self.pending.len() {
                let n = (self.pending.len() - self.pending_pos).min(wanted - written);
                dst[written..written + n]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                self.pending_pos += n;
                written += n;
                continue;
            }

            if self.finished {
                break;
            }

            match self.decode_next_packet() {
                Ok(true) => {}
                Ok(false) => self.finished = true,
                Err(kind) => {
                    self.last_error = Some(kind.clone());
                    return Err(kind);
                }
            }
        }

        trace!("read_chunk: {} frames", written / self.channels);
        Ok(written / self.channels)
    }

    fn last_error(&self) -> Option<&SourceErrorKind> {
        self.last_error.as_ref()
    }
}

/// Probe a file and return its format reader
fn probe(path: &Path) -> Result<Box<dyn FormatReader>, SourceErrorKind> {
    let file = File::open(path).map_err(|e| SourceErrorKind::System(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SourceErrorKind::UnrecognisedFormat(format!("Failed to probe format: {}", e)))?;

    Ok(probed.format)
}

/// Classify a demuxer failure: I/O on the container is a system error,
/// anything else is a decode error.
fn packet_error(context: &str, e: SymphoniaError) -> SourceErrorKind {
    match e {
        SymphoniaError::IoError(io) => SourceErrorKind::System(format!("{}: {}", context, io)),
        other => SourceErrorKind::Decode(format!("{}: {}", context, other)),
    }
}

/// Sum packet durations of one track without decoding.
fn scan_frame_count(path: &Path, track_id: u32) -> Result<u64, SourceErrorKind> {
    let mut format = probe(path)?;
    let mut total = 0u64;

    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => total += packet.dur(),
            Ok(_) => {}
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(packet_error("Failed to scan packets", e)),
        }
    }

    Ok(total)
}

/// Codec to encoding table for codecs with a fixed sample layout
const CODEC_ENCODINGS: &[(CodecType, Encoding)] = &[
    (codecs::CODEC_TYPE_PCM_S8, Encoding::PcmS8),
    (codecs::CODEC_TYPE_PCM_U8, Encoding::PcmU8),
    (codecs::CODEC_TYPE_PCM_S16LE, Encoding::Pcm16),
    (codecs::CODEC_TYPE_PCM_S16BE, Encoding::Pcm16),
    (codecs::CODEC_TYPE_PCM_U16LE, Encoding::Pcm16),
    (codecs::CODEC_TYPE_PCM_U16BE, Encoding::Pcm16),
    (codecs::CODEC_TYPE_PCM_S24LE, Encoding::Pcm24),
    (codecs::CODEC_TYPE_PCM_S24BE, Encoding::Pcm24),
    (codecs::CODEC_TYPE_PCM_U24LE, Encoding::Pcm24),
    (codecs::CODEC_TYPE_PCM_U24BE, Encoding::Pcm24),
    (codecs::CODEC_TYPE_PCM_S32LE, Encoding::Pcm32),
    (codecs::CODEC_TYPE_PCM_S32BE, Encoding::Pcm32),
    (codecs::CODEC_TYPE_PCM_U32LE, Encoding::Pcm32),
    (codecs::CODEC_TYPE_PCM_U32BE, Encoding::Pcm32),
    (codecs::CODEC_TYPE_PCM_F32LE, Encoding::Float),
    (codecs::CODEC_TYPE_PCM_F32BE, Encoding::Float),
    (codecs::CODEC_TYPE_PCM_F64LE, Encoding::Double),
    (codecs::CODEC_TYPE_PCM_F64BE, Encoding::Double),
    (codecs::CODEC_TYPE_PCM_ALAW, Encoding::Alaw),
    (codecs::CODEC_TYPE_PCM_MULAW, Encoding::Ulaw),
    (codecs::CODEC_TYPE_ALAC, Encoding::Alac),
    (codecs::CODEC_TYPE_MP1, Encoding::MpegLayerIII),
    (codecs::CODEC_TYPE_MP2, Encoding::MpegLayerIII),
    (codecs::CODEC_TYPE_MP3, Encoding::MpegLayerIII),
    (codecs::CODEC_TYPE_AAC, Encoding::Aac),
    (codecs::CODEC_TYPE_VORBIS, Encoding::Vorbis),
    (codecs::CODEC_TYPE_OPUS, Encoding::Opus),
];

fn detect_encoding(params: &CodecParameters) -> Option<Encoding> {
    if params.codec == codecs::CODEC_TYPE_FLAC {
        // FLAC is reported by its PCM depth
        return Some(match params.bits_per_sample {
            Some(8) => Encoding::PcmS8,
            Some(24) => Encoding::Pcm24,
            Some(32) => Encoding::Pcm32,
            _ => Encoding::Pcm16,
        });
    }

    CODEC_ENCODINGS
        .iter()
        .find(|(codec, _)| *codec == params.codec)
        .map(|(_, encoding)| *encoding)
}

fn container_for_codec(codec: CodecType) -> Option<Container> {
    if codec == codecs::CODEC_TYPE_FLAC {
        Some(Container::Flac)
    } else if codec == codecs::CODEC_TYPE_MP1
        || codec == codecs::CODEC_TYPE_MP2
        || codec == codecs::CODEC_TYPE_MP3
    {
        Some(Container::Mpeg)
    } else if codec == codecs::CODEC_TYPE_VORBIS || codec == codecs::CODEC_TYPE_OPUS {
        Some(Container::Ogg)
    } else if codec == codecs::CODEC_TYPE_AAC || codec == codecs::CODEC_TYPE_ALAC {
        Some(Container::Mp4)
    } else {
        None
    }
}

/// First bytes of a file, enough for [`Container::from_magic`].
///
/// Empty when the file cannot be read; the caller has already probed it.
fn read_header(path: &Path) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    if let Err(e) = File::open(path).and_then(|f| f.take(HEADER_LEN as u64).read_to_end(&mut header)) {
        debug!("Could not read header of {}: {}", path.display(), e);
        header.clear();
    }
    header
}

const HEADER_LEN: usize = 12;

/// Derive the format code from the file contents and codec parameters.
///
/// The container comes from the header signature, then the file extension,
/// then the codec. Returns [`AudioFormat::UNKNOWN`] when none determines it.
fn detect_format(header: &[u8], path: &Path, params: &CodecParameters) -> AudioFormat {
    let container = Container::from_magic(header)
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(Container::from_extension)
        })
        .or_else(|| container_for_codec(params.codec));

    match (container, detect_encoding(params)) {
        (Some(container), Some(encoding)) => AudioFormat::new(container, encoding),
        (Some(container), None) => AudioFormat::from_code(container as u32),
        (None, _) => AudioFormat::UNKNOWN,
    }
}
