//! Streaming sample-rate conversion using rubato
//!
//! Rubato's fixed-input resamplers want exact planar chunks. The readers want a
//! streaming contract instead: hand over any number of interleaved frames, get
//! back as many converted frames as fit in the caller's region, and flush at
//! the end. [`RubatoResampler`] bridges the two with an input queue and an
//! output queue.
//!
//! Output length: the engine's startup delay is discarded and the stream never
//! emits more than `floor(input_frames × out_rate / in_rate)` frames, so the
//! converted signal lines up with the input and ends where it ends.

use crate::audio::types::AudioSample;
use audiobuf_common::ResampleQuality;
use rubato::{
    FastFixedIn, PolynomialDegree, Resampler as RubatoResamplerTrait, SincFixedIn,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;
use tracing::{debug, trace};

/// Frames per engine call
const ENGINE_CHUNK_FRAMES: usize = 1024;

/// Resampler failures, reported without file context
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResamplerError {
    #[error("Failed to create resampler: {0}")]
    Construction(String),

    #[error("Resampling failed: {0}")]
    Process(String),

    #[error("Invalid resampler input: {0}")]
    InvalidInput(String),
}

/// Streaming sample-rate converter.
///
/// Buffers are interleaved. `input = None` signals end of input; after that
/// the converter keeps returning trailing output until a call produces 0
/// frames.
pub trait StreamingResampler<T> {
    /// Convert `input` (or flush when `None`) into `output`.
    ///
    /// Returns `(consumed, produced)` in frames. `produced` never exceeds
    /// `output.len() / channels`.
    fn process(&mut self, input: Option<&[T]>, output: &mut [T]) -> Result<(usize, usize), ResamplerError>;

    /// True when every frame owed for the input received so far has been delivered
    fn is_drained(&self) -> bool;
}

/// Concrete rubato engine selected by the quality preset
enum Engine<T: AudioSample> {
    Polynomial(FastFixedIn<T>),
    Sinc(SincFixedIn<T>),
}

impl<T: AudioSample> Engine<T> {
    fn new(quality: ResampleQuality, ratio: f64, channels: usize) -> Result<Self, ResamplerError> {
        let engine = match quality {
            ResampleQuality::None => {
                return Err(ResamplerError::Construction(
                    "quality 'none' does not resample".to_string(),
                ))
            }
            ResampleQuality::Quick => Engine::Polynomial(
                FastFixedIn::new(ratio, 1.0, PolynomialDegree::Cubic, ENGINE_CHUNK_FRAMES, channels)
                    .map_err(|e| ResamplerError::Construction(e.to_string()))?,
            ),
            ResampleQuality::Low => Engine::Polynomial(
                FastFixedIn::new(ratio, 1.0, PolynomialDegree::Septic, ENGINE_CHUNK_FRAMES, channels)
                    .map_err(|e| ResamplerError::Construction(e.to_string()))?,
            ),
            ResampleQuality::Medium | ResampleQuality::High | ResampleQuality::VeryHigh => {
                Engine::Sinc(
                    SincFixedIn::new(ratio, 1.0, sinc_parameters(quality), ENGINE_CHUNK_FRAMES, channels)
                        .map_err(|e| ResamplerError::Construction(e.to_string()))?,
                )
            }
        };
        Ok(engine)
    }

    fn input_frames_next(&self) -> usize {
        match self {
            Engine::Polynomial(r) => r.input_frames_next(),
            Engine::Sinc(r) => r.input_frames_next(),
        }
    }

    fn output_delay(&self) -> usize {
        match self {
            Engine::Polynomial(r) => r.output_delay(),
            Engine::Sinc(r) => r.output_delay(),
        }
    }

    fn output_buffer_allocate(&self) -> Vec<Vec<T>> {
        match self {
            Engine::Polynomial(r) => r.output_buffer_allocate(true),
            Engine::Sinc(r) => r.output_buffer_allocate(true),
        }
    }

    fn process(&mut self, input: &[&[T]], output: &mut [Vec<T>]) -> Result<(usize, usize), ResamplerError> {
        let result = match self {
            Engine::Polynomial(r) => r.process_into_buffer(input, output, None),
            Engine::Sinc(r) => r.process_into_buffer(input, output, None),
        };
        result.map_err(|e| ResamplerError::Process(e.to_string()))
    }

    /// Process fewer frames than a full chunk, or pure silence when `input` is `None`
    fn process_partial(
        &mut self,
        input: Option<&[&[T]]>,
        output: &mut [Vec<T>],
    ) -> Result<(usize, usize), ResamplerError> {
        let result = match self {
            Engine::Polynomial(r) => r.process_partial_into_buffer(input, output, None),
            Engine::Sinc(r) => r.process_partial_into_buffer(input, output, None),
        };
        result.map_err(|e| ResamplerError::Process(e.to_string()))
    }
}

/// Sinc filter settings per preset
fn sinc_parameters(quality: ResampleQuality) -> SincInterpolationParameters {
    match quality {
        ResampleQuality::Medium => SincInterpolationParameters {
            sinc_len: 64,
            f_cutoff: 0.91,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 64,
            window: WindowFunction::Hann2,
        },
        ResampleQuality::High => SincInterpolationParameters {
            sinc_len: 128,
            f_cutoff: 0.93,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 128,
            window: WindowFunction::BlackmanHarris2,
        },
        _ => SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        },
    }
}

/// Streaming resampler built on rubato's fixed-input engines.
pub struct RubatoResampler<T: AudioSample> {
    engine: Engine<T>,
    channels: usize,
    input_rate: u32,
    output_rate: u32,

    /// Planar input not yet fed to the engine
    input_queue: Vec<Vec<T>>,
    /// Engine output buffer (planar)
    engine_output: Vec<Vec<T>>,
    /// Interleaved output not yet handed to the caller
    output_queue: Vec<T>,
    output_pos: usize,

    /// Startup delay frames still to discard
    delay_remaining: usize,
    total_input: u64,
    total_emitted: u64,
    flushing: bool,
}

impl<T: AudioSample> RubatoResampler<T> {
    /// Create a resampler.
    ///
    /// # Errors
    /// `Construction` for zero rates or channels, quality `None`, or a ratio
    /// rubato rejects.
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
        quality: ResampleQuality,
    ) -> Result<Self, ResamplerError> {
        if input_rate == 0 || output_rate == 0 {
            return Err(ResamplerError::Construction(format!(
                "invalid rates {} -> {}",
                input_rate, output_rate
            )));
        }
        if channels == 0 {
            return Err(ResamplerError::Construction("channel count is 0".to_string()));
        }

        let ratio = output_rate as f64 / input_rate as f64;
        let engine = Engine::new(quality, ratio, channels)?;
        let delay = engine.output_delay();
        let engine_output = engine.output_buffer_allocate();

        debug!(
            "Created {} resampler {}Hz -> {}Hz ({} channels, delay {} frames)",
            quality, input_rate, output_rate, channels, delay
        );

        Ok(Self {
            engine,
            channels,
            input_rate,
            output_rate,
            input_queue: vec![Vec::new(); channels],
            engine_output,
            output_queue: Vec::new(),
            output_pos: 0,
            delay_remaining: delay,
            total_input: 0,
            total_emitted: 0,
            flushing: false,
        })
    }

    /// Most frames the stream may emit for the input seen so far
    fn output_limit(&self) -> u64 {
        (self.total_input as u128 * self.output_rate as u128 / self.input_rate as u128) as u64
    }

    fn queued_input_frames(&self) -> usize {
        self.input_queue[0].len()
    }

    fn queued_output_frames(&self) -> usize {
        (self.output_queue.len() - self.output_pos) / self.channels
    }

    /// Append interleaved frames to the planar input queue
    fn enqueue_input(&mut self, samples: &[T]) {
        let planar = deinterleave(samples, self.channels);
        for (queue, channel) in self.input_queue.iter_mut().zip(planar) {
            queue.extend(channel);
        }
    }

    /// Copy queued output into `output`, up to `max_frames` and the length limit
    fn drain_into(&mut self, output: &mut [T], max_frames: usize) -> usize {
        let allowed = self.output_limit().saturating_sub(self.total_emitted);
        let frames = self
            .queued_output_frames()
            .min(max_frames)
            .min(allowed.min(usize::MAX as u64) as usize);
        if frames == 0 {
            return 0;
        }

        let samples = frames * self.channels;
        output[..samples].copy_from_slice(&self.output_queue[self.output_pos..self.output_pos + samples]);
        self.output_pos += samples;
        self.total_emitted += frames as u64;

        if self.output_pos == self.output_queue.len() {
            self.output_queue.clear();
            self.output_pos = 0;
        }
        frames
    }

    /// Run one engine call if there is enough input (or we are flushing).
    ///
    /// Returns `false` when nothing more can be produced right now.
    fn step(&mut self) -> Result<bool, ResamplerError> {
        let needed = self.engine.input_frames_next();
        let queued = self.queued_input_frames();

        let (consumed, produced) = if queued >= needed {
            let chunk: Vec<&[T]> = self.input_queue.iter().map(|c| &c[..needed]).collect();
            self.engine.process(&chunk, &mut self.engine_output)?
        } else if !self.flushing {
            return Ok(false);
        } else if queued > 0 {
            let chunk: Vec<&[T]> = self.input_queue.iter().map(|c| c.as_slice()).collect();
            let (_, produced) = self.engine.process_partial(Some(&chunk), &mut self.engine_output)?;
            (queued, produced)
        } else if self.total_emitted + (self.queued_output_frames() as u64) < self.output_limit() {
            // Feed silence to push the filter tail out
            self.engine.process_partial(None, &mut self.engine_output)?
        } else {
            return Ok(false);
        };

        let consumed = consumed.min(queued);
        for channel in self.input_queue.iter_mut() {
            channel.drain(..consumed);
        }

        let skip = self.delay_remaining.min(produced);
        self.delay_remaining -= skip;
        for frame in skip..produced {
            for channel in &self.engine_output {
                self.output_queue.push(channel[frame]);
            }
        }

        trace!(
            "engine step: consumed={}, produced={}, skipped={}",
            consumed,
            produced,
            skip
        );
        Ok(produced > 0)
    }
}

impl<T: AudioSample> StreamingResampler<T> for RubatoResampler<T> {
    fn process(&mut self, input: Option<&[T]>, output: &mut [T]) -> Result<(usize, usize), ResamplerError> {
        let consumed = match input {
            Some(samples) => {
                if self.flushing {
                    return Err(ResamplerError::InvalidInput(
                        "input supplied after flush".to_string(),
                    ));
                }
                if samples.len() % self.channels != 0 {
                    return Err(ResamplerError::InvalidInput(format!(
                        "{} samples is not a whole number of {}-channel frames",
                        samples.len(),
                        self.channels
                    )));
                }
                self.enqueue_input(samples);
                let frames = samples.len() / self.channels;
                self.total_input += frames as u64;
                frames
            }
            None => {
                if !self.flushing {
                    debug!("Resampler flushing after {} input frames", self.total_input);
                }
                self.flushing = true;
                0
            }
        };

        let capacity = output.len() / self.channels;
        let mut produced = 0;
        loop {
            produced += self.drain_into(&mut output[produced * self.channels..], capacity - produced);
            if produced == capacity || !self.step()? {
                break;
            }
        }
        // Output queued by the last step may still fit
        if produced < capacity {
            produced += self.drain_into(&mut output[produced * self.channels..], capacity - produced);
        }

        Ok((consumed, produced))
    }

    fn is_drained(&self) -> bool {
        self.total_emitted >= self.output_limit()
    }
}

/// Convert interleaved samples to planar format.
///
/// Input:  [L, R, L, R, L, R, ...]
/// Output: [[L, L, L, ...], [R, R, R, ...]]
pub fn deinterleave<T: Copy>(samples: &[T], channels: usize) -> Vec<Vec<T>> {
    let num_frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(num_frames); channels];

    for frame in samples.chunks_exact(channels) {
        for (ch_idx, sample) in frame.iter().enumerate() {
            planar[ch_idx].push(*sample);
        }
    }

    planar
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Push `input` through in `chunk` sized pieces, then flush, collecting everything.
    fn run_stream(resampler: &mut RubatoResampler<f32>, input: &[f32], channels: usize, chunk: usize) -> Vec<f32> {
        let mut collected = Vec::new();
        let mut out = vec![0.0f32; 4096 * channels];

        for piece in input.chunks(chunk * channels) {
            let (consumed, produced) = resampler.process(Some(piece), &mut out).unwrap();
            assert_eq!(consumed, piece.len() / channels);
            collected.extend_from_slice(&out[..produced * channels]);
        }
        loop {
            let (_, produced) = resampler.process(None, &mut out).unwrap();
            if produced == 0 {
                break;
            }
            collected.extend_from_slice(&out[..produced * channels]);
        }
        collected
    }

    fn sine(frames: usize, rate: u32, channels: usize) -> Vec<f32> {
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let t = i as f32 / rate as f32;
            let value = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            for _ in 0..channels {
                samples.push(value);
            }
        }
        samples
    }

    #[test]
    fn test_deinterleave() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]; // 3 stereo frames
        let planar = deinterleave(&interleaved, 2);

        assert_eq!(planar.len(), 2); // 2 channels
        assert_eq!(planar[0], vec![1.0, 3.0, 5.0]); // Left channel
        assert_eq!(planar[1], vec![2.0, 4.0, 6.0]); // Right channel
    }

    #[test]
    fn test_rejects_quality_none() {
        let result = RubatoResampler::<f32>::new(44100, 22050, 1, ResampleQuality::None);
        assert!(matches!(result, Err(ResamplerError::Construction(_))));
    }

    #[test]
    fn test_rejects_zero_channels_and_rates() {
        assert!(RubatoResampler::<f32>::new(44100, 22050, 0, ResampleQuality::High).is_err());
        assert!(RubatoResampler::<f32>::new(0, 22050, 1, ResampleQuality::High).is_err());
        assert!(RubatoResampler::<f32>::new(44100, 0, 1, ResampleQuality::High).is_err());
    }

    #[test]
    fn test_downsample_length_is_exact() {
        let mut resampler = RubatoResampler::<f32>::new(48000, 44100, 2, ResampleQuality::Medium).unwrap();
        let input = sine(48000, 48000, 2);

        let output = run_stream(&mut resampler, &input, 2, 4096);

        assert_eq!(output.len() / 2, 44100);
        assert!(resampler.is_drained());
    }

    #[test]
    fn test_upsample_all_presets() {
        for quality in [
            ResampleQuality::Quick,
            ResampleQuality::Low,
            ResampleQuality::Medium,
            ResampleQuality::High,
            ResampleQuality::VeryHigh,
        ] {
            let mut resampler = RubatoResampler::<f32>::new(22050, 44100, 1, quality).unwrap();
            let input = sine(10_000, 22050, 1);

            let output = run_stream(&mut resampler, &input, 1, 3000);
            assert_eq!(output.len(), 20_000, "quality {}", quality);
        }
    }

    #[test]
    fn test_output_is_bounded_by_region() {
        let mut resampler = RubatoResampler::<f32>::new(44100, 48000, 1, ResampleQuality::Quick).unwrap();
        let input = sine(8192, 44100, 1);

        let mut small = vec![0.0f32; 100];
        let (consumed, produced) = resampler.process(Some(&input), &mut small).unwrap();
        assert_eq!(consumed, 8192);
        assert!(produced <= 100);
    }

    #[test]
    fn test_signal_survives_resampling() {
        let mut resampler = RubatoResampler::<f32>::new(48000, 24000, 1, ResampleQuality::High).unwrap();
        let input = sine(48000, 48000, 1);

        let output = run_stream(&mut resampler, &input, 1, 4096);
        let mid = &output[4000..20000];
        let peak = mid.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.4 && peak < 0.6, "peak {}", peak);
    }

    #[test]
    fn test_input_after_flush_rejected() {
        let mut resampler = RubatoResampler::<f32>::new(44100, 22050, 1, ResampleQuality::Quick).unwrap();
        let mut out = vec![0.0f32; 1024];
        resampler.process(None, &mut out).unwrap();

        let result = resampler.process(Some(&[0.0; 4]), &mut out);
        assert!(matches!(result, Err(ResamplerError::InvalidInput(_))));
    }

    #[test]
    fn test_partial_frames_rejected() {
        let mut resampler = RubatoResampler::<f32>::new(44100, 22050, 2, ResampleQuality::Quick).unwrap();
        let mut out = vec![0.0f32; 1024];

        let result = resampler.process(Some(&[0.0; 3]), &mut out);
        assert!(matches!(result, Err(ResamplerError::InvalidInput(_))));
    }

    #[test]
    fn test_not_drained_with_pending_output() {
        let mut resampler = RubatoResampler::<f64>::new(44100, 22050, 1, ResampleQuality::Quick).unwrap();
        let mut out = vec![0.0f64; 8192];
        resampler.process(Some(&vec![0.25f64; 4410]), &mut out).unwrap();
        assert!(!resampler.is_drained());

        while resampler.process(None, &mut out).unwrap().1 > 0 {}
        assert!(resampler.is_drained());
    }
}
