//! audiobuf - command-line front end for audiobuf-io
//!
//! Subcommands:
//! - `info`: nominal metadata of a file
//! - `read`: decode (and optionally resample), print metadata and levels
//! - `convert`: read then write a WAV file
//! - `batch`: convert many files concurrently

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use audiobuf_common::config::{load_toml_config, ReadOverrides, ReadSettings};
use audiobuf_common::logging::init_tracing;
use audiobuf_common::ResampleQuality;
use audiobuf_io::audio::source::{DecodeSource, SymphoniaSource};
use audiobuf_io::{
    write_audio, AudioFormat, AudioMetadata, Container, Encoding, ReadOptions, Reader,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Command-line arguments for audiobuf
#[derive(Parser, Debug)]
#[command(name = "audiobuf")]
#[command(about = "Decode audio files into sample buffers, with optional resampling")]
#[command(version)]
struct Cli {
    /// Bootstrap config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides the config file; RUST_LOG wins over both)
    #[arg(long, global = true, env = "AUDIOBUF_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show nominal metadata without decoding
    Info {
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decode a file and report the resulting buffer
    Read {
        file: PathBuf,

        #[command(flatten)]
        read: ReadArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decode a file and write it back as WAV
    Convert {
        input: PathBuf,
        output: PathBuf,

        #[command(flatten)]
        read: ReadArgs,

        #[arg(long, value_enum, default_value_t = OutputEncoding::Pcm16)]
        encoding: OutputEncoding,
    },

    /// Convert many files to WAV concurrently
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory receiving `<stem>.wav` for each input
        #[arg(long)]
        out_dir: PathBuf,

        /// Files processed at once
        #[arg(short, long, default_value = "4")]
        jobs: usize,

        #[command(flatten)]
        read: ReadArgs,

        #[arg(long, value_enum, default_value_t = OutputEncoding::Pcm16)]
        encoding: OutputEncoding,
    },
}

/// Read options shared by the decoding subcommands
#[derive(Args, Debug, Clone)]
struct ReadArgs {
    /// Target sample rate in Hz (0 keeps the native rate)
    #[arg(short = 'r', long, env = "AUDIOBUF_SAMPLE_RATE")]
    sample_rate: Option<u32>,

    /// Resampling quality: none, quick, low, medium, high, very-high
    #[arg(short, long, env = "AUDIOBUF_QUALITY")]
    quality: Option<ResampleQuality>,

    /// Do not zero-pad resampled output
    #[arg(long)]
    no_padding: bool,

    /// Frames decoded per iteration
    #[arg(long)]
    chunk_frames: Option<usize>,
}

impl ReadArgs {
    fn overrides(&self) -> ReadOverrides {
        ReadOverrides {
            sample_rate: self.sample_rate,
            quality: self.quality,
            padding: self.no_padding.then_some(false),
            chunk_frames: self.chunk_frames,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputEncoding {
    Pcm16,
    Pcm24,
    Pcm32,
    Float,
}

impl From<OutputEncoding> for Encoding {
    fn from(encoding: OutputEncoding) -> Self {
        match encoding {
            OutputEncoding::Pcm16 => Encoding::Pcm16,
            OutputEncoding::Pcm24 => Encoding::Pcm24,
            OutputEncoding::Pcm32 => Encoding::Pcm32,
            OutputEncoding::Float => Encoding::Float,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_toml_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    info!("audiobuf {}", env!("CARGO_PKG_VERSION"));

    let resolve = |args: &ReadArgs| -> Result<ReadOptions> {
        let settings = ReadSettings::resolve(&config.read, &args.overrides())
            .context("Invalid read settings")?;
        Ok(ReadOptions::from(&settings))
    };

    match cli.command {
        Command::Info { file, json } => {
            let path = file.clone();
            let (frames, channels, sample_rate, format) = tokio::task::spawn_blocking(move || {
                SymphoniaSource::<f32>::open(&path)
                    .map(|s| (s.frames(), s.channels(), s.sample_rate(), s.format()))
            })
            .await
            .context("Info task panicked")?
            .map_err(|kind| describe(audiobuf_io::Error::source_error(kind, &file)))?;

            print_info(&file, frames, channels, sample_rate, format, json);
        }

        Command::Read { file, read, json } => {
            let reader = Reader::new(resolve(&read)?);
            let (samples, metadata) = tokio::task::spawn_blocking(move || reader.process::<f32>(&file))
                .await
                .context("Read task panicked")?
                .map_err(describe)?;
            print_read(&metadata, &samples, json);
        }

        Command::Convert {
            input,
            output,
            read,
            encoding,
        } => {
            let reader = Reader::new(resolve(&read)?);
            tokio::task::spawn_blocking(move || convert_file(&reader, &input, &output, encoding.into()))
                .await
                .context("Convert task panicked")??;
        }

        Command::Batch {
            files,
            out_dir,
            jobs,
            read,
            encoding,
        } => {
            let reader = Reader::new(resolve(&read)?);
            run_batch(reader, files, out_dir, jobs, encoding.into()).await?;
        }
    }

    Ok(())
}

/// Attach the user-visible category to a library error
fn describe(e: audiobuf_io::Error) -> anyhow::Error {
    let category = e.category();
    anyhow::Error::new(e).context(category.to_string())
}

/// Read `input` and write it to `output` as WAV with `encoding`
fn convert_file(reader: &Reader, input: &Path, output: &Path, encoding: Encoding) -> Result<AudioMetadata> {
    let (samples, metadata) = reader.process::<f32>(input).map_err(describe)?;

    let out_metadata = AudioMetadata {
        frames: metadata.padded_frames,
        format: AudioFormat::new(Container::Wav, encoding),
        ..metadata
    };
    write_audio(output, &samples, &out_metadata).map_err(describe)?;

    info!(
        "Converted {} -> {} ({} frames at {} Hz)",
        input.display(),
        output.display(),
        out_metadata.frames,
        out_metadata.sample_rate
    );
    Ok(out_metadata)
}

/// Convert each file on a blocking task, at most `jobs` at a time
async fn run_batch(reader: Reader, files: Vec<PathBuf>, out_dir: PathBuf, jobs: usize, encoding: Encoding) -> Result<()> {
    if jobs == 0 {
        bail!("--jobs must be at least 1");
    }
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::with_capacity(files.len());

    for input in files {
        let permit = semaphore.clone().acquire_owned().await.context("Semaphore closed")?;
        let reader = reader.clone();
        let output = output_path(&out_dir, &input);

        handles.push(tokio::task::spawn_blocking(move || {
            let result = convert_file(&reader, &input, &output, encoding);
            drop(permit);
            (input, result)
        }));
    }

    let mut failures = 0;
    for handle in handles {
        let (input, result) = handle.await.context("Batch task panicked")?;
        match result {
            Ok(metadata) => println!("{}: {} frames", input.display(), metadata.frames),
            Err(e) => {
                error!("{}: {:#}", input.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} file(s) failed", failures);
    }
    Ok(())
}

fn output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_os_string()).unwrap_or_else(|| "output".into());
    out_dir.join(stem).with_extension("wav")
}

fn print_info(file: &Path, frames: u64, channels: usize, sample_rate: u32, format: AudioFormat, as_json: bool) {
    if as_json {
        let value = json!({
            "file": file.display().to_string(),
            "frames": frames,
            "channels": channels,
            "sample_rate": sample_rate,
            "format": format.code(),
            "format_name": format.to_string(),
        });
        println!("{}", value);
    } else {
        println!("File:        {}", file.display());
        println!("Frames:      {} (nominal)", frames);
        println!("Channels:    {}", channels);
        println!("Sample rate: {} Hz", sample_rate);
        println!("Format:      {}", format);
    }
}

/// Peak and RMS over the produced frames
fn levels(samples: &[f32]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mut peak = 0.0f64;
    let mut sum_sq = 0.0f64;
    for &s in samples {
        let s = s as f64;
        peak = peak.max(s.abs());
        sum_sq += s * s;
    }
    (peak, (sum_sq / samples.len() as f64).sqrt())
}

fn print_read(metadata: &AudioMetadata, samples: &[f32], as_json: bool) {
    let produced = &samples[..metadata.frames * metadata.channels];
    let (peak, rms) = levels(produced);

    if as_json {
        let value = json!({
            "metadata": metadata,
            "format_name": metadata.format.to_string(),
            "duration_seconds": metadata.duration_seconds(),
            "peak": peak,
            "rms": rms,
        });
        println!("{}", value);
    } else {
        println!("Frames:        {}", metadata.frames);
        println!("Padded frames: {}", metadata.padded_frames);
        println!("Channels:      {}", metadata.channels);
        println!("Sample rate:   {} Hz", metadata.sample_rate);
        println!("Format:        {}", metadata.format);
        println!("Duration:      {:.3} s", metadata.duration_seconds());
        println!("Peak:          {:.4}", peak);
        println!("RMS:           {:.4}", rms);
    }
}
