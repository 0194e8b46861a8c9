//! # audiobuf Common Library
//!
//! Shared code for the audiobuf crates:
//! - Bootstrap configuration (TOML file + layered resolution)
//! - Tracing initialisation
//! - Resampling quality presets

pub mod config;
pub mod error;
pub mod logging;
pub mod quality;

pub use error::{Error, Result};
pub use quality::ResampleQuality;
