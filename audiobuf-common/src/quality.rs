//! Resampling quality presets
//!
//! A closed set of named presets. The audio crate maps each preset to a
//! concrete resampler configuration; `None` disables resampling entirely.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resampling quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleQuality {
    /// No resampling: files are always read at their native rate
    None,
    /// Cubic interpolation, fastest
    Quick,
    /// Higher-order polynomial interpolation
    Low,
    /// Short sinc filter
    Medium,
    /// Long sinc filter
    #[default]
    High,
    /// Longest sinc filter with cubic sub-sample interpolation
    VeryHigh,
}

impl ResampleQuality {
    /// All presets, in increasing quality order.
    pub const ALL: [ResampleQuality; 6] = [
        ResampleQuality::None,
        ResampleQuality::Quick,
        ResampleQuality::Low,
        ResampleQuality::Medium,
        ResampleQuality::High,
        ResampleQuality::VeryHigh,
    ];

    /// Whether this preset allows resampling at all
    pub fn is_enabled(self) -> bool {
        self != ResampleQuality::None
    }

    /// Preset name as used in configuration files and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            ResampleQuality::None => "none",
            ResampleQuality::Quick => "quick",
            ResampleQuality::Low => "low",
            ResampleQuality::Medium => "medium",
            ResampleQuality::High => "high",
            ResampleQuality::VeryHigh => "very-high",
        }
    }
}

impl fmt::Display for ResampleQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResampleQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Unknown resampling quality '{}' (expected one of: none, quick, low, medium, high, very-high)",
                    s
                ))
            })
    }
}
