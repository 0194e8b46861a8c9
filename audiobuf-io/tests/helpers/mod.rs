//! Test Helper Utilities
//!
//! Shared utilities for testing audiobuf-io

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_source;

// Re-export commonly used items
pub use audio_generator::{generate_empty_wav, generate_test_library, generate_test_wav, AudioConfig};
pub use mock_source::MockSource;
