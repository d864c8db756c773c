//! Error types for the synth engine.
//!
//! The audio path is infallible by construction (malformed MIDI is
//! tolerated, out-of-range parameters are clamped, see the crate's
//! top-level docs). [`EngineError`] only covers the handful of fallible,
//! non-audio-thread operations the core exposes: construction.

use std::fmt;

/// Errors that can occur while constructing or configuring the engine.
#[derive(Debug)]
pub enum EngineError {
    /// A constructor argument was outside its valid range (e.g. zero
    /// voices, non-positive sample rate).
    Configuration(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type for fallible engine construction.
pub type EngineResult<T> = Result<T, EngineError>;
