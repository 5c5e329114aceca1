//! # Error Types
//!
//! The tuner has exactly one failure a caller can observe at runtime: the
//! capture device could not be acquired. Configuration problems are reported
//! separately before a session is ever started. Everything else the DSP
//! pipeline encounters (silence, no periodicity, gaps between notes) is an
//! `Option::None`, never an error.

use thiserror::Error;

/// Errors surfaced by the tuner core.
///
/// Variants carry their cause as text so the error is `Clone` and can be held
/// in a [`TunerSessionState`](crate::TunerSessionState) snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TunerError {
    /// The capture collaborator could not be acquired (permission denied,
    /// no input device, unsupported format...). Retryable via `start()`.
    #[error("Microphone access denied or not available: {0}")]
    DeviceUnavailable(String),

    /// A configuration value is out of range or could not be parsed.
    #[error("Invalid tuner configuration: {0}")]
    InvalidConfig(String),
}
