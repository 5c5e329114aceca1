// tuner-core/src/lib.rs

//! The core logic for the chromatic tuner.
//! This crate is responsible for volume gating, pitch detection, smoothing
//! and note mapping, plus the session that runs them against a live audio
//! source. It is completely headless and contains no presentation code.
//!
//! Pipeline, per frame: [`volume::gate`] → [`pitch::detect_pitch_autocorrelation`]
//! → [`smoothing`] → [`tuning::closest`], orchestrated by
//! [`processor::TunerProcessor`] and driven by [`session::TunerSession`].

pub mod audio;
pub mod config;
pub mod error;
pub mod frame;
pub mod pitch;
pub mod processor;
pub mod session;
pub mod smoothing;
pub mod synth;
pub mod tuning;
pub mod volume;

pub use config::TunerConfig;
pub use error::TunerError;
pub use frame::Frame;
pub use processor::{TunerProcessor, TunerSessionState};
pub use session::TunerSession;
pub use tuning::{NoteMatch, ReferenceNote};
pub use volume::VolumeReading;
