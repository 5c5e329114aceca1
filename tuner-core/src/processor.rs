//! # Frame Processor
//!
//! The synchronous heart of a tuner session: gate, estimate, smooth and map
//! one frame at a time, and step the display smoothing on its own ticks.
//! [`TunerSession`](crate::session::TunerSession) drives one of these from
//! its worker thread; tests drive it directly.

use log::debug;

use crate::config::{DEFAULT_REFERENCE_PITCH, TunerConfig};
use crate::error::TunerError;
use crate::frame::Frame;
use crate::pitch;
use crate::smoothing::SmoothingState;
use crate::tuning::{self, CHROMATIC_NOTES, NoteMatch, ReferenceNote};
use crate::volume::{self, VolumeReading};

/// Everything the presentation layer reads from a tuner session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunerSessionState {
    /// Estimate from the latest frame, `None` when quiet or aperiodic.
    pub raw_frequency: Option<f32>,
    /// Moving average after the latest frame, `None` when that frame was unvoiced.
    pub smoothed_frequency: Option<f32>,
    /// Most recent non-`None` smoothed frequency.
    pub last_valid_frequency: Option<f32>,
    /// Exponentially smoothed frequency, updated on display ticks only.
    pub display_frequency: Option<f32>,
    /// Closest reference note to the smoothed (or held) frequency.
    pub note: Option<NoteMatch>,
    pub volume: VolumeReading,
    pub is_running: bool,
    pub last_error: Option<TunerError>,
}

/// Runs the analysis pipeline and owns all cross-frame state.
#[derive(Debug, Clone)]
pub struct TunerProcessor {
    config: TunerConfig,
    notes: Vec<ReferenceNote>,
    smoothing: SmoothingState,
    state: TunerSessionState,
}

impl TunerProcessor {
    /// Creates a processor mapping against `notes`.
    pub fn new(config: TunerConfig, notes: Vec<ReferenceNote>) -> Self {
        let smoothing = SmoothingState::new(
            config.smoothing_window,
            config.display_alpha,
            config.display_snap_hz,
        );
        Self {
            config,
            notes,
            smoothing,
            state: TunerSessionState::default(),
        }
    }

    /// Creates a processor using the chromatic C2 to B5 set at the
    /// configured reference pitch.
    pub fn with_chromatic_notes(config: TunerConfig) -> Self {
        let notes = if config.reference_pitch == DEFAULT_REFERENCE_PITCH {
            CHROMATIC_NOTES.clone()
        } else {
            tuning::chromatic_scale(config.reference_pitch, 2, 5)
        };
        Self::new(config, notes)
    }

    /// Processes one frame: gate, estimate (if loud enough), smooth, map.
    ///
    /// The volume reading is refreshed on every frame, quiet or not.
    pub fn process_frame(&mut self, frame: &Frame) -> &TunerSessionState {
        let reading = volume::gate(&frame.samples, self.config.volume_threshold);

        let raw = if reading.is_too_quiet {
            None
        } else {
            pitch::detect_pitch_autocorrelation(
                &frame.samples,
                frame.sample_rate,
                self.config.volume_threshold,
                self.config.min_frequency,
                self.config.max_frequency,
            )
        };

        let smoothed = self.smoothing.push_raw(raw);
        let last_valid = self.smoothing.last_valid.get();

        self.state.volume = reading;
        self.state.raw_frequency = raw;
        self.state.smoothed_frequency = smoothed;
        self.state.last_valid_frequency = last_valid;
        if let Some(frequency) = smoothed.or(last_valid) {
            self.state.note = tuning::closest(frequency, &self.notes);
        }

        self.state()
    }

    /// One display tick: moves `display_frequency` toward the smoothed
    /// frequency, or toward the held one during a gap.
    pub fn display_tick(&mut self) -> Option<f32> {
        let display = self.smoothing.display_tick(self.state.smoothed_frequency);
        self.state.display_frequency = display;
        display
    }

    /// Clears smoothing and every state field, including `is_running` and
    /// `last_error`.
    pub fn reset(&mut self) {
        debug!("[PROCESSOR] Resetting smoothing state");
        self.smoothing.reset();
        self.state = TunerSessionState::default();
    }

    pub fn state(&self) -> &TunerSessionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut TunerSessionState {
        &mut self.state
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }
}
