//! # Tuner Configuration
//!
//! Every tunable of the pipeline lives in one [`TunerConfig`]. The deployments
//! this tuner grew out of differed only in these numbers (a higher volume gate
//! for noisy rooms, a longer averaging window on stage), so they are named
//! presets of one pipeline rather than separate code paths.
//!
//! Configuration files are JSON. Any field may be omitted and falls back to
//! its default:
//!
//! ```json
//! { "volume_threshold": 0.04, "smoothing_window": 30 }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TunerError;
use crate::pitch::{DEFAULT_MAX_FREQUENCY, DEFAULT_MIN_FREQUENCY};

/// Default RMS level below which a frame counts as too quiet.
pub const DEFAULT_VOLUME_THRESHOLD: f32 = 0.01;

/// Default number of raw estimates averaged by the moving-average stage.
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Default exponential smoothing factor for the display frequency.
pub const DEFAULT_DISPLAY_ALPHA: f32 = 0.3;

/// Distance (Hz) under which the display frequency snaps to its target.
pub const DEFAULT_DISPLAY_SNAP_HZ: f32 = 0.1;

/// Default display-tick period in milliseconds.
pub const DEFAULT_DISPLAY_INTERVAL_MS: u64 = 50;

/// Default number of samples per analysis frame (~46ms at 44.1kHz).
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Largest accepted frame (~1.5s at 44.1kHz).
pub const MAX_FRAME_SIZE: usize = 1 << 16;

/// Default preferred capture sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default concert pitch for A4.
pub const DEFAULT_REFERENCE_PITCH: f32 = 440.0;

/// All tunable parameters of the tuner pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// RMS below which a frame is too quiet to analyse.
    pub volume_threshold: f32,
    /// Lowest detectable fundamental (Hz).
    pub min_frequency: f32,
    /// Highest detectable fundamental (Hz).
    pub max_frequency: f32,
    /// Capacity of the moving-average window.
    pub smoothing_window: usize,
    /// Exponential smoothing factor applied on each display tick.
    pub display_alpha: f32,
    /// Snap-to-target distance for the display frequency (Hz).
    pub display_snap_hz: f32,
    /// Display-tick period (ms), independent of the capture cadence.
    pub display_interval_ms: u64,
    /// Samples per frame requested from the capture collaborator.
    pub frame_size: usize,
    /// Preferred capture sample rate (Hz).
    pub sample_rate: u32,
    /// Frequency of A4 used to build the default chromatic reference set.
    pub reference_pitch: f32,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            volume_threshold: DEFAULT_VOLUME_THRESHOLD,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            display_alpha: DEFAULT_DISPLAY_ALPHA,
            display_snap_hz: DEFAULT_DISPLAY_SNAP_HZ,
            display_interval_ms: DEFAULT_DISPLAY_INTERVAL_MS,
            frame_size: DEFAULT_FRAME_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            reference_pitch: DEFAULT_REFERENCE_PITCH,
        }
    }
}

impl TunerConfig {
    /// Quiet practice room: low gate, short window. Same as the default.
    pub fn quiet_room() -> Self {
        Self::default()
    }

    /// Background noise present: raise the gate so hum and chatter stay out.
    pub fn noisy_room() -> Self {
        Self {
            volume_threshold: 0.04,
            ..Self::default()
        }
    }

    /// Loud environment with an amplified or close-miked instrument:
    /// high gate and a long averaging window for a steadier needle.
    pub fn stage() -> Self {
        Self {
            volume_threshold: 0.07,
            smoothing_window: 30,
            ..Self::default()
        }
    }

    /// Looks up a preset by name (`quiet`, `noisy`, `stage`).
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "quiet" | "quiet-room" => Some(Self::quiet_room()),
            "noisy" | "noisy-room" => Some(Self::noisy_room()),
            "stage" => Some(Self::stage()),
            _ => None,
        }
    }

    /// Parses a JSON document (fields may be omitted) and validates it.
    pub fn from_json(json: &str) -> Result<Self, TunerError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| TunerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The display-tick period as a [`Duration`].
    pub fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<(), TunerError> {
        let invalid = |msg: String| Err(TunerError::InvalidConfig(msg));

        if !self.volume_threshold.is_finite() || self.volume_threshold < 0.0 {
            return invalid(format!(
                "volume_threshold must be a non-negative number, got {}",
                self.volume_threshold
            ));
        }
        if !(self.min_frequency.is_finite() && self.min_frequency > 0.0) {
            return invalid(format!(
                "min_frequency must be positive, got {}",
                self.min_frequency
            ));
        }
        if !(self.max_frequency.is_finite() && self.max_frequency > self.min_frequency) {
            return invalid(format!(
                "max_frequency ({}) must be above min_frequency ({})",
                self.max_frequency, self.min_frequency
            ));
        }
        if self.sample_rate == 0 {
            return invalid("sample_rate must be non-zero".to_string());
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.max_frequency > nyquist {
            return invalid(format!(
                "max_frequency ({}) must not exceed half the sample rate ({nyquist})",
                self.max_frequency
            ));
        }
        if self.smoothing_window == 0 {
            return invalid("smoothing_window must be at least 1".to_string());
        }
        if !(self.display_alpha > 0.0 && self.display_alpha <= 1.0) {
            return invalid(format!(
                "display_alpha must be in (0, 1], got {}",
                self.display_alpha
            ));
        }
        if !self.display_snap_hz.is_finite() || self.display_snap_hz < 0.0 {
            return invalid(format!(
                "display_snap_hz must be non-negative, got {}",
                self.display_snap_hz
            ));
        }
        if self.display_interval_ms == 0 {
            return invalid("display_interval_ms must be at least 1".to_string());
        }
        if !(2..=MAX_FRAME_SIZE).contains(&self.frame_size) {
            return invalid(format!(
                "frame_size must be between 2 and {MAX_FRAME_SIZE} samples, got {}",
                self.frame_size
            ));
        }
        if !(self.reference_pitch.is_finite() && self.reference_pitch > 0.0) {
            return invalid(format!(
                "reference_pitch must be positive, got {}",
                self.reference_pitch
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.volume_threshold, 0.01);
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.display_interval(), Duration::from_millis(50));
    }

    #[test]
    fn presets_cover_observed_deployments() {
        assert_eq!(TunerConfig::noisy_room().volume_threshold, 0.04);
        let stage = TunerConfig::stage();
        assert_eq!(stage.volume_threshold, 0.07);
        assert_eq!(stage.smoothing_window, 30);
        assert_eq!(TunerConfig::preset("stage"), Some(stage));
        assert!(TunerConfig::preset("cathedral").is_none());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = TunerConfig::from_json(r#"{ "volume_threshold": 0.04 }"#).unwrap();
        assert_eq!(config.volume_threshold, 0.04);
        assert_eq!(config.smoothing_window, DEFAULT_SMOOTHING_WINDOW);
        assert_eq!(config.max_frequency, DEFAULT_MAX_FREQUENCY);
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        let err = TunerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TunerError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad = [
            TunerConfig {
                smoothing_window: 0,
                ..TunerConfig::default()
            },
            TunerConfig {
                display_alpha: 0.0,
                ..TunerConfig::default()
            },
            TunerConfig {
                display_alpha: 1.5,
                ..TunerConfig::default()
            },
            TunerConfig {
                min_frequency: 500.0,
                max_frequency: 400.0,
                ..TunerConfig::default()
            },
            TunerConfig {
                volume_threshold: -0.1,
                ..TunerConfig::default()
            },
            TunerConfig {
                frame_size: 1,
                ..TunerConfig::default()
            },
            TunerConfig {
                display_interval_ms: 0,
                ..TunerConfig::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(TunerError::InvalidConfig(_))),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn band_must_stay_below_nyquist() {
        let config = TunerConfig {
            max_frequency: 50_000.0,
            ..TunerConfig::default()
        };
        assert!(matches!(config.validate(), Err(TunerError::InvalidConfig(_))));

        let config = TunerConfig {
            max_frequency: 22_050.0,
            ..TunerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn frame_size_is_capped() {
        let json = format!(r#"{{ "frame_size": {} }}"#, usize::MAX);
        assert!(matches!(
            TunerConfig::from_json(&json),
            Err(TunerError::InvalidConfig(_))
        ));
        let config = TunerConfig {
            frame_size: MAX_FRAME_SIZE,
            ..TunerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn serializes_every_field() {
        let json = serde_json::to_string(&TunerConfig::stage()).unwrap();
        let back = TunerConfig::from_json(&json).unwrap();
        assert_eq!(back, TunerConfig::stage());
    }
}
