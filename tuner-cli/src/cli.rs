use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tuner_core::TunerConfig;

/// Real-time chromatic tuner.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file. Omitted fields use the defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Named preset instead of a file: quiet, noisy, stage.
    #[arg(long, conflicts_with = "config")]
    pub preset: Option<String>,

    /// Volume gate: RMS below which input counts as too quiet.
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Number of estimates in the moving average.
    #[arg(long)]
    pub window: Option<usize>,

    /// Lowest detectable frequency (Hz).
    #[arg(long)]
    pub min_freq: Option<f32>,

    /// Highest detectable frequency (Hz).
    #[arg(long)]
    pub max_freq: Option<f32>,

    /// Frequency of A4 for the reference notes (Hz).
    #[arg(long)]
    pub reference_pitch: Option<f32>,

    /// Use a synthetic tone at this frequency (Hz) instead of the microphone.
    #[arg(long, value_name = "HZ")]
    pub simulate: Option<f32>,

    /// Amplitude of the --simulate tone.
    #[arg(long, default_value_t = 0.5)]
    pub amplitude: f32,

    /// Stop after this many seconds instead of waiting for Enter.
    #[arg(long, value_name = "SECS")]
    pub duration: Option<f64>,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Builds the tuner configuration: preset or file first, then flags.
    ///
    /// # Errors
    /// Returns an error for an unknown preset, an unreadable file, or a
    /// configuration that fails validation.
    pub fn load_config(&self) -> Result<TunerConfig> {
        let mut config = match (&self.preset, &self.config) {
            (Some(name), _) => {
                TunerConfig::preset(name).ok_or_else(|| anyhow!("unknown preset '{name}'"))?
            }
            (None, Some(path)) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                TunerConfig::from_json(&json)
                    .with_context(|| format!("failed to load {}", path.display()))?
            }
            (None, None) => TunerConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.volume_threshold = threshold;
        }
        if let Some(window) = self.window {
            config.smoothing_window = window;
        }
        if let Some(min_freq) = self.min_freq {
            config.min_frequency = min_freq;
        }
        if let Some(max_freq) = self.max_freq {
            config.max_frequency = max_freq;
        }
        if let Some(reference_pitch) = self.reference_pitch {
            config.reference_pitch = reference_pitch;
        }

        config.validate()?;
        Ok(config)
    }

    /// The run duration, if one was requested.
    ///
    /// # Errors
    /// Returns an error for a negative or non-finite duration.
    pub fn run_duration(&self) -> Result<Option<Duration>> {
        self.duration
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| anyhow!("invalid --duration {secs}: {e}"))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tuner").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let cli = parse(&[]);
        assert_eq!(cli.load_config().unwrap(), TunerConfig::default());
        assert_eq!(cli.run_duration().unwrap(), None);
    }

    #[test]
    fn flags_override_preset() {
        let cli = parse(&["--preset", "stage", "--window", "10"]);
        let config = cli.load_config().unwrap();
        assert_eq!(config.volume_threshold, 0.07);
        assert_eq!(config.smoothing_window, 10);
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        assert!(parse(&["--window", "0"]).load_config().is_err());
        assert!(parse(&["--preset", "cathedral"]).load_config().is_err());
        assert!(parse(&["--min-freq", "900", "--max-freq", "100"]).load_config().is_err());
        assert!(parse(&["--duration=-1"]).run_duration().is_err());
    }

    #[test]
    fn loads_shipped_config_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/noisy-room.json");
        let config = parse(&["--config", path, "--threshold", "0.05"]).load_config().unwrap();
        assert_eq!(config.volume_threshold, 0.05);
        assert_eq!(config.smoothing_window, 5);
        assert!(parse(&["--config", "/nonexistent/tuner.json"]).load_config().is_err());
    }

    #[test]
    fn preset_and_config_conflict() {
        let result = Cli::try_parse_from(["tuner", "--preset", "noisy", "--config", "tuner.json"]);
        assert!(result.is_err());
    }
}
