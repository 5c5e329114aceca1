//! # Volume Gate
//!
//! Classifies a frame as too quiet to analyse from its RMS energy. The
//! threshold is always supplied by the caller (see
//! [`TunerConfig::volume_threshold`](crate::config::TunerConfig)).

/// Loudness of one frame and whether it falls under the gate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeReading {
    /// Root-mean-square level, `>= 0`.
    pub rms: f32,
    /// `rms < threshold`.
    pub is_too_quiet: bool,
}

/// Root-mean-square level of a signal. An empty signal has an RMS of zero.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Measures a frame against the volume threshold.
pub fn gate(signal: &[f32], threshold: f32) -> VolumeReading {
    let rms = rms(signal);
    VolumeReading {
        rms,
        is_too_quiet: rms < threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_too_quiet() {
        let reading = gate(&[0.0; 1024], 0.01);
        assert_eq!(reading.rms, 0.0);
        assert!(reading.is_too_quiet);
    }

    #[test]
    fn empty_frame_is_too_quiet() {
        let reading = gate(&[], 0.01);
        assert_eq!(reading.rms, 0.0);
        assert!(reading.is_too_quiet);
    }

    #[test]
    fn square_wave_rms_equals_amplitude() {
        let signal: Vec<f32> = (0..512).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let reading = gate(&signal, 0.01);
        assert!((reading.rms - 0.5).abs() < 1e-6);
        assert!(!reading.is_too_quiet);
    }

    #[test]
    fn threshold_is_caller_supplied() {
        let signal = [0.05_f32; 64];
        assert!(!gate(&signal, 0.04).is_too_quiet);
        assert!(gate(&signal, 0.07).is_too_quiet);
    }
}
