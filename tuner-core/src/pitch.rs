//! # Pitch Detection Module
//!
//! Fundamental-frequency estimation by time-domain autocorrelation.
//!
//! The search converts the frequency band `[min_freq, max_freq]` into a lag
//! range and picks the lag whose raw (unnormalized) autocorrelation is the
//! largest positive value. No windowing and no energy normalization are
//! applied. Because shorter lags sum over more sample pairs, the raw score
//! favours them slightly: estimates read a little sharp, and a low
//! fundamental in a short frame can lose to the very first lags of the band.
//!
//! The cost is `O((max_lag - min_lag) * frame_len)` per frame, which makes this
//! the hot path of the whole tuner.

use crate::volume;

/// Lowest fundamental searched by default (Hz).
pub const DEFAULT_MIN_FREQUENCY: f32 = 70.0;

/// Highest fundamental searched by default (Hz).
pub const DEFAULT_MAX_FREQUENCY: f32 = 1000.0;

/// Inclusive lag range (in samples) covering a frequency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagRange {
    pub min_lag: usize,
    pub max_lag: usize,
}

/// Converts a frequency band into the lags to search for a frame of
/// `frame_len` samples.
///
/// `max_lag` is clamped to `frame_len - 1` so every lag has at least one
/// sample pair. Returns `None` when the band is degenerate, reaches up to the
/// sample rate itself (`min_lag` would be 0), or lies entirely outside what
/// the frame can resolve.
pub fn lag_range(
    frame_len: usize,
    sample_rate: u32,
    min_freq: f32,
    max_freq: f32,
) -> Option<LagRange> {
    if frame_len < 2 || sample_rate == 0 {
        return None;
    }
    if !(min_freq.is_finite() && max_freq.is_finite()) || min_freq <= 0.0 || max_freq < min_freq {
        return None;
    }

    let sample_rate = sample_rate as f32;
    let min_lag = (sample_rate / max_freq).floor() as usize;
    let max_lag = ((sample_rate / min_freq).floor() as usize).min(frame_len - 1);

    // Lag 0 compares the frame with itself and always wins, so such a band
    // can never produce an estimate.
    (min_lag > 0 && min_lag <= max_lag).then_some(LagRange { min_lag, max_lag })
}

/// Unnormalized autocorrelation of `signal` at `lag`:
/// `sum(signal[i] * signal[i + lag])` over every valid `i`.
///
/// Accumulates in `f64`: adjacent lags often score within a few parts in
/// ten thousand of each other, below what an `f32` running sum resolves.
#[inline]
pub fn autocorrelation(signal: &[f32], lag: usize) -> f64 {
    if lag >= signal.len() {
        return 0.0;
    }
    signal
        .iter()
        .zip(&signal[lag..])
        .map(|(a, b)| f64::from(*a) * f64::from(*b))
        .sum()
}

/// Estimates the fundamental frequency of a frame.
///
/// Runs its own volume gate first, so a frame whose RMS falls below
/// `amplitude_threshold` yields `None` even if the caller skipped the check.
///
/// # Arguments
/// * `signal` - Mono time-domain samples
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude_threshold` - Minimum RMS for a frame to be analysed
/// * `min_freq` / `max_freq` - Search band in Hz
///
/// # Returns
/// * `Some(frequency)` - `sample_rate / best_lag`
/// * `None` - Silence, an unusable band, or no lag with positive correlation
pub fn detect_pitch_autocorrelation(
    signal: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
    min_freq: f32,
    max_freq: f32,
) -> Option<f32> {
    if volume::rms(signal) < amplitude_threshold {
        return None;
    }

    let LagRange { min_lag, max_lag } =
        lag_range(signal.len(), sample_rate, min_freq, max_freq)?;

    // Strictly positive correlation is required to accept a lag.
    let mut best_lag = 0;
    let mut best_corr = 0.0_f64;
    for lag in min_lag..=max_lag {
        let corr = autocorrelation(signal, lag);
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    (best_lag > 0).then(|| sample_rate as f32 / best_lag as f32)
}

/// [`detect_pitch_autocorrelation`] over the default 70–1000 Hz band.
pub fn detect_pitch(signal: &[f32], sample_rate: u32, amplitude_threshold: f32) -> Option<f32> {
    detect_pitch_autocorrelation(
        signal,
        sample_rate,
        amplitude_threshold,
        DEFAULT_MIN_FREQUENCY,
        DEFAULT_MAX_FREQUENCY,
    )
}
