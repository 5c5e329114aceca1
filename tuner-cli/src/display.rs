//! # Text Readout
//!
//! Renders a session snapshot as a single status line: volume bar, frequency,
//! note, cents and a needle meter.

use tuner_core::TunerSessionState;

/// The meter spans -50 to +50 cents.
const METER_RANGE: f32 = 50.0;

/// Characters either side of the meter's centre mark.
const METER_HALF_WIDTH: usize = 10;

/// Deviation (cents) within which a note counts as in tune.
pub const IN_TUNE_CENTS: i32 = 5;

const VOLUME_BAR_WIDTH: usize = 10;

/// Formats one line of tuner output.
pub fn render(state: &TunerSessionState) -> String {
    let volume = volume_bar(state.volume.rms);

    if state.volume.is_too_quiet {
        return format!("{volume}  Play louder - signal too quiet");
    }

    let frequency = state.display_frequency.or(state.smoothed_frequency);
    match (frequency, &state.note) {
        (Some(frequency), Some(matched)) => {
            let in_tune = if matched.cents.abs() <= IN_TUNE_CENTS { "  In Tune!" } else { "" };
            format!(
                "{volume}  {frequency:7.1} Hz  {:<3} ({:.2} Hz)  {:+4} cents  {}{in_tune}",
                matched.note.name,
                matched.note.frequency,
                matched.cents,
                cent_meter(matched.cents),
            )
        }
        _ => format!("{volume}  Listening for pitch..."),
    }
}

/// A needle meter: `[` flat ... `|` ... sharp `]`.
pub fn cent_meter(cents: i32) -> String {
    let width = 2 * METER_HALF_WIDTH + 1;
    let offset = (cents as f32 / METER_RANGE * METER_HALF_WIDTH as f32).round() as i64;
    let needle = (METER_HALF_WIDTH as i64 + offset).clamp(0, width as i64 - 1) as usize;

    let meter: String = (0..width)
        .map(|i| match i {
            _ if i == needle => '^',
            _ if i == METER_HALF_WIDTH => '|',
            _ => '-',
        })
        .collect();
    format!("[{meter}]")
}

fn volume_bar(rms: f32) -> String {
    // Full scale at an RMS of 0.1.
    let filled = ((rms * 100.0).clamp(0.0, 1.0) * VOLUME_BAR_WIDTH as f32).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(VOLUME_BAR_WIDTH - filled))
}
