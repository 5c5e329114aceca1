//! # Musical Tuning Module
//!
//! Maps a frequency to the nearest note of a reference set and measures the
//! deviation in cents.
//!
//! The reference set is plain data supplied by the caller. For convenience
//! this module also builds equal-tempered chromatic sets, and exposes the
//! default one the tuner ships with (C2 to B5 at A4 = 440 Hz).
//!
//! ## Cents
//! - 100 cents = 1 semitone, 1200 cents = 1 octave
//! - Positive values are sharp, negative values are flat

use once_cell::sync::Lazy;

use crate::config::DEFAULT_REFERENCE_PITCH;

/// Names of the twelve pitch classes, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A named reference frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceNote {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Frequency in Hz
    pub frequency: f32,
}

impl ReferenceNote {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// The reference note closest to a measured frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    pub note: ReferenceNote,
    /// Rounded deviation from `note` in cents.
    pub cents: i32,
    /// `|frequency - note.frequency|` in Hz.
    pub absolute_difference_hz: f32,
}

/// Default chromatic reference set, C2 to B5 at A4 = 440 Hz.
///
/// Covers the 70-1000 Hz detection band with one note of margin either side.
pub static CHROMATIC_NOTES: Lazy<Vec<ReferenceNote>> =
    Lazy::new(|| chromatic_scale(DEFAULT_REFERENCE_PITCH, 2, 5));

/// Builds an equal-tempered chromatic set from C of `lowest_octave` to B of
/// `highest_octave`, in ascending order.
///
/// `f = reference_pitch * 2^((midi - 69) / 12)`, with A4 = MIDI note 69.
pub fn chromatic_scale(
    reference_pitch: f32,
    lowest_octave: i32,
    highest_octave: i32,
) -> Vec<ReferenceNote> {
    (lowest_octave..=highest_octave)
        .flat_map(|octave| {
            NOTE_NAMES.iter().enumerate().map(move |(pitch_class, name)| {
                let midi = (octave + 1) * 12 + pitch_class as i32;
                let frequency = reference_pitch * 2.0_f32.powf((midi - 69) as f32 / 12.0);
                ReferenceNote::new(format!("{name}{octave}"), frequency)
            })
        })
        .collect()
}

/// Deviation of `frequency` from `target` in cents, unrounded.
pub fn cents_between(frequency: f32, target: f32) -> f32 {
    1200.0 * (frequency / target).log2()
}

/// Finds the reference note closest to `frequency`.
///
/// Scans the whole set by absolute distance in Hz. On a tie the earlier note
/// wins. Returns `None` for an empty set.
pub fn closest(frequency: f32, notes: &[ReferenceNote]) -> Option<NoteMatch> {
    let mut iter = notes.iter();
    let mut best = iter.next()?;
    let mut best_diff = (frequency - best.frequency).abs();

    for note in iter {
        let diff = (frequency - note.frequency).abs();
        if diff < best_diff {
            best = note;
            best_diff = diff;
        }
    }

    Some(NoteMatch {
        note: best.clone(),
        cents: cents_between(frequency, best.frequency).round() as i32,
        absolute_difference_hz: best_diff,
    })
}
