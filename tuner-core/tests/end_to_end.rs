//! Fifty frames of silence followed by fifty frames of A2, fed straight
//! through a processor so every frame can be inspected.

use tuner_core::synth::sine_frame;
use tuner_core::{Frame, TunerConfig, TunerProcessor};

const SAMPLE_RATE: u32 = 44100;
const FRAME_SIZE: usize = 2048;
const A2: f32 = 110.0;

fn run(config: TunerConfig) -> TunerProcessor {
    let mut processor = TunerProcessor::with_chromatic_notes(config);

    for _ in 0..50 {
        let state = processor.process_frame(&Frame::silent(FRAME_SIZE, SAMPLE_RATE));
        assert!(state.volume.is_too_quiet);
        assert_eq!(state.raw_frequency, None);
        assert_eq!(state.smoothed_frequency, None);
        assert_eq!(state.note, None);
        assert_eq!(processor.display_tick(), None);
    }

    for i in 0..50 {
        let frame = sine_frame(A2, 0.5, SAMPLE_RATE, FRAME_SIZE, (i * FRAME_SIZE) as u64);
        let state = processor.process_frame(&frame).clone();
        assert!(!state.volume.is_too_quiet, "tone frame {i} gated");

        let raw = state.raw_frequency.expect("tone frame without pitch");
        assert!((109.0..=112.0).contains(&raw), "frame {i}: raw {raw} Hz");

        let note = state.note.expect("tone frame without note");
        assert_eq!(note.note.name, "A2");

        // Frame 80 onward.
        if i >= 30 {
            let smoothed = state.smoothed_frequency.unwrap();
            assert!((smoothed - A2).abs() < 1.5, "frame {}: smoothed {smoothed} Hz", i + 50);
            assert!(note.cents.abs() <= 20, "frame {}: {} cents", i + 50, note.cents);
        }
        processor.display_tick();
    }

    processor
}

#[test]
fn silence_then_a2_with_default_config() {
    run(TunerConfig::default());
}

#[test]
fn silence_then_a2_on_stage_preset() {
    let processor = run(TunerConfig::stage());
    assert!(processor.state().volume.rms > 0.07);
}

#[test]
fn display_settles_on_the_smoothed_frequency() {
    let mut processor = run(TunerConfig::default());
    let target = processor.state().smoothed_frequency.unwrap();

    let mut ticks = 0;
    while processor.display_tick() != Some(target) {
        ticks += 1;
        assert!(ticks < 200, "display stuck at {:?}", processor.state().display_frequency);
    }
    assert_eq!(processor.state().display_frequency, Some(target));
}

#[test]
fn display_holds_through_a_pause() {
    let mut processor = run(TunerConfig::default());
    let held = processor.state().last_valid_frequency.unwrap();

    for _ in 0..100 {
        processor.process_frame(&Frame::silent(FRAME_SIZE, SAMPLE_RATE));
        processor.display_tick();
    }

    let state = processor.state();
    assert!(state.volume.is_too_quiet);
    assert_eq!(state.smoothed_frequency, None);
    assert_eq!(state.last_valid_frequency, Some(held));
    assert_eq!(state.display_frequency, Some(held));
    assert_eq!(state.note.as_ref().unwrap().note.name, "A2");
}
