//! Synthetic capture: a sine generator standing in for a microphone.
//!
//! Used by the CLI's `--simulate` mode and by tests that need a session
//! without audio hardware.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{SendTimeoutError, Sender};
use log::debug;

use crate::audio::{AudioSource, CaptureHandle};
use crate::error::TunerError;
use crate::frame::Frame;

// How often a blocked generator re-checks for release.
const SEND_POLL: Duration = Duration::from_millis(10);

/// A frame of a continuous sine wave, starting `start_sample` samples into it.
pub fn sine_frame(
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
    len: usize,
    start_sample: u64,
) -> Frame {
    let samples = (0..len as u64)
        .map(|i| {
            let t = (start_sample + i) as f64 / f64::from(sample_rate);
            amplitude * (2.0 * PI * f64::from(frequency) * t).sin() as f32
        })
        .collect();
    Frame::new(samples, sample_rate)
}

/// Generates a pure tone, optionally preceded by silence.
///
/// Unlike a device, the generator waits for each frame to be taken before
/// producing the next, so no frame is ever dropped.
#[derive(Debug, Clone)]
pub struct ToneSource {
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
    leading_silence: usize,
    frame_limit: Option<usize>,
    pacing: Option<Duration>,
}

impl ToneSource {
    /// An endless, unpaced tone at amplitude 0.5.
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            frequency,
            amplitude: 0.5,
            sample_rate,
            leading_silence: 0,
            frame_limit: None,
            pacing: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Emits `frames` silent frames before the tone starts.
    pub fn with_leading_silence(mut self, frames: usize) -> Self {
        self.leading_silence = frames;
        self
    }

    /// Ends the stream after `frames` frames in total.
    pub fn with_frame_limit(mut self, frames: usize) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Waits `interval` between frames.
    pub fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = Some(interval);
        self
    }

    /// Paces frames at the rate a real device would deliver them.
    pub fn real_time(self, frame_size: usize) -> Self {
        let interval = Duration::from_secs_f64(frame_size as f64 / f64::from(self.sample_rate));
        self.with_pacing(interval)
    }

    fn frame(&self, index: usize, frame_size: usize) -> Frame {
        if index < self.leading_silence {
            return Frame::silent(frame_size, self.sample_rate);
        }
        let start = ((index - self.leading_silence) * frame_size) as u64;
        sine_frame(self.frequency, self.amplitude, self.sample_rate, frame_size, start)
    }
}

impl AudioSource for ToneSource {
    type Handle = ToneCapture;

    fn acquire(
        &self,
        frame_size: usize,
        frames: Sender<Frame>,
    ) -> Result<ToneCapture, TunerError> {
        let stop = Arc::new(AtomicBool::new(false));
        let source = self.clone();
        let stop_flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("tuner-synth".to_string())
            .spawn(move || {
                let mut index = 0;
                while source.frame_limit.is_none_or(|limit| index < limit) {
                    let mut frame = source.frame(index, frame_size);
                    loop {
                        if stop_flag.load(Ordering::Acquire) {
                            return;
                        }
                        match frames.send_timeout(frame, SEND_POLL) {
                            Ok(()) => break,
                            Err(SendTimeoutError::Timeout(unsent)) => frame = unsent,
                            Err(SendTimeoutError::Disconnected(_)) => return,
                        }
                    }
                    index += 1;
                    if let Some(interval) = source.pacing {
                        thread::sleep(interval);
                    }
                }
                debug!("[SYNTH] Generated {index} frames, ending stream");
            })
            .map_err(|e| {
                TunerError::DeviceUnavailable(format!("failed to start tone generator: {e}"))
            })?;

        Ok(ToneCapture {
            stop,
            thread: Some(thread),
        })
    }
}

/// Handle to a running tone generator.
pub struct ToneCapture {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle for ToneCapture {
    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ToneCapture {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume;
    use crossbeam_channel::bounded;

    #[test]
    fn sine_frames_are_continuous() {
        let whole = sine_frame(110.0, 0.5, 44100, 64, 0);
        let second = sine_frame(110.0, 0.5, 44100, 32, 32);
        assert_eq!(&whole.samples[32..], &second.samples[..]);
        // 4410 samples hold exactly 11 periods of 110 Hz.
        let rms = volume::rms(&sine_frame(110.0, 0.5, 44100, 4410, 0).samples);
        assert!((rms - 0.5 / 2f32.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn silence_then_tone_then_end() {
        let source = ToneSource::new(220.0, 44100)
            .with_leading_silence(2)
            .with_frame_limit(4);
        let (tx, rx) = bounded(1);
        let mut capture = source.acquire(256, tx).unwrap();

        let frames: Vec<Frame> = rx.iter().collect();
        assert_eq!(frames.len(), 4);
        assert!(frames[..2].iter().all(|f| f.samples.iter().all(|&s| s == 0.0)));
        assert!(frames[2..].iter().all(|f| volume::rms(&f.samples) > 0.3));
        assert!(frames.iter().all(|f| f.len() == 256 && f.sample_rate == 44100));

        capture.release();
        capture.release();
    }

    #[test]
    fn release_stops_an_endless_tone() {
        let (tx, rx) = bounded(1);
        let mut capture = ToneSource::new(440.0, 44100).acquire(128, tx).unwrap();
        assert!(rx.recv().is_ok());
        capture.release();
        // The generator thread has exited and dropped its sender.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv().is_err());
    }
}
