//! # Audio Capture Module
//!
//! The capture side of a tuner session. An [`AudioSource`] is acquired once
//! per session start and pushes fixed-size mono [`Frame`]s into a channel
//! until its [`CaptureHandle`] is released.
//!
//! [`CpalSource`] captures from the default input device through CPAL
//! (Cross-Platform Audio Library). It prefers a 32-bit float configuration
//! close to the requested sample rate, downmixes to mono and cuts the stream
//! into frames.
//!
//! Frames are offered with `try_send` on a channel of capacity one: a frame
//! that arrives while the previous one is still being analysed is dropped,
//! so the analysis never runs behind the microphone.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use log::{debug, error, info, warn};

use crate::error::TunerError;
use crate::frame::Frame;

/// Something that can deliver audio frames to a tuner session.
///
/// `acquire` is called on the session's worker thread; the returned handle
/// stays on that thread and is released there when the session stops.
pub trait AudioSource: Send + Sync + 'static {
    type Handle: CaptureHandle;

    /// Starts delivering frames of `frame_size` samples into `frames`.
    ///
    /// # Errors
    /// [`TunerError::DeviceUnavailable`] when capture cannot be started.
    fn acquire(
        &self,
        frame_size: usize,
        frames: Sender<Frame>,
    ) -> Result<Self::Handle, TunerError>;
}

/// A running capture. Releasing stops delivery and frees the device.
pub trait CaptureHandle {
    /// Stops delivery. Calling it again is a no-op.
    fn release(&mut self);
}

/// Cuts an interleaved sample stream into mono frames.
///
/// Mirrors what a capture callback sees: arbitrary-length chunks of
/// interleaved samples that have to be regrouped into analysis frames.
pub struct FrameAssembler {
    frame_size: usize,
    channels: usize,
    sample_rate: u32,
    buffer: Vec<f32>,
    sender: Sender<Frame>,
    dropped_total: u64,
}

impl FrameAssembler {
    pub fn new(
        frame_size: usize,
        channels: usize,
        sample_rate: u32,
        sender: Sender<Frame>,
    ) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            channels: channels.max(1),
            sample_rate,
            buffer: Vec::with_capacity(frame_size.saturating_mul(2)),
            sender,
            dropped_total: 0,
        }
    }

    /// Frames dropped since this assembler was created.
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    /// Appends interleaved samples and sends every complete frame.
    ///
    /// Returns the number of frames dropped because the receiver was busy.
    /// Drops are logged at `warn` the first time and then at every power of
    /// two, so a stalled analysis does not flood the log from the audio
    /// callback.
    pub fn push(&mut self, data: &[f32]) -> usize {
        let channels = self.channels;
        self.buffer.extend(
            data.chunks(channels)
                .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32),
        );

        let mut dropped = 0;
        while self.buffer.len() >= self.frame_size {
            let samples = self.buffer[..self.frame_size].to_vec();
            self.buffer.drain(..self.frame_size);

            if self.sender.try_send(Frame::new(samples, self.sample_rate)).is_err() {
                dropped += 1;
            }
        }

        if dropped > 0 {
            let before = self.dropped_total;
            self.dropped_total += dropped as u64;
            if before.leading_zeros() != self.dropped_total.leading_zeros() {
                warn!(
                    "[AUDIO] Dropped {dropped} frame(s), analysis busy ({} dropped so far)",
                    self.dropped_total
                );
            }
        }
        dropped
    }
}

/// Captures from the system's default input device.
#[derive(Debug, Clone)]
pub struct CpalSource {
    preferred_sample_rate: u32,
}

impl CpalSource {
    pub fn new(preferred_sample_rate: u32) -> Self {
        Self {
            preferred_sample_rate,
        }
    }
}

fn unavailable(err: impl std::fmt::Display) -> TunerError {
    TunerError::DeviceUnavailable(err.to_string())
}

impl AudioSource for CpalSource {
    type Handle = CpalCapture;

    fn acquire(
        &self,
        frame_size: usize,
        frames: Sender<Frame>,
    ) -> Result<CpalCapture, TunerError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| unavailable("No input device available"))?;

        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
        info!("[AUDIO] Using audio input device: {device_name}");

        let configs = device
            .supported_input_configs()
            .map_err(unavailable)?
            .collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, self.preferred_sample_rate)
            .ok_or_else(|| unavailable("No suitable f32 input format found"))?;

        // `with_sample_rate` panics outside the supported range.
        let sample_rate = self.preferred_sample_rate.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        info!("[AUDIO] Selected sample rate: {sample_rate} Hz, {channels} channel(s)");

        let mut assembler = FrameAssembler::new(frame_size, channels, sample_rate, frames);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Drops are counted and reported by the assembler.
                    assembler.push(data);
                },
                |err| error!("[AUDIO] An error occurred on the audio stream: {err}"),
                None,
            )
            .map_err(unavailable)?;

        stream.play().map_err(unavailable)?;

        Ok(CpalCapture {
            stream: Some(stream),
        })
    }
}

/// A live CPAL input stream.
pub struct CpalCapture {
    stream: Option<cpal::Stream>,
}

impl CaptureHandle for CpalCapture {
    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!("[AUDIO] Stopping input stream");
            if let Err(e) = stream.pause() {
                warn!("[AUDIO] Error pausing stream: {e}");
            }
            drop(stream);
            info!("[AUDIO] Input stream released");
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Picks the supported configuration closest to our needs:
/// 32-bit float samples, mono if possible, and a sample-rate range as close
/// as possible to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let (min, max) = (c.min_sample_rate().0, c.max_sample_rate().0);
            let rate_distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels() != 1, rate_distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn assembles_frames_across_chunks() {
        let (tx, rx) = bounded(4);
        let mut assembler = FrameAssembler::new(4, 1, 8000, tx);

        assert_eq!(assembler.push(&[0.1, 0.2, 0.3]), 0);
        assert!(rx.try_recv().is_err());

        assembler.push(&[0.4, 0.5]);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(frame.sample_rate, 8000);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn downmixes_interleaved_channels() {
        let (tx, rx) = bounded(1);
        let mut assembler = FrameAssembler::new(2, 2, 44100, tx);
        assembler.push(&[1.0, 0.0, -0.5, -0.5]);
        assert_eq!(rx.try_recv().unwrap().samples, vec![0.5, -0.5]);
    }

    #[test]
    fn busy_receiver_drops_frames() {
        let (tx, rx) = bounded(1);
        let mut assembler = FrameAssembler::new(2, 1, 44100, tx);
        let dropped = assembler.push(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(dropped, 2);
        // Only the oldest complete frame was delivered.
        assert_eq!(rx.try_recv().unwrap().samples, vec![0.1, 0.2]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_frames_are_counted_across_pushes() {
        let (tx, rx) = bounded(1);
        let mut assembler = FrameAssembler::new(2, 1, 44100, tx);
        assert_eq!(assembler.push(&[0.1, 0.2, 0.3, 0.4]), 1);
        assert_eq!(assembler.dropped_total(), 1);

        assert_eq!(assembler.push(&[0.5, 0.6, 0.7, 0.8]), 2);
        assert_eq!(assembler.dropped_total(), 3);

        rx.try_recv().unwrap();
        assert_eq!(assembler.push(&[0.9, 1.0]), 0);
        assert_eq!(assembler.dropped_total(), 3);
    }
}
