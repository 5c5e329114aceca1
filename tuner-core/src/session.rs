//! # Tuner Session
//!
//! Runs a [`TunerProcessor`] against a live [`AudioSource`].
//!
//! ## Threading
//! - **Caller thread**: `start()`, `stop()`, `snapshot()`
//! - **Audio worker**: one dedicated thread that acquires the source, then
//!   `select!`s over incoming frames, the display ticker and the shutdown
//!   signal. Both state writers (frame processing and display smoothing)
//!   therefore run on this one thread, and the processor sits behind a mutex
//!   that `snapshot()` shares.
//!
//! ## Lifecycle
//! `Idle -> Running -> Idle`. `start()` only returns once the source has been
//! acquired or has failed. `stop()` joins the worker before clearing state,
//! so nothing mutates the state after it returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use log::{debug, error, info, warn};

use crate::audio::{AudioSource, CaptureHandle};
use crate::config::TunerConfig;
use crate::error::TunerError;
use crate::frame::Frame;
use crate::processor::{TunerProcessor, TunerSessionState};
use crate::tuning::ReferenceNote;

/// Handle to the dedicated audio thread, used to shut it down.
#[derive(Debug)]
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: JoinHandle<()>,
}

/// A tuner bound to one audio source.
pub struct TunerSession<S: AudioSource> {
    source: Arc<S>,
    processor: Arc<Mutex<TunerProcessor>>,
    worker: Option<AudioWorker>,
}

fn lock(processor: &Mutex<TunerProcessor>) -> MutexGuard<'_, TunerProcessor> {
    // A panic mid-frame leaves the state usable; keep serving it.
    processor.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: AudioSource> TunerSession<S> {
    /// Creates an idle session mapping against `notes`.
    pub fn new(source: S, config: TunerConfig, notes: Vec<ReferenceNote>) -> Self {
        Self {
            source: Arc::new(source),
            processor: Arc::new(Mutex::new(TunerProcessor::new(config, notes))),
            worker: None,
        }
    }

    /// Creates an idle session using the chromatic C2 to B5 set at the
    /// configured reference pitch.
    pub fn with_chromatic_notes(source: S, config: TunerConfig) -> Self {
        Self {
            source: Arc::new(source),
            processor: Arc::new(Mutex::new(TunerProcessor::with_chromatic_notes(config))),
            worker: None,
        }
    }

    /// Starts listening.
    ///
    /// Resets all smoothing state, then acquires the source on a fresh audio
    /// thread. Calling `start()` on a running session does nothing.
    ///
    /// # Errors
    /// [`TunerError::DeviceUnavailable`] if the source cannot be acquired.
    /// The session stays idle with `last_error` set and `start()` may be
    /// retried.
    pub fn start(&mut self) -> Result<(), TunerError> {
        if self.worker.is_some() {
            if self.is_running() {
                debug!("[SESSION] start() called while running, ignoring");
                return Ok(());
            }
            // The capture ended on its own; the worker is exiting.
            self.join_worker();
        }

        let (frame_size, display_interval) = {
            let mut processor = lock(&self.processor);
            processor.reset();
            let config = processor.config();
            (config.frame_size, config.display_interval())
        };

        info!("[SESSION] Starting tuner session...");
        let (ready_tx, ready_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let source = Arc::clone(&self.source);
        let processor = Arc::clone(&self.processor);

        let spawned = thread::Builder::new()
            .name("tuner-audio".to_string())
            .spawn(move || {
                run_audio_thread(
                    source.as_ref(),
                    &processor,
                    frame_size,
                    display_interval,
                    ready_tx,
                    shutdown_rx,
                )
            });
        let thread_handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                return self.fail(TunerError::DeviceUnavailable(format!(
                    "failed to spawn audio thread: {e}"
                )));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("[SESSION] Audio capture started successfully");
                self.worker = Some(AudioWorker {
                    shutdown_tx,
                    thread_handle,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                self.fail(e)
            }
            Err(_) => {
                let _ = thread_handle.join();
                self.fail(TunerError::DeviceUnavailable(
                    "audio thread exited before capture started".to_string(),
                ))
            }
        }
    }

    fn fail(&mut self, e: TunerError) -> Result<(), TunerError> {
        warn!("[SESSION] Could not start capture: {e}");
        let mut processor = lock(&self.processor);
        let state = processor.state_mut();
        state.is_running = false;
        state.last_error = Some(e.clone());
        Err(e)
    }

    /// Stops listening and clears all state.
    ///
    /// Safe to call at any time, including on a session that never started
    /// or has already been stopped.
    pub fn stop(&mut self) {
        if self.worker.is_some() {
            info!("[SESSION] Stopping tuner session...");
            self.join_worker();
        }
        lock(&self.processor).reset();
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            // The worker may already be gone if its capture ended.
            let _ = worker.shutdown_tx.send(());
            if worker.thread_handle.join().is_err() {
                error!("[SESSION] Audio thread panicked");
            }
            debug!("[SESSION] Audio thread finished");
        }
    }

    /// A copy of the current state for the presentation layer.
    pub fn snapshot(&self) -> TunerSessionState {
        lock(&self.processor).state().clone()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.processor).state().is_running
    }

    pub fn config(&self) -> TunerConfig {
        lock(&self.processor).config().clone()
    }
}

impl<S: AudioSource> Drop for TunerSession<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the audio thread.
///
/// Acquires the source, reports the outcome through `ready_tx`, then
/// processes frames and display ticks until shut down or until the capture
/// stream ends. The capture is always released before returning.
fn run_audio_thread<S: AudioSource>(
    source: &S,
    processor: &Mutex<TunerProcessor>,
    frame_size: usize,
    display_interval: Duration,
    ready_tx: Sender<Result<(), TunerError>>,
    shutdown_rx: Receiver<()>,
) {
    debug!("[AUDIO-THREAD] Acquiring audio source...");
    let (frame_tx, frame_rx) = bounded::<Frame>(1);
    let mut capture = match source.acquire(frame_size, frame_tx) {
        Ok(capture) => capture,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    lock(processor).state_mut().is_running = true;
    if ready_tx.send(Ok(())).is_err() {
        capture.release();
        return;
    }

    let ticker = tick(display_interval);
    debug!("[AUDIO-THREAD] Entering audio processing loop...");
    loop {
        select! {
            recv(shutdown_rx) -> _ => {
                debug!("[AUDIO-THREAD] Received shutdown signal");
                break;
            },
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => {
                    lock(processor).process_frame(&frame);
                }
                Err(_) => {
                    warn!("[AUDIO-THREAD] Capture stream closed");
                    lock(processor).state_mut().is_running = false;
                    break;
                }
            },
            recv(ticker) -> _ => {
                lock(processor).display_tick();
            },
        }
    }

    capture.release();
    debug!("[AUDIO-THREAD] Capture released, exiting");
}
