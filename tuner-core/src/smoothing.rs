//! # Frequency Smoothing
//!
//! Three independent stages, composed by the processor:
//!
//! 1. [`MovingAverage`] - mean of the last `K` voiced raw estimates. Only
//!    advances on voiced frames.
//! 2. [`LastValidHold`] - most recent smoothed frequency, kept through
//!    silence so the display does not blank between notes.
//! 3. [`DisplaySmoother`] - exponential approach toward the smoothed (or
//!    held) frequency, stepped on its own wall-clock cadence.

/// Fixed-capacity moving average over the most recent values.
///
/// Backed by a ring buffer with a running sum, so pushing never allocates.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buffer: Box<[f32]>,
    // Slot the next value is written to.
    head: usize,
    len: usize,
    sum: f64,
}

impl MovingAverage {
    /// Creates an empty average over `capacity` values (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
            sum: 0.0,
        }
    }

    /// Adds a value, evicting the oldest once full, and returns the new mean.
    pub fn push(&mut self, value: f32) -> f32 {
        let capacity = self.buffer.len();
        if self.len == capacity {
            self.sum -= f64::from(self.buffer[self.head]);
        } else {
            self.len += 1;
        }
        self.buffer[self.head] = value;
        self.sum += f64::from(value);
        self.head = (self.head + 1) % capacity;

        (self.sum / self.len as f64) as f32
    }

    /// Mean of the values currently held, `None` when empty.
    pub fn mean(&self) -> Option<f32> {
        (self.len > 0).then(|| (self.sum / self.len as f64) as f32)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.sum = 0.0;
    }
}

/// Holds the last non-`None` frequency it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastValidHold {
    value: Option<f32>,
}

impl LastValidHold {
    /// Overwrites the held value with `frequency` if it is `Some`; `None`
    /// leaves it unchanged. Returns the held value.
    pub fn update(&mut self, frequency: Option<f32>) -> Option<f32> {
        if frequency.is_some() {
            self.value = frequency;
        }
        self.value
    }

    pub fn get(&self) -> Option<f32> {
        self.value
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

/// Exponential smoothing of the displayed frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySmoother {
    alpha: f32,
    snap_threshold: f32,
    value: Option<f32>,
}

impl DisplaySmoother {
    pub fn new(alpha: f32, snap_threshold: f32) -> Self {
        Self {
            alpha,
            snap_threshold,
            value: None,
        }
    }

    /// Moves the display one step toward `target`.
    ///
    /// Without a target the tick is skipped. Without a current value the
    /// display starts at the target. Otherwise it moves by `alpha` of the
    /// remaining distance, and lands exactly on the target once that distance
    /// is under the snap threshold.
    pub fn step(&mut self, target: Option<f32>) -> Option<f32> {
        let Some(target) = target else {
            return self.value;
        };

        let next = match self.value {
            None => target,
            Some(current) => {
                let delta = target - current;
                if delta.abs() < self.snap_threshold {
                    target
                } else {
                    current + delta * self.alpha
                }
            }
        };
        self.value = Some(next);
        self.value
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

/// Rolling smoothing state owned by the processor.
#[derive(Debug, Clone)]
pub struct SmoothingState {
    pub moving_average: MovingAverage,
    pub last_valid: LastValidHold,
    pub display: DisplaySmoother,
}

impl SmoothingState {
    pub fn new(window: usize, display_alpha: f32, display_snap_hz: f32) -> Self {
        Self {
            moving_average: MovingAverage::new(window),
            last_valid: LastValidHold::default(),
            display: DisplaySmoother::new(display_alpha, display_snap_hz),
        }
    }

    /// Feeds one raw estimate through the frame-rate stages.
    ///
    /// Returns the smoothed frequency for this frame: the new moving average
    /// for a voiced frame, `None` otherwise. The hold is only overwritten by a
    /// voiced frame.
    pub fn push_raw(&mut self, raw: Option<f32>) -> Option<f32> {
        let smoothed = raw.map(|frequency| self.moving_average.push(frequency));
        self.last_valid.update(smoothed);
        smoothed
    }

    /// Runs one display tick toward the smoothed frequency, or the held one
    /// when the current frame had none.
    pub fn display_tick(&mut self, smoothed: Option<f32>) -> Option<f32> {
        self.display.step(smoothed.or(self.last_valid.get()))
    }

    pub fn reset(&mut self) {
        self.moving_average.clear();
        self.last_valid.clear();
        self.display.clear();
    }
}
