//! A block of mono time-domain samples and the rate it was captured at.

/// One capture tick worth of audio.
///
/// Samples are nominally in `[-1.0, 1.0]`. A frame is produced once by the
/// capture collaborator and consumed once by the processor.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Mono samples in capture order.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Frame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// A frame of digital silence.
    pub fn silent(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
