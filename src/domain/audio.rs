use crate::domain::DomainError;

/// Sealed capture buffer handed from the recorder to the engine.
///
/// Samples are appended one whole frame at a time during capture and the
/// buffer becomes immutable once sealed, so its length is always a multiple
/// of the frame size. An empty buffer is valid and means "no speech".
#[derive(Debug)]
pub struct AudioBuffer {
    /// PCM samples, interleaved when `channels > 1`.
    samples: Vec<i16>,
    /// Sample rate in Hz.
    sample_rate: u32,
    /// Number of channels.
    channels: u16,
    /// Frame size in samples (`chunk * channels`).
    frame_len: usize,
}

impl AudioBuffer {
    /// Create a new empty audio buffer.
    pub fn new(sample_rate: u32, channels: u16, chunk: usize) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
            frame_len: chunk * channels as usize,
        }
    }

    /// Create an audio buffer with pre-allocated capacity in samples.
    pub fn with_capacity(sample_rate: u32, channels: u16, chunk: usize, capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            sample_rate,
            channels,
            frame_len: chunk * channels as usize,
        }
    }

    /// Append exactly one frame of samples.
    ///
    /// Rejects partial frames so the multiple-of-frame-size invariant can
    /// never be violated, whatever the stop timing.
    pub fn push_frame(&mut self, frame: &[i16]) -> Result<(), DomainError> {
        if frame.len() != self.frame_len {
            return Err(DomainError::AudioDevice {
                message: format!(
                    "Partial frame rejected: got {} samples, frame size is {}",
                    frame.len(),
                    self.frame_len
                ),
            });
        }
        self.samples.extend_from_slice(frame);
        Ok(())
    }

    /// Get the samples as a slice.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frame size in samples.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Number of complete frames captured.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.frame_len
    }

    /// Get the duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }

    /// Check if the buffer is empty (the no-speech case).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }
}
