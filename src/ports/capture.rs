use async_trait::async_trait;

use crate::domain::{AudioBuffer, DomainError};

/// Port for microphone capture.
///
/// Implementations own the capture loop on a dedicated execution context and
/// guarantee the returned buffer holds complete frames only, regardless of
/// stop timing.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start appending frames from the input device.
    ///
    /// Idempotent: a no-op when capture is already running.
    async fn start(&self) -> Result<(), DomainError>;

    /// Stop after the current frame completes, seal and return the buffer.
    ///
    /// Returns an error if not currently recording.
    async fn stop(&self) -> Result<AudioBuffer, DomainError>;

    /// Whether a capture is currently running.
    fn is_recording(&self) -> bool;
}
