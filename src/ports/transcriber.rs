use async_trait::async_trait;

use crate::domain::{DomainError, TranscriptRequest, TranscriptResult};

/// Port for speech-to-text inference.
///
/// Implementations cache a loaded model handle and run blocking inference
/// off the caller's context. Stateless across calls apart from that cache.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Lazily load and cache the model for `model_id`.
    ///
    /// On failure the implementation retries exactly once with the fallback
    /// identifier; if that also fails, `DomainError::ModelUnavailable` is
    /// returned and no further retry happens.
    async fn load(&self, model_id: &str) -> Result<(), DomainError>;

    /// Run inference over the whole request.
    ///
    /// The request is consumed; its audio artifact is removed once the
    /// engine has read it, on success and on failure alike. Silence-only
    /// audio yields an empty result, not an error.
    async fn transcribe(&self, request: TranscriptRequest) -> Result<TranscriptResult, DomainError>;

    /// Check if a model is currently loaded.
    fn is_model_loaded(&self) -> bool;
}
