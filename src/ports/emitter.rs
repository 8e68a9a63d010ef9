use async_trait::async_trait;

use crate::domain::{DomainError, TranscriptResult};

/// Port for replaying a transcript as synthetic keystrokes.
#[async_trait]
pub trait TextEmitter: Send + Sync {
    /// Emit the tokens in order as keystroke batches at the active cursor,
    /// with the configured inter-word delay between batches (not after the
    /// last). Spacing carried in the tokens is preserved verbatim.
    ///
    /// Emission is sequential by design; the controller guarantees no other
    /// state is entered until it completes. Per-token failures are logged
    /// and skipped, the remaining tokens keep emitting.
    async fn emit(&self, result: &TranscriptResult) -> Result<(), DomainError>;
}
