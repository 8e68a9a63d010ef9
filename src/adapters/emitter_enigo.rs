use std::fmt::Display;
use std::time::Duration;

use arboard::Clipboard;
use async_trait::async_trait;
use enigo::{Enigo, Keyboard, Settings};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::config::TypingConfig;
use crate::domain::{DomainError, TranscriptResult};
use crate::ports::TextEmitter;

/// Emit `tokens` through `send` with `delay` between batches and none after
/// the last. A failing batch is logged and skipped; the rest keep going.
fn emit_tokens<E: Display>(
    tokens: &[String],
    delay: Duration,
    mut sleep: impl FnMut(Duration),
    mut send: impl FnMut(&str) -> Result<(), E>,
) {
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            sleep(delay);
        }
        if let Err(e) = send(token) {
            warn!(token = %token, error = %e, "Keystroke batch failed, skipping token");
        }
    }
}

/// Keystroke emitter using enigo, with a clipboard copy of the full text.
///
/// Typing word-by-word at the active cursor is the primary output; the
/// clipboard copy is a convenience so the transcript can also be pasted.
pub struct EnigoEmitter {
    config: TypingConfig,
    clipboard: Mutex<Clipboard>,
}

impl EnigoEmitter {
    pub fn new(config: TypingConfig) -> Result<Self, DomainError> {
        let clipboard = Clipboard::new()
            .map_err(|e| DomainError::Clipboard(format!("Failed to initialize clipboard: {}", e)))?;

        Ok(Self {
            config,
            clipboard: Mutex::new(clipboard),
        })
    }

    /// Best-effort clipboard copy; a failure never blocks typing.
    fn copy_to_clipboard(&self, text: &str) {
        match self.clipboard.lock().set_text(text) {
            Ok(()) => debug!(chars = text.len(), "Transcript copied to clipboard"),
            Err(e) => warn!(error = %e, "Clipboard copy failed"),
        }
    }
}

#[async_trait]
impl TextEmitter for EnigoEmitter {
    async fn emit(&self, result: &TranscriptResult) -> Result<(), DomainError> {
        if result.is_empty() {
            debug!("Empty transcript, nothing to emit");
            return Ok(());
        }

        self.copy_to_clipboard(&result.text);

        info!(tokens = result.tokens.len(), "Typing transcript");

        let tokens = result.tokens.clone();
        let delay = Duration::from_secs_f64(self.config.word_delay);

        // Blocking and strictly sequential: interleaved emission would mix
        // keystrokes non-deterministically at the focused input.
        tokio::task::spawn_blocking(move || {
            let mut enigo = Enigo::new(&Settings::default()).map_err(|e| {
                DomainError::Emission(format!("Failed to create keystroke backend: {}", e))
            })?;

            emit_tokens(&tokens, delay, std::thread::sleep, |token| {
                enigo.text(token)
            });

            Ok::<(), DomainError>(())
        })
        .await
        .map_err(|e| DomainError::Emission(format!("Task join error: {}", e)))??;

        info!("Typing complete");
        Ok(())
    }
}
