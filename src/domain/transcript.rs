use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Guard for the transient audio artifact on disk.
///
/// The file is written once by the recorder side, read once by the engine,
/// and removed when this guard drops — on the success path and on every
/// error path alike.
#[derive(Debug)]
pub struct WavArtifact {
    path: PathBuf,
}

impl WavArtifact {
    /// Take ownership of an artifact that already exists at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WavArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Temp audio artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Failed to remove temp audio artifact"),
        }
    }
}

/// One transcription job, created per Recording -> Transcribing transition
/// and consumed exactly once by the engine.
#[derive(Debug)]
pub struct TranscriptRequest {
    /// Sealed audio, persisted as a WAV artifact.
    pub artifact: WavArtifact,
    /// Model identifier to run inference with.
    pub model: String,
    /// Target language (ISO 639-1 code, e.g. "en").
    pub language: String,
}

/// Result of a transcription.
///
/// Tokens carry their own leading whitespace (the first token carries none),
/// so concatenating the tokens reproduces `text` exactly. Downstream code
/// must not re-tokenize or normalize whitespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Word tokens in model order, spacing included.
    pub tokens: Vec<String>,
    /// Full transcribed text.
    pub text: String,
}

impl TranscriptResult {
    /// Build a result from raw model text, preserving inter-word spacing.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            tokens: split_words(&text),
            text,
        }
    }

    /// An empty result signals the no-speech case.
    pub fn empty() -> Self {
        Self {
            tokens: Vec::new(),
            text: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Split text into word tokens where every token after the first keeps the
/// whitespace that preceded it, so `tokens.concat() == text`.
fn split_words(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        let boundary = !ch.is_whitespace()
            && current.ends_with(|c: char| c.is_whitespace())
            && current.chars().any(|c| !c.is_whitespace());
        if boundary {
            tokens.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
