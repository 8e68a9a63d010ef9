use thiserror::Error;

/// Domain-level errors for Presstalk.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Audio device error: {message}")]
    AudioDevice { message: String },

    #[error("Not currently recording")]
    NotRecording,

    #[error("Model load failed for '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Model unavailable: '{requested}' and fallback '{fallback}' both failed to load")]
    ModelUnavailable { requested: String, fallback: String },

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Emission error: {0}")]
    Emission(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Hotkey listener error: {0}")]
    Hotkey(String),
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<hound::Error> for DomainError {
    fn from(err: hound::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
