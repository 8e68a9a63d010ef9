pub mod audio;
pub mod config;
pub mod error;
pub mod state;
pub mod transcript;

pub use audio::AudioBuffer;
pub use config::{AppConfig, AudioSettings, HotkeyConfig, ModelKind, TypingConfig};
pub use error::DomainError;
pub use state::{AtomicControllerState, ControllerState};
pub use transcript::{TranscriptRequest, TranscriptResult, WavArtifact};
