pub mod capture;
pub mod config;
pub mod emitter;
pub mod feedback;
pub mod hotkey;
pub mod transcriber;

pub use capture::AudioCapture;
pub use config::ConfigStore;
pub use emitter::TextEmitter;
pub use feedback::{Indicator, StatusSink};
pub use hotkey::{HotkeyEvent, HotkeyListener};
pub use transcriber::Transcriber;
