pub mod capture_cpal;
pub mod config_store;
pub mod console;
pub mod emitter_enigo;
pub mod hotkey_rdev;
pub mod wav_artifact;
pub mod whisper_engine;

pub use capture_cpal::CpalRecorder;
pub use config_store::JsonConfigStore;
pub use console::ConsoleFeedback;
pub use emitter_enigo::EnigoEmitter;
pub use hotkey_rdev::RdevHotkeyListener;
pub use whisper_engine::WhisperEngine;
