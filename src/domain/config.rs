use serde::{Deserialize, Serialize};

/// Whisper model identifier, smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelKind {
    /// Fallback used when the configured model fails to load: the smallest,
    /// most reliably loadable one.
    pub const FALLBACK: ModelKind = ModelKind::Tiny;

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Tiny => "tiny",
            ModelKind::Base => "base",
            ModelKind::Small => "small",
            ModelKind::Medium => "medium",
            ModelKind::Large => "large",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Tiny
    }
}

/// Hotkey combination: modifier flags plus one primary key.
/// Immutable once loaded from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    pub ctrl: bool,
    pub shift: bool,
    /// Primary key name, a single letter (e.g. "d").
    pub key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            ctrl: true,
            shift: true,
            key: "d".to_string(),
        }
    }
}

impl HotkeyConfig {
    /// Human-readable combo, e.g. "Ctrl+Shift+D".
    pub fn label(&self) -> String {
        let mut label = String::new();
        if self.ctrl {
            label.push_str("Ctrl+");
        }
        if self.shift {
            label.push_str("Shift+");
        }
        label.push_str(&self.key.to_uppercase());
        label
    }
}

/// Capture sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Int16,
    Int24,
    Int32,
    Float32,
}

/// Audio capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Frame size in samples per channel.
    pub chunk: usize,
    pub format: SampleFormat,
    pub channels: u16,
    /// Sample rate in Hz.
    pub rate: u32,
    /// Captures shorter than this skip inference entirely.
    /// 0.0 means only an empty buffer triggers the no-speech short-circuit.
    pub min_speech_secs: f32,
    /// Hard cap on one recording; bounds the capture ring buffer.
    pub max_duration_secs: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            chunk: 1024,
            format: SampleFormat::Int16,
            channels: 1,
            rate: 16_000,
            min_speech_secs: 0.0,
            max_duration_secs: 30,
        }
    }
}

impl AudioSettings {
    /// Capture ring buffer capacity in samples.
    pub fn buffer_capacity(&self) -> usize {
        self.max_duration_secs as usize * self.rate as usize * self.channels as usize
    }
}

/// Recording indicator settings, consumed by the UI collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub indicator_size: u32,
    pub indicator_color: String,
    pub transparency: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            indicator_size: 12,
            indicator_color: "red".to_string(),
            transparency: 0.7,
        }
    }
}

/// Keystroke emission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Delay in seconds between word batches (never after the last).
    pub word_delay: f64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self { word_delay: 0.1 }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelKind,
    pub language: String,
    pub hotkey: HotkeyConfig,
    pub audio: AudioSettings,
    pub ui: UiConfig,
    pub typing: TypingConfig,
    pub logging: LoggingConfig,
}

// Manual impl so a config file omitting `language` still deserializes to
// "en" rather than the empty string.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::default(),
            language: "en".to_string(),
            hotkey: HotkeyConfig::default(),
            audio: AudioSettings::default(),
            ui: UiConfig::default(),
            typing: TypingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let config = AppConfig::new();
        assert_eq!(config.model, ModelKind::Tiny);
        assert_eq!(config.language, "en");
        assert!(config.hotkey.ctrl);
        assert!(config.hotkey.shift);
        assert_eq!(config.hotkey.key, "d");
        assert_eq!(config.audio.chunk, 1024);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.rate, 16_000);
        assert_eq!(config.audio.format, SampleFormat::Int16);
        assert_eq!(config.ui.indicator_size, 12);
        assert_eq!(config.ui.indicator_color, "red");
    }

    #[test]
    fn test_hotkey_label() {
        assert_eq!(HotkeyConfig::default().label(), "Ctrl+Shift+D");

        let plain = HotkeyConfig {
            ctrl: false,
            shift: false,
            key: "f".to_string(),
        };
        assert_eq!(plain.label(), "F");
    }

    #[test]
    fn test_buffer_capacity() {
        let audio = AudioSettings::default();
        // 30 s * 16000 Hz mono
        assert_eq!(audio.buffer_capacity(), 480_000);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::new();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let loaded: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.model, config.model);
        assert_eq!(loaded.hotkey.key, config.hotkey.key);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let loaded: AppConfig = serde_json::from_str(r#"{"model":"medium"}"#).unwrap();
        assert_eq!(loaded.model, ModelKind::Medium);
        assert_eq!(loaded.audio.rate, 16_000);
        // Omitted language falls back to "en", never the empty string
        assert_eq!(loaded.language, "en");
        assert_eq!(AppConfig::default().language, AppConfig::new().language);
    }
}
