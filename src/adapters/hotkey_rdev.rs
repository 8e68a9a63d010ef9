use std::thread;

use rdev::{EventType, Key};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::domain::{DomainError, HotkeyConfig};
use crate::ports::{HotkeyEvent, HotkeyListener};

fn is_ctrl(key: Key) -> bool {
    matches!(key, Key::ControlLeft | Key::ControlRight)
}

fn is_shift(key: Key) -> bool {
    matches!(key, Key::ShiftLeft | Key::ShiftRight)
}

/// Map a configured primary key name to an rdev key.
fn parse_key(name: &str) -> Result<Key, DomainError> {
    let lower = name.to_lowercase();
    let key = match lower.as_str() {
        "a" => Key::KeyA,
        "b" => Key::KeyB,
        "c" => Key::KeyC,
        "d" => Key::KeyD,
        "e" => Key::KeyE,
        "f" => Key::KeyF,
        "g" => Key::KeyG,
        "h" => Key::KeyH,
        "i" => Key::KeyI,
        "j" => Key::KeyJ,
        "k" => Key::KeyK,
        "l" => Key::KeyL,
        "m" => Key::KeyM,
        "n" => Key::KeyN,
        "o" => Key::KeyO,
        "p" => Key::KeyP,
        "q" => Key::KeyQ,
        "r" => Key::KeyR,
        "s" => Key::KeyS,
        "t" => Key::KeyT,
        "u" => Key::KeyU,
        "v" => Key::KeyV,
        "w" => Key::KeyW,
        "x" => Key::KeyX,
        "y" => Key::KeyY,
        "z" => Key::KeyZ,
        "space" => Key::Space,
        other => {
            return Err(DomainError::Hotkey(format!(
                "Unsupported hotkey primary key: '{}'",
                other
            )))
        }
    };
    Ok(key)
}

/// Level-to-edge translation for one hotkey combo.
///
/// Tracks modifier and primary key levels from the raw key stream and emits
/// de-duplicated press/release edges of the full combo only. Partial combos
/// produce nothing here and therefore pass through to the OS untouched.
struct ComboTracker {
    requires_ctrl: bool,
    requires_shift: bool,
    primary: Key,
    ctrl_down: bool,
    shift_down: bool,
    active: bool,
}

impl ComboTracker {
    fn new(config: &HotkeyConfig) -> Result<Self, DomainError> {
        Ok(Self {
            requires_ctrl: config.ctrl,
            requires_shift: config.shift,
            primary: parse_key(&config.key)?,
            ctrl_down: false,
            shift_down: false,
            active: false,
        })
    }

    fn modifiers_satisfied(&self) -> bool {
        (!self.requires_ctrl || self.ctrl_down) && (!self.requires_shift || self.shift_down)
    }

    /// Feed one raw event; returns an edge when the full combo transitions.
    fn observe(&mut self, event: &EventType) -> Option<HotkeyEvent> {
        match *event {
            EventType::KeyPress(key) => {
                if is_ctrl(key) {
                    self.ctrl_down = true;
                }
                if is_shift(key) {
                    self.shift_down = true;
                }
                // Held keys repeat press events; `active` de-duplicates them
                if key == self.primary && !self.active && self.modifiers_satisfied() {
                    self.active = true;
                    return Some(HotkeyEvent::Pressed);
                }
                None
            }
            EventType::KeyRelease(key) => {
                if is_ctrl(key) {
                    self.ctrl_down = false;
                }
                if is_shift(key) {
                    self.shift_down = false;
                }
                // Releasing any required member of the active combo ends the
                // hold; releases that do not match the last press are ignored
                let breaks_combo = key == self.primary
                    || (self.requires_ctrl && is_ctrl(key))
                    || (self.requires_shift && is_shift(key));
                if self.active && breaks_combo {
                    self.active = false;
                    return Some(HotkeyEvent::Released);
                }
                None
            }
            _ => None,
        }
    }
}

/// Global hotkey listener on a dedicated rdev thread.
pub struct RdevHotkeyListener {
    config: HotkeyConfig,
}

impl RdevHotkeyListener {
    pub fn new(config: HotkeyConfig) -> Self {
        Self { config }
    }
}

impl HotkeyListener for RdevHotkeyListener {
    fn listen(&self) -> Result<mpsc::UnboundedReceiver<HotkeyEvent>, DomainError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tracker = ComboTracker::new(&self.config)?;
        let label = self.config.label();

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!(combo = %label, "Hotkey listener started");
                if let Err(e) = rdev::listen(move |event| {
                    if let Some(edge) = tracker.observe(&event.event_type) {
                        debug!(?edge, "Hotkey edge");
                        // Receiver gone means the app is shutting down
                        let _ = tx.send(edge);
                    }
                }) {
                    error!(?e, "Hotkey listener failed");
                }
            })
            .map_err(|e| DomainError::Hotkey(format!("Failed to spawn listener thread: {}", e)))?;

        Ok(rx)
    }
}
