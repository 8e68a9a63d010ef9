use tokio::sync::mpsc;

use crate::domain::DomainError;

/// A hotkey edge, as opposed to a held-state level signal.
///
/// The listener de-duplicates OS key repeats and only reports transitions of
/// the full configured combo. Partial combos pass through to the OS and are
/// never reported; that decision belongs to the listener, not the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The full combo became satisfied.
    Pressed,
    /// The combo was broken after a matching press (any required key up).
    Released,
}

/// Port for the global hotkey listener.
pub trait HotkeyListener: Send + Sync {
    /// Start delivering edge events on the returned channel.
    ///
    /// The listener runs on its own context so it is never blocked by a
    /// dictation cycle and can always observe the terminating release edge.
    fn listen(&self) -> Result<mpsc::UnboundedReceiver<HotkeyEvent>, DomainError>;
}
