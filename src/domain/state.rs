use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Dictation controller state machine.
///
/// State transitions:
/// - Idle -> Recording (hotkey press edge)
/// - Recording -> Transcribing (matching release, non-empty buffer)
/// - Recording -> Idle (matching release, empty or too-short buffer)
/// - Transcribing -> Typing (non-empty transcript)
/// - Transcribing -> Idle (empty transcript or inference failure)
/// - Typing -> Idle (emission complete)
///
/// A press edge received in any state other than Idle is ignored, so a
/// new cycle can never overlap a running one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControllerState {
    /// Waiting for a hotkey press.
    Idle = 0,
    /// Actively capturing audio while the combo is held.
    Recording = 1,
    /// Blocking inference over the sealed buffer is in flight.
    Transcribing = 2,
    /// Paced keystroke emission is in flight.
    Typing = 3,
}

impl ControllerState {
    /// Check if a recording can be started from this state.
    #[must_use]
    pub fn can_start_recording(&self) -> bool {
        matches!(self, ControllerState::Idle)
    }

    /// Check if a release edge has any effect in this state.
    #[must_use]
    pub fn can_stop_recording(&self) -> bool {
        matches!(self, ControllerState::Recording)
    }

    /// Check whether a dictation cycle is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !matches!(self, ControllerState::Idle)
    }
}

impl From<u8> for ControllerState {
    fn from(value: u8) -> Self {
        match value {
            0 => ControllerState::Idle,
            1 => ControllerState::Recording,
            2 => ControllerState::Transcribing,
            3 => ControllerState::Typing,
            // Unknown values map to Idle, the only always-recoverable state
            _ => ControllerState::Idle,
        }
    }
}

impl From<ControllerState> for u8 {
    fn from(state: ControllerState) -> Self {
        state as u8
    }
}

/// Atomic wrapper for ControllerState for lock-free reads.
///
/// Only the controller event loop stores into this; any context may load.
#[derive(Debug)]
pub struct AtomicControllerState(AtomicU8);

impl AtomicControllerState {
    pub fn new(state: ControllerState) -> Self {
        Self(AtomicU8::new(state.into()))
    }

    pub fn load(&self) -> ControllerState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn store(&self, state: ControllerState) {
        self.0.store(state.into(), Ordering::Release);
    }
}

impl Default for AtomicControllerState {
    fn default() -> Self {
        Self::new(ControllerState::Idle)
    }
}
