/// Port for the recording indicator shown while capture is active.
///
/// Invoked only on Idle <-> Recording edges; the indicator is visible iff
/// the controller is in the Recording state.
pub trait Indicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Port for the human-readable status channel.
///
/// Messages fire at state entries (recording start/stop, transcribing,
/// success with the transcript text, errors). The exact wording is a UX
/// contract, not a core invariant.
pub trait StatusSink: Send + Sync {
    fn status(&self, message: &str);
}
