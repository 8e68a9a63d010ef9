use std::io::Write;

use parking_lot::Mutex;

use crate::domain::config::UiConfig;
use crate::ports::{Indicator, StatusSink};

/// Console implementation of the indicator and status channel.
///
/// The indicator renders as a line on stderr while recording; status lines
/// go to stdout with the `→ / ✓ / !` prefixes users already know.
pub struct ConsoleFeedback {
    ui: UiConfig,
    // Serializes writes so indicator and status lines never interleave
    lock: Mutex<()>,
}

impl ConsoleFeedback {
    pub fn new(ui: UiConfig) -> Self {
        Self {
            ui,
            lock: Mutex::new(()),
        }
    }
}

impl Indicator for ConsoleFeedback {
    fn show(&self) {
        let _guard = self.lock.lock();
        let mut err = std::io::stderr();
        let _ = writeln!(err, "● REC [{}]", self.ui.indicator_color);
    }

    fn hide(&self) {
        let _guard = self.lock.lock();
        let mut err = std::io::stderr();
        let _ = writeln!(err, "○ idle");
    }
}

impl StatusSink for ConsoleFeedback {
    fn status(&self, message: &str) {
        let _guard = self.lock.lock();
        println!("{}", message);
    }
}
