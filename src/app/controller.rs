use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::adapters::wav_artifact;
use crate::domain::{
    AppConfig, AtomicControllerState, ControllerState, DomainError, TranscriptRequest,
};
use crate::ports::{AudioCapture, HotkeyEvent, Indicator, StatusSink, TextEmitter, Transcriber};

/// The dictation state machine.
///
/// Owns the only mutable controller state and drives recorder, engine and
/// emitter strictly in sequence per cycle. Hotkey edges arrive on a single
/// consumer channel; completions are awaited inline, so transitions can
/// never race. Edges that queue up while a cycle is in flight are discarded
/// once the cycle reaches Idle.
pub struct DictationController {
    config: AppConfig,
    state: Arc<AtomicControllerState>,
    recorder: Arc<dyn AudioCapture>,
    engine: Arc<dyn Transcriber>,
    emitter: Arc<dyn TextEmitter>,
    indicator: Arc<dyn Indicator>,
    status: Arc<dyn StatusSink>,
    artifact_path: PathBuf,
}

impl DictationController {
    pub fn new(
        config: AppConfig,
        recorder: Arc<dyn AudioCapture>,
        engine: Arc<dyn Transcriber>,
        emitter: Arc<dyn TextEmitter>,
        indicator: Arc<dyn Indicator>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AtomicControllerState::default()),
            recorder,
            engine,
            emitter,
            indicator,
            status,
            artifact_path: PathBuf::from(wav_artifact::ARTIFACT_PATH),
        }
    }

    /// Override the temp artifact location. Split out for tests.
    pub fn with_artifact_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact_path = path.into();
        self
    }

    /// Current state, readable from any context.
    pub fn state(&self) -> ControllerState {
        self.state.load()
    }

    /// Shared handle to the state for collaborators.
    pub fn shared_state(&self) -> Arc<AtomicControllerState> {
        Arc::clone(&self.state)
    }

    /// Consume hotkey edges until the channel closes.
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<HotkeyEvent>) {
        info!(combo = %self.config.hotkey.label(), "Dictation controller running");

        while let Some(event) = events.recv().await {
            match event {
                HotkeyEvent::Pressed if self.state.load().can_start_recording() => {
                    self.begin_recording().await;
                    if self.state.load() == ControllerState::Recording {
                        self.hold_until_release(&mut events).await;
                        // Edges that queued up during the cycle are stale;
                        // dropping them keeps "press while busy" a no-op
                        while events.try_recv().is_ok() {}
                    }
                }
                other => {
                    // No re-entrant recording, and no stop without a start
                    debug!(event = ?other, state = ?self.state.load(), "Edge ignored");
                }
            }
        }

        debug!("Hotkey channel closed, controller stopping");
    }

    /// Recording holds here until the release edge or the duration cap,
    /// whichever comes first; either way the cycle runs on what was captured.
    async fn hold_until_release(&self, events: &mut mpsc::UnboundedReceiver<HotkeyEvent>) {
        let cap = Duration::from_secs(self.config.audio.max_duration_secs as u64);
        let deadline = tokio::time::sleep(cap);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(HotkeyEvent::Released) => return self.run_cycle().await,
                    Some(HotkeyEvent::Pressed) => {
                        debug!("Press edge ignored while recording");
                    }
                    None => return,
                },
                () = &mut deadline => {
                    self.status.status(&format!(
                        "! Recording timed out after {}s",
                        self.config.audio.max_duration_secs
                    ));
                    return self.run_cycle().await;
                }
            }
        }
    }

    /// Idle -> Recording.
    async fn begin_recording(&self) {
        match self.recorder.start().await {
            Ok(()) => {
                self.state.store(ControllerState::Recording);
                self.indicator.show();
                self.status.status("→ Recording... (Release hotkey to stop)");
            }
            Err(e) => self.fail(e),
        }
    }

    /// Recording -> (Transcribing -> Typing ->) Idle, errors included.
    async fn run_cycle(&self) {
        // The indicator is visible iff Recording; leaving Recording hides it
        // before anything else can go wrong.
        self.indicator.hide();

        let buffer = match self.recorder.stop().await {
            Ok(buffer) => buffer,
            Err(e) => return self.fail(e),
        };
        self.status.status("✓ Recording stopped");

        if buffer.is_empty() || buffer.duration_secs() < self.config.audio.min_speech_secs {
            // No-speech short-circuit: Transcribing is never entered
            self.status.status("! No speech detected");
            self.state.store(ControllerState::Idle);
            return;
        }

        self.state.store(ControllerState::Transcribing);
        self.status.status("→ Transcribing audio...");

        let artifact = match wav_artifact::persist_at(&buffer, &self.artifact_path) {
            Ok(artifact) => artifact,
            Err(e) => return self.fail(e),
        };
        drop(buffer);

        let request = TranscriptRequest {
            artifact,
            model: self.config.model.as_str().to_string(),
            language: self.config.language.clone(),
        };

        // The engine owns the request from here; the artifact is removed
        // whichever way inference ends.
        let result = match self.engine.transcribe(request).await {
            Ok(result) => result,
            Err(e) => return self.fail(e),
        };

        if result.is_empty() {
            self.status.status("! No speech detected");
            self.state.store(ControllerState::Idle);
            return;
        }

        self.state.store(ControllerState::Typing);
        if let Err(e) = self.emitter.emit(&result).await {
            return self.fail(e);
        }

        self.status.status(&format!("✓ Transcribed: \"{}\"", result.text));
        self.state.store(ControllerState::Idle);
    }

    /// Single recovery point: report, force the indicator hidden, return to
    /// Idle. The cycle is always left in a recoverable condition.
    fn fail(&self, error: DomainError) {
        error!(error = %error, "Dictation cycle failed");
        self.status.status(&format!("! {}", error));
        self.indicator.hide();
        self.state.store(ControllerState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AudioBuffer, TranscriptResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockRecorder {
        samples: Mutex<Vec<i16>>,
        starts: AtomicUsize,
        stops: AtomicUsize,
        recording: AtomicBool,
    }

    impl MockRecorder {
        fn with_samples(samples: Vec<i16>) -> Arc<Self> {
            Arc::new(Self {
                samples: Mutex::new(samples),
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                recording: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl AudioCapture for MockRecorder {
        async fn start(&self) -> Result<(), DomainError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.recording.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<AudioBuffer, DomainError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.recording.store(false, Ordering::SeqCst);
            let samples = self.samples.lock().clone();
            if samples.is_empty() {
                return Ok(AudioBuffer::new(16000, 1, 1024));
            }
            let mut buffer = AudioBuffer::new(16000, 1, samples.len());
            buffer.push_frame(&samples).unwrap();
            Ok(buffer)
        }

        fn is_recording(&self) -> bool {
            self.recording.load(Ordering::SeqCst)
        }
    }

    struct MockEngine {
        outcome: Mutex<Option<Result<TranscriptResult, DomainError>>>,
        calls: AtomicUsize,
        artifact_present_at_call: AtomicBool,
    }

    impl MockEngine {
        fn returning(result: Result<TranscriptResult, DomainError>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(result)),
                calls: AtomicUsize::new(0),
                artifact_present_at_call: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl Transcriber for MockEngine {
        async fn load(&self, _model_id: &str) -> Result<(), DomainError> {
            Ok(())
        }

        async fn transcribe(
            &self,
            request: TranscriptRequest,
        ) -> Result<TranscriptResult, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.artifact_present_at_call
                .store(request.artifact.path().exists(), Ordering::SeqCst);
            // Dropping the request here removes the artifact, like the real
            // engine does on both outcomes
            self.outcome
                .lock()
                .take()
                .unwrap_or_else(|| Ok(TranscriptResult::empty()))
        }

        fn is_model_loaded(&self) -> bool {
            true
        }
    }

    struct MockEmitter {
        emitted: Mutex<Vec<String>>,
        fail: bool,
    }

    impl MockEmitter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                emitted: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                emitted: Mutex::new(Vec::new()),
                fail: true,
            })
        }
    }

    #[async_trait]
    impl TextEmitter for MockEmitter {
        async fn emit(&self, result: &TranscriptResult) -> Result<(), DomainError> {
            if self.fail {
                return Err(DomainError::Emission("mock emitter down".to_string()));
            }
            self.emitted.lock().push(result.tokens.concat());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockIndicator {
        shows: AtomicUsize,
        hides: AtomicUsize,
        visible: AtomicBool,
    }

    impl Indicator for MockIndicator {
        fn show(&self) {
            self.shows.fetch_add(1, Ordering::SeqCst);
            self.visible.store(true, Ordering::SeqCst);
        }

        fn hide(&self) {
            self.hides.fetch_add(1, Ordering::SeqCst);
            self.visible.store(false, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockStatus {
        messages: Mutex<Vec<String>>,
    }

    impl StatusSink for MockStatus {
        fn status(&self, message: &str) {
            self.messages.lock().push(message.to_string());
        }
    }

    struct Harness {
        controller: DictationController,
        recorder: Arc<MockRecorder>,
        engine: Arc<MockEngine>,
        emitter: Arc<MockEmitter>,
        indicator: Arc<MockIndicator>,
        status: Arc<MockStatus>,
        artifact_path: PathBuf,
    }

    fn harness(
        samples: Vec<i16>,
        engine_outcome: Result<TranscriptResult, DomainError>,
        emitter: Arc<MockEmitter>,
        test_name: &str,
    ) -> Harness {
        let recorder = MockRecorder::with_samples(samples);
        let engine = MockEngine::returning(engine_outcome);
        let indicator = Arc::new(MockIndicator::default());
        let status = Arc::new(MockStatus::default());
        let artifact_path =
            std::env::temp_dir().join(format!("presstalk_ctrl_{}.wav", test_name));
        let _ = std::fs::remove_file(&artifact_path);

        let controller = DictationController::new(
            AppConfig::new(),
            recorder.clone(),
            engine.clone(),
            emitter.clone(),
            indicator.clone(),
            status.clone(),
        )
        .with_artifact_path(artifact_path.clone());

        Harness {
            controller,
            recorder,
            engine,
            emitter,
            indicator,
            status,
            artifact_path,
        }
    }

    async fn drive(controller: &DictationController, events: Vec<HotkeyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);
        controller.run(rx).await;
    }

    fn two_seconds() -> Vec<i16> {
        vec![100i16; 32000]
    }

    #[tokio::test]
    async fn test_full_cycle_types_transcript_and_returns_to_idle() {
        let h = harness(
            two_seconds(),
            Ok(TranscriptResult::from_text("testing one two")),
            MockEmitter::new(),
            "full_cycle",
        );

        drive(
            &h.controller,
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.controller.state(), ControllerState::Idle);
        assert_eq!(h.emitter.emitted.lock().as_slice(), ["testing one two"]);
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 1);
        // Artifact existed when the engine consumed it, and is gone now
        assert!(h.engine.artifact_present_at_call.load(Ordering::SeqCst));
        assert!(!h.artifact_path.exists());
        assert_eq!(h.indicator.shows.load(Ordering::SeqCst), 1);
        assert!(!h.indicator.visible.load(Ordering::SeqCst));

        let messages = h.status.messages.lock().clone();
        assert_eq!(
            messages,
            vec![
                "→ Recording... (Release hotkey to stop)",
                "✓ Recording stopped",
                "→ Transcribing audio...",
                "✓ Transcribed: \"testing one two\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_buffer_short_circuits_to_idle() {
        let h = harness(
            Vec::new(),
            Ok(TranscriptResult::from_text("should never run")),
            MockEmitter::new(),
            "empty_buffer",
        );

        drive(
            &h.controller,
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.controller.state(), ControllerState::Idle);
        // Transcribing and Typing were never entered
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
        assert!(h.emitter.emitted.lock().is_empty());
        assert!(!h.artifact_path.exists());
        assert!(h
            .status
            .messages
            .lock()
            .iter()
            .any(|m| m == "! No speech detected"));
    }

    #[tokio::test]
    async fn test_below_min_duration_skips_inference() {
        let mut h = harness(
            vec![100i16; 8000], // 0.5 s at 16 kHz
            Ok(TranscriptResult::from_text("should never run")),
            MockEmitter::new(),
            "min_duration",
        );
        h.controller.config.audio.min_speech_secs = 1.0;

        drive(
            &h.controller,
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.controller.state(), ControllerState::Idle);
        assert_eq!(h.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_press_while_busy_is_ignored() {
        let h = harness(
            two_seconds(),
            Ok(TranscriptResult::from_text("hello")),
            MockEmitter::new(),
            "press_busy",
        );

        // The second press lands while Recording; the trailing pair queued
        // behind the release is drained as stale
        drive(
            &h.controller,
            vec![
                HotkeyEvent::Pressed,
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
                HotkeyEvent::Pressed,
                HotkeyEvent::Released,
            ],
        )
        .await;

        assert_eq!(h.recorder.starts.load(Ordering::SeqCst), 1);
        assert_eq!(h.recorder.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.controller.state(), ControllerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recording_times_out_at_max_duration() {
        let h = harness(
            two_seconds(),
            Ok(TranscriptResult::from_text("hello")),
            MockEmitter::new(),
            "timeout",
        );

        // Press without a matching release: the duration cap has to stop
        // the recording and transcribe what was captured.
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(HotkeyEvent::Pressed).unwrap();

        tokio::select! {
            _ = h.controller.run(rx) => {}
            _ = tokio::time::sleep(Duration::from_secs(45)) => {}
        }

        assert_eq!(h.recorder.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.controller.state(), ControllerState::Idle);
        assert_eq!(h.emitter.emitted.lock().as_slice(), ["hello"]);
        assert!(h
            .status
            .messages
            .lock()
            .iter()
            .any(|m| m == "! Recording timed out after 30s"));
        drop(tx);
    }

    #[tokio::test]
    async fn test_release_while_idle_is_ignored() {
        let h = harness(
            two_seconds(),
            Ok(TranscriptResult::from_text("hello")),
            MockEmitter::new(),
            "release_idle",
        );

        drive(&h.controller, vec![HotkeyEvent::Released]).await;

        assert_eq!(h.recorder.stops.load(Ordering::SeqCst), 0);
        assert_eq!(h.controller.state(), ControllerState::Idle);
    }

    #[tokio::test]
    async fn test_inference_failure_recovers_and_next_press_works() {
        let h = harness(
            two_seconds(),
            Err(DomainError::Inference("mock inference blew up".to_string())),
            MockEmitter::new(),
            "inference_failure",
        );

        drive(
            &h.controller,
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.controller.state(), ControllerState::Idle);
        assert!(!h.indicator.visible.load(Ordering::SeqCst));
        assert!(!h.artifact_path.exists());
        assert!(h.status.messages.lock().iter().any(|m| m.starts_with('!')));

        // The machine is recoverable: a fresh press starts recording again
        drive(&h.controller, vec![HotkeyEvent::Pressed]).await;
        assert_eq!(h.recorder.starts.load(Ordering::SeqCst), 2);
        assert_eq!(h.controller.state(), ControllerState::Recording);
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_typing() {
        let h = harness(
            two_seconds(),
            Ok(TranscriptResult::empty()),
            MockEmitter::new(),
            "empty_transcript",
        );

        drive(
            &h.controller,
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.controller.state(), ControllerState::Idle);
        assert!(h.emitter.emitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_emitter_failure_forces_idle() {
        let h = harness(
            two_seconds(),
            Ok(TranscriptResult::from_text("hello")),
            MockEmitter::failing(),
            "emitter_failure",
        );

        drive(
            &h.controller,
            vec![HotkeyEvent::Pressed, HotkeyEvent::Released],
        )
        .await;

        assert_eq!(h.controller.state(), ControllerState::Idle);
        assert!(h.status.messages.lock().iter().any(|m| m.starts_with('!')));
    }
}
