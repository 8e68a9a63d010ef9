use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use presstalk::adapters::{
    ConsoleFeedback, CpalRecorder, EnigoEmitter, JsonConfigStore, RdevHotkeyListener,
    WhisperEngine,
};
use presstalk::app::DictationController;
use presstalk::infrastructure::init_logging;
use presstalk::ports::{ConfigStore, HotkeyListener, Transcriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let store = JsonConfigStore::new().context("failed to initialize config store")?;
    let config = store.load().context("failed to load configuration")?;

    let _log_guard = init_logging(
        &store.logs_dir(),
        &config.logging.level,
        config.logging.file_logging,
    )?;

    info!("Presstalk starting up");
    // The store runs before the subscriber exists, so report its outcome here
    info!(
        path = %store.config_path().display(),
        level = %config.logging.level,
        "Configuration loaded"
    );

    // Load eagerly so a missing model surfaces at startup; the engine tries
    // the fallback once before giving up.
    let engine = Arc::new(WhisperEngine::new(store.data_dir().join("models"), 0));
    engine
        .load(config.model.as_str())
        .await
        .context("failed to load whisper model")?;

    let recorder = Arc::new(CpalRecorder::new(config.audio.clone())?);
    let emitter = Arc::new(EnigoEmitter::new(config.typing.clone())?);
    let feedback = Arc::new(ConsoleFeedback::new(config.ui.clone()));
    let listener = RdevHotkeyListener::new(config.hotkey.clone());

    println!("Presstalk — push-to-talk dictation");
    println!("• Model:  {}", config.model);
    println!("• Hotkey: {} (hold to record)", config.hotkey.label());
    println!("• Config: {}", store.config_path().display());

    let events = listener.listen()?;
    let controller = DictationController::new(
        config,
        recorder,
        engine,
        emitter,
        feedback.clone(),
        feedback,
    );

    // Runs until externally terminated
    tokio::select! {
        _ = controller.run(events) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
        }
    }

    Ok(())
}
