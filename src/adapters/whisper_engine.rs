use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::adapters::wav_artifact;
use crate::domain::{DomainError, ModelKind, TranscriptRequest, TranscriptResult};
use crate::ports::Transcriber;

/// Cached, lazily loaded inference object keyed by model identifier.
///
/// Replaced wholesale (never mutated) when a fallback load succeeds.
/// `requested` records the id the handle resolved, which may differ from
/// `id` after a fallback; both satisfy later requests.
struct ModelHandle {
    requested: String,
    id: String,
    context: Arc<WhisperContext>,
}

/// A cached handle satisfies a request when the handle was resolved for
/// that id, whether it loaded directly or via the fallback.
fn handle_satisfies(requested: &str, loaded: &str, model_id: &str) -> bool {
    model_id == requested || model_id == loaded
}

/// Transcription engine backed by whisper.cpp via whisper-rs.
pub struct WhisperEngine {
    models_dir: PathBuf,
    threads: u32,
    handle: RwLock<Option<ModelHandle>>,
    load_attempts: AtomicUsize,
}

impl WhisperEngine {
    /// Create a new engine reading models from `models_dir`.
    ///
    /// `threads == 0` means auto-detect (cores - 1).
    pub fn new(models_dir: PathBuf, threads: u32) -> Self {
        let actual_threads = if threads == 0 {
            std::thread::available_parallelism()
                .map(|p| std::cmp::max(1, p.get() as u32 - 1))
                .unwrap_or(1)
        } else {
            threads
        };

        info!(models_dir = ?models_dir, threads = actual_threads, "WhisperEngine created");

        Self {
            models_dir,
            threads: actual_threads,
            handle: RwLock::new(None),
            load_attempts: AtomicUsize::new(0),
        }
    }

    fn model_path(&self, model_id: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{}.bin", model_id))
    }

    /// One load attempt, no fallback.
    async fn try_load(&self, model_id: &str) -> Result<Arc<WhisperContext>, DomainError> {
        let path = self.model_path(model_id);
        if !path.exists() {
            return Err(DomainError::ModelLoad {
                model: model_id.to_string(),
                reason: format!("model file not found: {}", path.display()),
            });
        }

        let attempt = self.load_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        info!(model = model_id, path = ?path, attempt, "Loading whisper model");

        let model = model_id.to_string();
        let path_str = path.to_string_lossy().to_string();

        let ctx = tokio::task::spawn_blocking(move || {
            WhisperContext::new_with_params(&path_str, WhisperContextParameters::default())
                .map_err(|e| DomainError::ModelLoad {
                    model,
                    reason: e.to_string(),
                })
        })
        .await
        .map_err(|e| DomainError::Inference(format!("Task join error: {}", e)))??;

        Ok(Arc::new(ctx))
    }

    #[cfg(test)]
    fn loaded_model_id(&self) -> Option<String> {
        self.handle.read().as_ref().map(|h| h.id.clone())
    }

    #[cfg(test)]
    fn load_attempt_count(&self) -> usize {
        self.load_attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transcriber for WhisperEngine {
    async fn load(&self, model_id: &str) -> Result<(), DomainError> {
        if let Some(handle) = self.handle.read().as_ref() {
            if handle_satisfies(&handle.requested, &handle.id, model_id) {
                debug!(model = model_id, loaded = %handle.id, "Model request already resolved");
                return Ok(());
            }
        }

        let fallback = ModelKind::FALLBACK.as_str();

        let (id, context) = match self.try_load(model_id).await {
            Ok(ctx) => (model_id.to_string(), ctx),
            Err(e) if model_id != fallback => {
                // Fallback is an expected control path, not an exception:
                // exactly one retry with the smallest model.
                warn!(model = model_id, error = %e, "Model load failed, trying fallback");
                match self.try_load(fallback).await {
                    Ok(ctx) => (fallback.to_string(), ctx),
                    Err(fe) => {
                        warn!(model = fallback, error = %fe, "Fallback model load failed");
                        return Err(DomainError::ModelUnavailable {
                            requested: model_id.to_string(),
                            fallback: fallback.to_string(),
                        });
                    }
                }
            }
            Err(e) => {
                warn!(model = model_id, error = %e, "Fallback model load failed");
                return Err(DomainError::ModelUnavailable {
                    requested: model_id.to_string(),
                    fallback: fallback.to_string(),
                });
            }
        };

        info!(model = %id, requested = model_id, "Whisper model loaded");
        *self.handle.write() = Some(ModelHandle {
            requested: model_id.to_string(),
            id,
            context,
        });
        Ok(())
    }

    async fn transcribe(&self, request: TranscriptRequest) -> Result<TranscriptResult, DomainError> {
        // The artifact guard travels with the request; whatever happens
        // below, it is removed when the request is dropped.
        let samples = wav_artifact::read_samples(&request.artifact)?;

        if samples.is_empty() {
            debug!("Empty audio, returning empty transcript");
            return Ok(TranscriptResult::empty());
        }

        self.load(&request.model).await?;

        let ctx = self
            .handle
            .read()
            .as_ref()
            .map(|h| Arc::clone(&h.context))
            .ok_or_else(|| DomainError::Inference("No model loaded".to_string()))?;

        let threads = self.threads;
        let language = request.language.clone();

        debug!(
            samples = samples.len(),
            language = %language,
            threads,
            "Starting transcription"
        );

        let start = std::time::Instant::now();

        // CPU-bound inference runs on the blocking pool
        let text = tokio::task::spawn_blocking(move || {
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_n_threads(threads as i32);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_language(Some(language.as_str()));

            let mut state = ctx.create_state().map_err(|e| {
                DomainError::Inference(format!("Failed to create whisper state: {}", e))
            })?;

            state
                .full(params, &samples)
                .map_err(|e| DomainError::Inference(format!("Transcription failed: {}", e)))?;

            let num_segments = state
                .full_n_segments()
                .map_err(|e| DomainError::Inference(format!("Failed to get segment count: {}", e)))?;

            let mut text = String::new();
            for i in 0..num_segments {
                if let Ok(segment_text) = state.full_get_segment_text(i) {
                    text.push_str(&segment_text);
                }
            }

            Ok::<String, DomainError>(text.trim().to_string())
        })
        .await
        .map_err(|e| DomainError::Inference(format!("Task join error: {}", e)))??;

        info!(
            text_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Transcription complete"
        );

        Ok(TranscriptResult::from_text(text))
    }

    fn is_model_loaded(&self) -> bool {
        self.handle.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AudioBuffer;

    fn engine_without_models() -> WhisperEngine {
        WhisperEngine::new(std::env::temp_dir().join("presstalk_no_models"), 2)
    }

    #[test]
    fn test_engine_starts_unloaded() {
        let engine = engine_without_models();
        assert!(!engine.is_model_loaded());
        assert!(engine.loaded_model_id().is_none());
    }

    #[tokio::test]
    async fn test_load_falls_back_once_then_fails() {
        let engine = engine_without_models();

        let err = engine.load("medium").await.unwrap_err();
        match err {
            DomainError::ModelUnavailable {
                requested,
                fallback,
            } => {
                assert_eq!(requested, "medium");
                assert_eq!(fallback, "tiny");
            }
            other => panic!("expected ModelUnavailable, got {other:?}"),
        }
        assert!(!engine.is_model_loaded());
        // Requested model once, fallback once, nothing more
        assert_eq!(engine.load_attempt_count(), 2);
    }

    #[tokio::test]
    async fn test_load_of_fallback_itself_fails_fatally() {
        let engine = engine_without_models();

        let err = engine.load("tiny").await.unwrap_err();
        assert!(matches!(err, DomainError::ModelUnavailable { .. }));
        assert_eq!(engine.load_attempt_count(), 1);
    }

    #[test]
    fn test_fallback_resolution_satisfies_later_requests() {
        // A handle that resolved "medium" to "tiny" must keep satisfying
        // both ids, or every cycle would re-load the model from disk.
        assert!(handle_satisfies("medium", "tiny", "medium"));
        assert!(handle_satisfies("medium", "tiny", "tiny"));
        assert!(!handle_satisfies("medium", "tiny", "large"));
        assert!(handle_satisfies("tiny", "tiny", "tiny"));
    }

    #[tokio::test]
    async fn test_empty_audio_short_circuits_before_model_load() {
        let engine = engine_without_models();

        let path = std::env::temp_dir().join("presstalk_engine_empty.wav");
        let buffer = AudioBuffer::new(16000, 1, 1024);
        let artifact = wav_artifact::persist_at(&buffer, &path).unwrap();

        let request = TranscriptRequest {
            artifact,
            model: "medium".to_string(),
            language: "en".to_string(),
        };

        // No model exists, yet empty audio must yield an empty result rather
        // than an error, and the artifact must be gone afterwards.
        let result = engine.transcribe(request).await.unwrap();
        assert!(result.is_empty());
        assert!(!engine.is_model_loaded());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_artifact_removed_when_inference_fails() {
        let engine = engine_without_models();

        let path = std::env::temp_dir().join("presstalk_engine_fail.wav");
        let mut buffer = AudioBuffer::new(16000, 1, 4);
        buffer.push_frame(&[100, -100, 200, -200]).unwrap();
        let artifact = wav_artifact::persist_at(&buffer, &path).unwrap();

        let request = TranscriptRequest {
            artifact,
            model: "medium".to_string(),
            language: "en".to_string(),
        };

        // Model load fails, transcribe errors, but the temp file is cleaned.
        assert!(engine.transcribe(request).await.is_err());
        assert!(!path.exists());
    }
}
