use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{AudioBuffer, DomainError, WavArtifact};

/// Fixed relative path of the transient audio artifact.
///
/// Single writer (the recorder side), single reader (the engine), deleted
/// after use. The path is a compatibility contract; do not change it.
pub const ARTIFACT_PATH: &str = "assets/dictation.wav";

/// Persist a sealed buffer as a WAV artifact at `path`.
///
/// Returns the guard that owns the file; dropping it removes the file.
pub fn persist_at(buffer: &AudioBuffer, path: &Path) -> Result<WavArtifact, DomainError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let spec = hound::WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in buffer.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    debug!(path = ?path, samples = buffer.len(), "Temp audio artifact written");
    Ok(WavArtifact::new(PathBuf::from(path)))
}

/// Read the artifact back as mono f32 samples in [-1, 1].
///
/// Interleaved channels are downmixed by averaging; Whisper expects mono.
pub fn read_samples(artifact: &WavArtifact) -> Result<Vec<f32>, DomainError> {
    let mut reader = hound::WavReader::open(artifact.path())?;
    let channels = reader.spec().channels as usize;

    let raw = reader
        .samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .map_err(DomainError::from)?;

    let samples = raw
        .chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
            sum / frame.len() as f32
        })
        .collect();

    Ok(samples)
}
