use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::domain::{AudioBuffer, AudioSettings, DomainError};
use crate::ports::AudioCapture;

/// Lock-free ring buffer for audio samples.
type RingProducer = ringbuf::HeapProd<i16>;
type RingConsumer = ringbuf::HeapCons<i16>;

/// Commands sent to the capture thread.
enum CaptureCommand {
    Start {
        reply: oneshot::Sender<Result<(), DomainError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<Vec<i16>, DomainError>>,
    },
    Shutdown,
}

/// Audio processing utilities.
mod audio_processing {
    use super::*;

    pub fn get_device() -> Result<Device, DomainError> {
        cpal::default_host()
            .default_input_device()
            .ok_or_else(|| DomainError::AudioDevice {
                message: "No default input device available".to_string(),
            })
    }

    pub fn build_stream_config(device: &Device) -> Result<(StreamConfig, SampleFormat), DomainError> {
        let supported = device
            .default_input_config()
            .map_err(|e| DomainError::AudioDevice {
                message: format!("Failed to get default config: {}", e),
            })?;

        debug!(
            sample_rate = ?supported.sample_rate(),
            channels = supported.channels(),
            format = ?supported.sample_format(),
            "Device default config"
        );

        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, supported.sample_format()))
    }

    pub fn build_stream(
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        settings: &AudioSettings,
        mut producer: RingProducer,
    ) -> Result<Stream, DomainError> {
        let device_channels = config.channels as usize;
        let device_rate = config.sample_rate.0;
        let target_channels = settings.channels as usize;
        let target_rate = settings.rate;
        let frame_len = settings.chunk * target_channels;
        let mut pending: Vec<i16> = Vec::with_capacity(frame_len * 2);

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    process_samples(
                        data,
                        device_channels,
                        device_rate,
                        target_channels,
                        target_rate,
                        frame_len,
                        &mut pending,
                        &mut producer,
                    );
                },
                move |err| error!(?err, "Audio stream error"),
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let i16_data: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                        .collect();
                    process_samples(
                        &i16_data,
                        device_channels,
                        device_rate,
                        target_channels,
                        target_rate,
                        frame_len,
                        &mut pending,
                        &mut producer,
                    );
                },
                move |err| error!(?err, "Audio stream error"),
                None,
            ),
            _ => {
                return Err(DomainError::AudioDevice {
                    message: format!("Unsupported sample format: {:?}", sample_format),
                });
            }
        }
        .map_err(|e| DomainError::AudioDevice {
            message: format!("Failed to build stream: {}", e),
        })?;

        Ok(stream)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_samples(
        data: &[i16],
        device_channels: usize,
        device_rate: u32,
        target_channels: usize,
        target_rate: u32,
        frame_len: usize,
        pending: &mut Vec<i16>,
        producer: &mut RingProducer,
    ) {
        let remapped = remap_channels(data, device_channels, target_channels);

        let resampled = if device_rate != target_rate {
            resample(&remapped, target_channels, device_rate, target_rate)
        } else {
            remapped
        };

        pending.extend_from_slice(&resampled);

        // Hand off whole frames only; a partial tail stays pending until the
        // next callback, or is discarded at stop.
        while pending.len() >= frame_len {
            let frame: Vec<i16> = pending.drain(..frame_len).collect();
            if producer.vacant_len() >= frame_len {
                let _ = producer.push_slice(&frame);
            }
            // Ring full: the recording hit the max duration cap; frames past
            // the cap are dropped whole to keep the ring frame-aligned.
        }
    }

    /// Downmix/upmix the device's interleaved channel layout to the target.
    pub fn remap_channels(data: &[i16], device_channels: usize, target_channels: usize) -> Vec<i16> {
        if device_channels == target_channels {
            return data.to_vec();
        }

        let mut out = Vec::with_capacity(data.len() / device_channels * target_channels);
        for chunk in data.chunks(device_channels) {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            let mono = (sum / chunk.len() as i32) as i16;
            for _ in 0..target_channels {
                out.push(mono);
            }
        }
        out
    }

    /// Linear-interpolation resampler over interleaved samples.
    pub fn resample(samples: &[i16], channels: usize, from_rate: u32, to_rate: u32) -> Vec<i16> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let frames = samples.len() / channels;
        let ratio = from_rate as f64 / to_rate as f64;
        let output_frames = (frames as f64 / ratio).ceil() as usize;
        let mut output = Vec::with_capacity(output_frames * channels);

        for i in 0..output_frames {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos.floor() as usize;
            let frac = src_pos.fract();

            for ch in 0..channels {
                let sample = if src_idx + 1 < frames {
                    let s0 = samples[src_idx * channels + ch] as f64;
                    let s1 = samples[(src_idx + 1) * channels + ch] as f64;
                    (s0 + (s1 - s0) * frac) as i16
                } else if src_idx < frames {
                    samples[src_idx * channels + ch]
                } else {
                    0
                };
                output.push(sample);
            }
        }
        output
    }

    /// Truncate drained samples to whole frames.
    pub fn seal_frames(mut samples: Vec<i16>, frame_len: usize) -> Vec<i16> {
        let whole = samples.len() / frame_len * frame_len;
        samples.truncate(whole);
        samples
    }
}

/// Capture thread runner - creates the Stream on the capture thread since it
/// is not Send.
fn capture_thread_main(
    settings: AudioSettings,
    recording: Arc<AtomicBool>,
    mut cmd_rx: mpsc::Receiver<CaptureCommand>,
) {
    let mut stream: Option<Stream> = None;
    let mut ring_consumer: Option<RingConsumer> = None;
    let frame_len = settings.chunk * settings.channels as usize;

    while let Some(cmd) = cmd_rx.blocking_recv() {
        match cmd {
            CaptureCommand::Start { reply } => {
                let result = (|| -> Result<(), DomainError> {
                    if recording.load(Ordering::Acquire) {
                        // start() is an idempotent no-op mid-recording
                        debug!("Capture already running, start ignored");
                        return Ok(());
                    }

                    let device = audio_processing::get_device()?;
                    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
                    let (stream_config, sample_format) =
                        audio_processing::build_stream_config(&device)?;

                    let ring = HeapRb::<i16>::new(settings.buffer_capacity());
                    let (producer, consumer) = ring.split();

                    let new_stream = audio_processing::build_stream(
                        &device,
                        &stream_config,
                        sample_format,
                        &settings,
                        producer,
                    )?;

                    new_stream.play().map_err(|e| DomainError::AudioDevice {
                        message: format!("Failed to start stream: {}", e),
                    })?;

                    stream = Some(new_stream);
                    ring_consumer = Some(consumer);
                    recording.store(true, Ordering::Release);

                    info!(device = %device_name, "Capture started");
                    Ok(())
                })();
                let _ = reply.send(result);
            }
            CaptureCommand::Stop { reply } => {
                let result = (|| -> Result<Vec<i16>, DomainError> {
                    if !recording.load(Ordering::Acquire) {
                        return Err(DomainError::NotRecording);
                    }

                    // Stop and drop the stream; the callback completes its
                    // current frame before the stream tears down.
                    stream.take();
                    recording.store(false, Ordering::Release);

                    let mut consumer = ring_consumer.take().ok_or(DomainError::NotRecording)?;

                    let available = consumer.occupied_len();
                    let mut samples = vec![0i16; available];
                    let read = consumer.pop_slice(&mut samples);
                    samples.truncate(read);

                    let samples = audio_processing::seal_frames(samples, frame_len);

                    info!(samples = samples.len(), "Capture stopped");
                    Ok(samples)
                })();
                let _ = reply.send(result);
            }
            CaptureCommand::Shutdown => {
                break;
            }
        }
    }
    debug!("Capture thread shutting down");
}

/// cpal-based recorder.
///
/// Uses a dedicated capture thread to host the non-Send Stream; start/stop
/// are command messages answered over oneshot replies, so a caller that has
/// awaited `start()` is guaranteed the capture loop is fully running before
/// the next edge event is processed.
pub struct CpalRecorder {
    settings: AudioSettings,
    recording: Arc<AtomicBool>,
    cmd_tx: mpsc::Sender<CaptureCommand>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CpalRecorder {
    pub fn new(settings: AudioSettings) -> Result<Self, DomainError> {
        let recording = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = mpsc::channel(16);

        let thread_settings = settings.clone();
        let thread_recording = Arc::clone(&recording);

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || capture_thread_main(thread_settings, thread_recording, cmd_rx))
            .map_err(|e| DomainError::AudioDevice {
                message: format!("Failed to spawn capture thread: {}", e),
            })?;

        info!(
            rate = settings.rate,
            channels = settings.channels,
            chunk = settings.chunk,
            max_duration_secs = settings.max_duration_secs,
            "CpalRecorder initialized"
        );

        Ok(Self {
            settings,
            recording,
            cmd_tx,
            thread_handle: Mutex::new(Some(thread_handle)),
        })
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        // try_send: Drop may run inside the async runtime where blocking
        // sends are not allowed
        if self.cmd_tx.try_send(CaptureCommand::Shutdown).is_ok() {
            if let Some(handle) = self.thread_handle.lock().take() {
                let _ = handle.join();
            }
        }
    }
}

#[async_trait]
impl AudioCapture for CpalRecorder {
    async fn start(&self) -> Result<(), DomainError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(CaptureCommand::Start { reply: reply_tx })
            .await
            .map_err(|_| DomainError::AudioDevice {
                message: "Capture thread not running".to_string(),
            })?;

        reply_rx.await.map_err(|_| DomainError::AudioDevice {
            message: "Capture thread did not respond".to_string(),
        })?
    }

    async fn stop(&self) -> Result<AudioBuffer, DomainError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.cmd_tx
            .send(CaptureCommand::Stop { reply: reply_tx })
            .await
            .map_err(|_| DomainError::AudioDevice {
                message: "Capture thread not running".to_string(),
            })?;

        let samples = reply_rx.await.map_err(|_| DomainError::AudioDevice {
            message: "Capture thread did not respond".to_string(),
        })??;

        let mut buffer = AudioBuffer::with_capacity(
            self.settings.rate,
            self.settings.channels,
            self.settings.chunk,
            samples.len(),
        );
        for frame in samples.chunks_exact(buffer.frame_len()) {
            buffer.push_frame(frame)?;
        }

        info!(
            duration_secs = buffer.duration_secs(),
            frames = buffer.frames(),
            "Buffer sealed"
        );

        Ok(buffer)
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }
}
