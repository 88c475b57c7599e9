use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio capture source
#[derive(Debug, Clone)]
pub struct AudioCaptureConfig {
    /// Target sample rate (16kHz for speech pipelines)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioCaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

/// Errors raised while acquiring or running an audio capture source
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("audio capture source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read audio source: {0}")]
    Read(String),
}

/// Exclusive ownership of an acquired capture resource.
///
/// The grant hands out the frame stream exactly once (to the transport)
/// and stops the underlying capture when released. `release` is idempotent:
/// the first call wins, later calls are no-ops.
pub struct CaptureGrant {
    frames: Mutex<Option<mpsc::Receiver<AudioFrame>>>,
    stop: watch::Sender<bool>,
    released: AtomicBool,
}

impl CaptureGrant {
    /// Wrap a frame stream in a grant. Returns the grant plus the stop
    /// signal the capture task must watch.
    pub fn new(frames: mpsc::Receiver<AudioFrame>) -> (Self, watch::Receiver<bool>) {
        let (stop, stop_rx) = watch::channel(false);
        (
            Self {
                frames: Mutex::new(Some(frames)),
                stop,
                released: AtomicBool::new(false),
            },
            stop_rx,
        )
    }

    /// Take the frame stream. Yields `Some` exactly once.
    pub fn take_frames(&self) -> Option<mpsc::Receiver<AudioFrame>> {
        self.frames.lock().ok()?.take()
    }

    /// Stop the capture and mark the grant released. Safe to call any
    /// number of times; only the first call signals the capture task.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        // Capture task may already be gone; nothing to do then.
        let _ = self.stop.send(true);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Audio capture source trait
///
/// Implementations:
/// - File: stream frames from a WAV file (headless deployments, fixtures)
/// - Microphone: requires a platform device backend
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Acquire the capture resource and start streaming frames.
    ///
    /// A failed acquisition must leave nothing running; the caller treats
    /// it as a permission denial and does not retry.
    async fn acquire(&self) -> Result<std::sync::Arc<CaptureGrant>, CaptureError>;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input (needs a platform device backend)
    Microphone,
    /// WAV file input (headless deployments, fixtures)
    File(String),
}

/// Audio capture factory
pub struct AudioCaptureFactory;

impl AudioCaptureFactory {
    pub fn create(
        source: AudioSource,
        config: AudioCaptureConfig,
    ) -> Result<Box<dyn AudioCapture>, CaptureError> {
        match source {
            AudioSource::File(path) => Ok(Box::new(super::FileCapture::new(path, config))),
            AudioSource::Microphone => Ok(Box::new(MicrophoneCapture)),
        }
    }
}

/// Microphone source placeholder. Device capture needs a platform audio
/// backend; until one is wired in, acquisition reports the resource as
/// unavailable so connect surfaces a permission-style failure.
struct MicrophoneCapture;

#[async_trait::async_trait]
impl AudioCapture for MicrophoneCapture {
    async fn acquire(&self) -> Result<std::sync::Arc<CaptureGrant>, CaptureError> {
        Err(CaptureError::Unavailable(
            "microphone capture requires a platform audio backend".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "microphone"
    }
}
