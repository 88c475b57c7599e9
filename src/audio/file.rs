use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::capture::{AudioCapture, AudioCaptureConfig, AudioFrame, CaptureError, CaptureGrant};

/// WAV-file-backed capture source.
///
/// Streams the file's samples as fixed-duration frames at real-time cadence
/// until the file is exhausted or the grant is released.
pub struct FileCapture {
    path: String,
    config: AudioCaptureConfig,
}

impl FileCapture {
    pub fn new(path: impl Into<String>, config: AudioCaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    fn read_samples(&self) -> Result<(Vec<i16>, u32, u16), CaptureError> {
        let mut reader = hound::WavReader::open(&self.path)
            .map_err(|e| CaptureError::Unavailable(format!("{}: {}", self.path, e)))?;

        let spec = reader.spec();
        let samples: Result<Vec<i16>, _> = match spec.sample_format {
            hound::SampleFormat::Int => reader.samples::<i16>().collect(),
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect(),
        };
        let samples = samples.map_err(|e| CaptureError::Read(e.to_string()))?;

        Ok((samples, spec.sample_rate, spec.channels))
    }
}

#[async_trait::async_trait]
impl AudioCapture for FileCapture {
    async fn acquire(&self) -> Result<Arc<CaptureGrant>, CaptureError> {
        let (samples, sample_rate, channels) = self.read_samples()?;

        info!(
            path = %self.path,
            sample_rate,
            channels,
            samples = samples.len(),
            "acquired file capture source"
        );

        let frame_samples =
            (sample_rate as u64 * channels as u64 * self.config.buffer_duration_ms / 1000) as usize;
        let frame_samples = frame_samples.max(1);

        let (tx, rx) = mpsc::channel(32);
        let (grant, mut stop_rx) = CaptureGrant::new(rx);
        let interval = std::time::Duration::from_millis(self.config.buffer_duration_ms);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut offset = 0usize;
            let mut timestamp_ms = 0u64;

            while offset < samples.len() {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }

                let end = (offset + frame_samples).min(samples.len());
                let frame = AudioFrame {
                    samples: samples[offset..end].to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                offset = end;
                timestamp_ms += interval.as_millis() as u64;

                if tx.send(frame).await.is_err() {
                    // Receiver dropped, transport is gone.
                    break;
                }
            }

            debug!("file capture task finished");
        });

        Ok(Arc::new(grant))
    }

    fn name(&self) -> &str {
        "file"
    }
}
