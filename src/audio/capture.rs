//! Microphone capture
//!
//! Fixed-window capture: the caller controls duration by sleeping
//! between `start()` and `stop()`; there is no internal timer or
//! silence detection.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::{AudioContext, CAPTURE_SAMPLE_RATE};
use crate::{Error, Result};

/// Captures PCM from the default input device into an in-memory buffer
///
/// The hardware callback appends 16-bit LE mono bytes under a mutex;
/// the buffer must not be read until `stop()` returns.
pub struct Recorder {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<u8>>>,
    stream: Option<Stream>,
}

impl Recorder {
    /// Create a recorder for the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no input device supports mono capture at the
    /// requested rate
    pub fn new(ctx: &AudioContext) -> Result<Self> {
        Self::with_sample_rate(ctx, CAPTURE_SAMPLE_RATE)
    }

    /// Create a recorder capturing at an explicit sample rate
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened
    pub fn with_sample_rate(ctx: &AudioContext, sample_rate: u32) -> Result<Self> {
        let device = ctx.input_device()?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Device(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| Error::Device("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Open the capture stream and start appending to the buffer
    ///
    /// # Errors
    ///
    /// Returns error if the capture stream cannot be started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        for &sample in data {
                            #[allow(clippy::cast_possible_truncation)]
                            let s = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            buf.extend_from_slice(&s.to_le_bytes());
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;

        stream.play().map_err(|e| Error::Device(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing and return the accumulated PCM bytes
    #[must_use]
    pub fn stop(&mut self) -> Vec<u8> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }

        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }
}
