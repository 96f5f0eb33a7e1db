//! Audio playback sinks
//!
//! One contract, two modes: [`StreamPlayer`] renders PCM frames to the
//! output device in real time, [`PcmCollector`] accumulates them in
//! memory. [`TeeSink`] composes two sinks so a caller can play and
//! collect simultaneously.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleRate, Stream};

use super::{AudioContext, SYNTH_SAMPLE_RATE};
use crate::{Error, Result};

/// Hard ceiling on how long `close()` may block waiting for drain
const DRAIN_CEILING: Duration = Duration::from_secs(30);

/// Time the device's own buffers may still hold samples after the shared
/// queue empties; at 24 kHz mono the hardware period is well under this
const DEVICE_GRACE: Duration = Duration::from_millis(500);

/// Queue capacity in samples (~2 s at 24 kHz); the writer blocks when full
const QUEUE_CAPACITY: usize = 48_000;

/// Consumer of PCM frames (16-bit signed LE mono)
pub trait AudioSink {
    /// Append one frame
    ///
    /// # Errors
    ///
    /// Returns error if the sink can no longer accept frames
    fn write(&mut self, pcm: &[u8]) -> Result<()>;

    /// Signal end of stream and block until the sink has drained
    ///
    /// # Errors
    ///
    /// Returns error if the underlying device failed
    fn close(&mut self) -> Result<()>;
}

struct QueueState {
    samples: VecDeque<i16>,
    closed: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    space: Condvar,
    drained: Condvar,
}

/// Renders PCM frames to the default output device as they arrive
///
/// Frames go through a bounded sample queue consumed by the device
/// callback; `write` blocks only on queue capacity, never on the
/// hardware directly. `close` waits for the queue to drain, bounded by
/// a hard ceiling so a misbehaving device cannot hang the caller.
pub struct StreamPlayer {
    shared: Arc<Shared>,
    stream: Option<Stream>,
}

impl StreamPlayer {
    /// Create a player and start the output stream
    ///
    /// # Errors
    ///
    /// Returns error if the output device cannot be opened at 24 kHz
    pub fn new(ctx: &AudioContext) -> Result<Self> {
        let device = ctx.output_device()?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Device(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SYNTH_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SYNTH_SAMPLE_RATE)
            })
            .or_else(|| {
                // Fallback: try stereo
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2
                        && c.min_sample_rate() <= SampleRate(SYNTH_SAMPLE_RATE)
                        && c.max_sample_rate() >= SampleRate(SYNTH_SAMPLE_RATE)
                })
            })
            .ok_or_else(|| Error::Device("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SYNTH_SAMPLE_RATE))
            .config();
        let channels = config.channels as usize;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SYNTH_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                samples: VecDeque::new(),
                closed: false,
            }),
            space: Condvar::new(),
            drained: Condvar::new(),
        });

        let callback_shared = Arc::clone(&shared);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut state = callback_shared.state.lock().unwrap();
                    for frame in data.chunks_mut(channels) {
                        let sample = state
                            .samples
                            .pop_front()
                            .map_or(0.0, |s| f32::from(s) / 32768.0);
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                    if state.samples.len() < QUEUE_CAPACITY {
                        callback_shared.space.notify_one();
                    }
                    if state.closed && state.samples.is_empty() {
                        callback_shared.drained.notify_all();
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Device(e.to_string()))?;

        stream.play().map_err(|e| Error::Device(e.to_string()))?;

        Ok(Self {
            shared,
            stream: Some(stream),
        })
    }
}

impl AudioSink for StreamPlayer {
    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::Device("player is closed".to_string()));
        }

        let deadline = Instant::now() + DRAIN_CEILING;
        let mut state = self.shared.state.lock().unwrap();
        while state.samples.len() >= QUEUE_CAPACITY {
            if Instant::now() >= deadline {
                return Err(Error::Device("playback queue stalled".to_string()));
            }
            let (next, _) = self
                .shared
                .space
                .wait_timeout(state, Duration::from_millis(100))
                .unwrap();
            state = next;
        }

        state
            .samples
            .extend(pcm.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };

        let deadline = Instant::now() + DRAIN_CEILING;
        {
            let mut state = self.shared.state.lock().unwrap();
            state.closed = true;
            while !state.samples.is_empty() && Instant::now() < deadline {
                let (next, _) = self
                    .shared
                    .drained
                    .wait_timeout(state, Duration::from_millis(100))
                    .unwrap();
                state = next;
            }
        }

        // The queue is empty but the device callback may still be pushing
        // its last period to the hardware; wait a fixed grace interval,
        // never past the overall ceiling.
        let grace = DEVICE_GRACE.min(deadline.saturating_duration_since(Instant::now()));
        std::thread::sleep(grace);

        drop(stream);
        tracing::debug!("playback drained");
        Ok(())
    }
}

/// Accumulates PCM frames in memory
#[derive(Debug, Default)]
pub struct PcmCollector {
    buf: Vec<u8>,
}

impl PcmCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected bytes so far
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the collector, returning the collected bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl AudioSink for PcmCollector {
    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(pcm);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fans frames out to two sinks
pub struct TeeSink<A, B> {
    a: A,
    b: B,
}

impl<A: AudioSink, B: AudioSink> TeeSink<A, B> {
    /// Compose two sinks
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }

    /// Take back the composed sinks
    pub fn into_inner(self) -> (A, B) {
        (self.a, self.b)
    }
}

impl<A: AudioSink, B: AudioSink> AudioSink for TeeSink<A, B> {
    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        self.a.write(pcm)?;
        self.b.write(pcm)
    }

    fn close(&mut self) -> Result<()> {
        let first = self.a.close();
        let second = self.b.close();
        first.and(second)
    }
}
