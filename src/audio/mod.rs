//! Audio device handling
//!
//! Playback sinks, microphone capture, the external Opus transcoder
//! bridge, and WAV interchange. All PCM in this crate is 16-bit signed
//! little-endian mono.

mod capture;
mod codec;
mod playback;
mod wav;

pub use capture::Recorder;
pub use codec::{CodecError, OpusCodec};
pub use playback::{AudioSink, PcmCollector, StreamPlayer, TeeSink};
pub use wav::{pcm_to_wav, write_wav_file};

use cpal::traits::HostTrait;

use crate::{Error, Result};

/// Sample rate of synthesized audio (Hz)
pub const SYNTH_SAMPLE_RATE: u32 = 24000;

/// Sample rate for microphone capture (Hz)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Shared handle to the host audio system
///
/// Constructed once by the CLI layer and passed by reference to every
/// sink and recorder, so device discovery happens in one place and
/// teardown follows normal drop order at process exit.
pub struct AudioContext {
    host: cpal::Host,
}

impl AudioContext {
    /// Initialize the default host audio system
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// The default output device
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn output_device(&self) -> Result<cpal::Device> {
        self.host
            .default_output_device()
            .ok_or_else(|| Error::Device("no output device available".to_string()))
    }

    /// The default input device
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available
    pub fn input_device(&self) -> Result<cpal::Device> {
        self.host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device available".to_string()))
    }
}

impl Default for AudioContext {
    fn default() -> Self {
        Self::new()
    }
}
