//! Wire messages for the realtime synthesis protocol
//!
//! JSON text frames both ways. Server events are decoded once here into
//! a closed enum; the session state machine matches on variants, never
//! on raw type strings.

use serde::{Deserialize, Serialize};

use super::SynthesisRequest;
use crate::audio::SYNTH_SAMPLE_RATE;

/// Client-to-server messages
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Session configuration, sent once after the creation acknowledgment
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Synthesis parameters
        session: SessionParams,
    },

    /// Full request text, appended as one unit
    #[serde(rename = "input_text_buffer.append")]
    TextAppend {
        /// Text to synthesize
        text: String,
    },

    /// No more text will be sent
    #[serde(rename = "session.finish")]
    Finish,
}

impl ClientEvent {
    /// Serialize to a JSON text frame
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `session.update` payload
#[derive(Debug, Serialize)]
pub struct SessionParams {
    /// Voice id
    pub voice: String,

    /// Always "pcm"
    pub response_format: &'static str,

    /// Always 24000
    pub sample_rate: u32,

    /// Always "server_commit"
    pub mode: &'static str,

    /// Resolved language hint
    pub language_type: String,

    /// Fixed output volume
    pub volume: u32,

    /// Speech rate multiplier
    pub speech_rate: f64,

    /// Fixed pitch multiplier
    pub pitch_rate: f64,

    /// Style instruction, present only when the request carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Set alongside `instructions`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize_instructions: Option<bool>,
}

impl SessionParams {
    /// Session configuration for a request, with the protocol's fixed fields
    #[must_use]
    pub fn for_request(request: &SynthesisRequest) -> Self {
        Self {
            voice: request.voice.clone(),
            response_format: "pcm",
            sample_rate: SYNTH_SAMPLE_RATE,
            mode: "server_commit",
            language_type: request.language.clone(),
            volume: 50,
            speech_rate: request.speech_rate,
            pitch_rate: 1.0,
            instructions: request.instruction.clone(),
            optimize_instructions: request.instruction.as_ref().map(|_| true),
        }
    }
}

/// Server-to-client events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Session creation acknowledgment, mandatory first event
    SessionCreated,

    /// One audio frame, base64 PCM in `delta`
    AudioDelta {
        /// Base64-encoded 16-bit LE mono PCM
        delta: String,
    },

    /// One logical text turn finished; the session keeps draining
    ResponseDone,

    /// Terminal success event
    SessionFinished,

    /// Explicit server failure; payload kept verbatim for diagnostics
    Error {
        /// The raw event JSON
        raw: String,
    },

    /// Unrecognized event type, skipped for forward compatibility
    Unknown {
        /// The raw event JSON
        raw: String,
    },
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: String,
}

impl ServerEvent {
    /// Decode one inbound text frame; `None` if it is not valid event JSON
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let event: RawEvent = serde_json::from_str(raw).ok()?;
        Some(match event.kind.as_str() {
            "session.created" => Self::SessionCreated,
            "response.audio.delta" => Self::AudioDelta { delta: event.delta },
            "response.done" => Self::ResponseDone,
            "session.finished" => Self::SessionFinished,
            "error" => Self::Error {
                raw: raw.to_string(),
            },
            _ => Self::Unknown {
                raw: raw.to_string(),
            },
        })
    }
}
