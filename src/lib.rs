//! vox - streaming voice I/O client for the DashScope speech service
//!
//! This library provides the core functionality behind the `vox` CLI:
//! - Streaming text-to-speech over the realtime WebSocket protocol
//! - Real-time playback and microphone capture
//! - A content-addressed audio cache that short-circuits the network
//! - One-shot voice enrollment and speech recognition calls
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                     vox CLI                      │
//! │    say   │   hear   │   voice   │  cache  │ auth │
//! └────────────────────┬─────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────┐
//! │  SynthesisSession ──► AudioCache ──► OpusCodec   │
//! │        │                                         │
//! │        ▼                                         │
//! │  AudioSink (render / collect)      Recorder      │
//! └────────────────────┬─────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────┐
//! │    DashScope (realtime WS + one-shot HTTP)       │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod synthesis;

pub use api::ApiClient;
pub use audio::{AudioContext, AudioSink, PcmCollector, Recorder, StreamPlayer, TeeSink};
pub use cache::{AudioCache, CacheKey};
pub use config::Config;
pub use error::{Error, Result};
pub use synthesis::{SynthesisRequest, SynthesisSession};
