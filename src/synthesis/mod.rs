//! Streaming speech synthesis
//!
//! The core pipeline: a single-use session negotiates the realtime
//! protocol over a WebSocket, streams text up, and forwards audio
//! frames down to the caller as they arrive.

mod protocol;
mod request;
mod session;

pub use protocol::{ClientEvent, ServerEvent, SessionParams};
pub use request::SynthesisRequest;
pub use session::{DEFAULT_ENDPOINT, SessionState, SynthesisSession};
