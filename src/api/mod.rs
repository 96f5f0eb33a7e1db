//! One-shot DashScope HTTP API
//!
//! Request/response calls for voice enrollment and single-shot speech
//! recognition. The streaming synthesis path lives in [`crate::synthesis`].

mod client;
mod voices;

pub use client::{ApiClient, EnrolledVoice, MODEL_ASR_FLASH};
pub use voices::{
    MODEL_ENROLLMENT, MODEL_FLASH_REALTIME, MODEL_INSTRUCT_REALTIME, MODEL_VC_REALTIME,
    SYSTEM_VOICES, SystemVoice, is_system_voice, resolve_model,
};
