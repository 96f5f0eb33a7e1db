//! Voice catalog and model routing

/// Realtime synthesis model for system voices
pub const MODEL_FLASH_REALTIME: &str = "qwen3-tts-flash-realtime";

/// Realtime synthesis model honoring style instructions
pub const MODEL_INSTRUCT_REALTIME: &str = "qwen3-tts-instruct-flash-realtime";

/// Realtime synthesis model for enrolled (cloned) voices
pub const MODEL_VC_REALTIME: &str = "qwen3-tts-vc-realtime-2026-01-15";

/// Voice enrollment model
pub const MODEL_ENROLLMENT: &str = "qwen-voice-enrollment";

/// A preset voice shipped with the service
#[derive(Debug, Clone, Copy)]
pub struct SystemVoice {
    /// Voice id, passed as-is in synthesis requests
    pub id: &'static str,
    /// Languages the voice speaks
    pub language: &'static str,
    /// Voice gender
    pub gender: &'static str,
}

/// System preset voices for the flash realtime model
pub const SYSTEM_VOICES: &[SystemVoice] = &[
    SystemVoice { id: "Cherry", language: "zh/en", gender: "Female" },
    SystemVoice { id: "Ethan", language: "zh/en", gender: "Male" },
    SystemVoice { id: "Chelsie", language: "zh/en", gender: "Female" },
    SystemVoice { id: "Serena", language: "zh/en", gender: "Female" },
    SystemVoice { id: "Dylan", language: "zh (Beijing)", gender: "Male" },
    SystemVoice { id: "Jada", language: "zh (Shanghai)", gender: "Female" },
    SystemVoice { id: "Sunny", language: "zh (Sichuan)", gender: "Female" },
];

/// Whether the given voice id is a system preset
#[must_use]
pub fn is_system_voice(voice_id: &str) -> bool {
    SYSTEM_VOICES.iter().any(|v| v.id == voice_id)
}

/// Pick the synthesis model for a voice
///
/// Enrolled voice ids route to the voice-clone model; system voices use
/// the flash model, or the instruct model when a style instruction is
/// present (instructions are only honored for system voices).
#[must_use]
pub fn resolve_model(voice_id: &str, has_instruction: bool) -> &'static str {
    if is_system_voice(voice_id) {
        if has_instruction {
            MODEL_INSTRUCT_REALTIME
        } else {
            MODEL_FLASH_REALTIME
        }
    } else {
        MODEL_VC_REALTIME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_voices_route_to_flash() {
        assert_eq!(resolve_model("Cherry", false), MODEL_FLASH_REALTIME);
        assert_eq!(resolve_model("Ethan", false), MODEL_FLASH_REALTIME);
    }

    #[test]
    fn instruction_routes_system_voice_to_instruct_model() {
        assert_eq!(resolve_model("Cherry", true), MODEL_INSTRUCT_REALTIME);
    }

    #[test]
    fn cloned_voices_route_to_vc_model() {
        let cloned = "qwen-tts-vc-mine-voice-123";
        assert_eq!(resolve_model(cloned, false), MODEL_VC_REALTIME);
        // instructions are ignored for cloned voices
        assert_eq!(resolve_model(cloned, true), MODEL_VC_REALTIME);
    }
}
