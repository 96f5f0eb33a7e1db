//! One-shot HTTP client for enrollment and recognition

use serde::Deserialize;
use serde_json::json;

use super::voices::{MODEL_ENROLLMENT, MODEL_VC_REALTIME};
use crate::{Error, Result};

const HTTP_ENDPOINT: &str = "https://dashscope.aliyuncs.com/api/v1";
const ENROLLMENT_PATH: &str = "/services/audio/tts/customization";
const MULTIMODAL_PATH: &str = "/services/aigc/multimodal-generation/generation";

/// Single-shot recognition model
pub const MODEL_ASR_FLASH: &str = "qwen3-asr-flash";

/// An enrolled (cloned) voice as returned by the service
#[derive(Debug, Clone, Deserialize)]
pub struct EnrolledVoice {
    /// Voice id, usable directly in synthesis requests
    pub voice: String,

    /// Language the voice was enrolled for
    #[serde(default)]
    pub language: String,

    /// Synthesis model the voice targets
    #[serde(default)]
    pub target_model: String,
}

#[derive(Deserialize)]
struct EnrollResponse {
    output: EnrollOutput,
}

#[derive(Deserialize)]
struct EnrollOutput {
    voice: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    output: ListOutput,
}

#[derive(Default, Deserialize)]
struct ListOutput {
    #[serde(default)]
    voice_list: Vec<EnrolledVoice>,
}

#[derive(Deserialize)]
struct AsrResponse {
    output: AsrOutput,
}

#[derive(Deserialize)]
struct AsrOutput {
    choices: Vec<AsrChoice>,
}

#[derive(Deserialize)]
struct AsrChoice {
    message: AsrMessage,
}

#[derive(Deserialize)]
struct AsrMessage {
    content: Vec<AsrContent>,
}

#[derive(Deserialize)]
struct AsrContent {
    text: Option<String>,
}

/// Client for the one-shot request/response endpoints
pub struct ApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the production endpoint
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: HTTP_ENDPOINT.to_string(),
        }
    }

    /// Override the base URL (tests point this at a local server)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Enroll a cloned voice from base64 WAV data, returning the voice id
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is malformed
    pub async fn enroll_voice(&self, name: &str, audio_base64: &str) -> Result<String> {
        let body = json!({
            "model": MODEL_ENROLLMENT,
            "input": {
                "action": "create",
                "target_model": MODEL_VC_REALTIME,
                "preferred_name": name,
                "audio": {
                    "data": format!("data:audio/wav;base64,{audio_base64}"),
                },
            },
        });

        let response: EnrollResponse = self.post(ENROLLMENT_PATH, &body).await?;
        Ok(response.output.voice)
    }

    /// List enrolled voices
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn list_voices(&self, page: u32, page_size: u32) -> Result<Vec<EnrolledVoice>> {
        let body = json!({
            "model": MODEL_ENROLLMENT,
            "input": {
                "action": "list",
                "page_size": page_size,
                "page_index": page,
            },
        });

        let response: ListResponse = self.post(ENROLLMENT_PATH, &body).await?;
        Ok(response.output.voice_list)
    }

    /// Delete an enrolled voice
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn delete_voice(&self, voice_id: &str) -> Result<()> {
        let body = json!({
            "model": MODEL_ENROLLMENT,
            "input": {
                "action": "delete",
                "voice": voice_id,
            },
        });

        let _: serde_json::Value = self.post(ENROLLMENT_PATH, &body).await?;
        Ok(())
    }

    /// Transcribe WAV audio in a single request
    ///
    /// `context` is optional domain text that biases recognition; pass
    /// an empty string for none.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response carries no text
    pub async fn transcribe(&self, wav: &[u8], context: &str) -> Result<String> {
        use base64::Engine as _;
        let audio_uri = format!(
            "data:audio/wav;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(wav)
        );

        let body = json!({
            "model": MODEL_ASR_FLASH,
            "input": {
                "messages": [
                    {
                        "role": "system",
                        "content": [{ "text": context }],
                    },
                    {
                        "role": "user",
                        "content": [{ "audio": audio_uri }],
                    },
                ],
            },
            "parameters": {
                "asr_options": { "enable_itn": true },
            },
        });

        let response: AsrResponse = self.post(MULTIMODAL_PATH, &body).await?;
        response
            .output
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content.into_iter().find_map(|c| c.text))
            .ok_or_else(|| Error::Api("no text in recognition response".to_string()))
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("HTTP {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}
