use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::error::{ProviderError, check_status};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const SERVICE: &str = "speech";
const DEFAULT_VOICE: &str = "alloy";

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Short provider label echoed back to clients.
    fn provider_name(&self) -> &str;

    /// Returns MP3 bytes.
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, ProviderError>;
}

pub struct OpenAiSpeechClient {
    http: reqwest::Client,
    api_key: String,
    default_voice: String,
}

impl OpenAiSpeechClient {
    pub fn new(api_key: impl Into<String>, default_voice: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            default_voice: default_voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeechClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http
            .post(OPENAI_SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&SpeechRequest {
                model: "tts-1",
                input: text,
                voice: voice.unwrap_or(&self.default_voice),
                speed: 1.0,
            })
            .send()
            .await?;
        let bytes = check_status(SERVICE, response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Text spoken for a numbered recipe step.
pub fn step_narration(step_number: u32, instruction: &str) -> String {
    format!("Step {}. {}", step_number, instruction)
}

pub fn audio_data_url(audio: &[u8]) -> String {
    format!("data:audio/mpeg;base64,{}", STANDARD.encode(audio))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narration_and_data_url() {
        assert_eq!(step_narration(3, "Fold in the flour."), "Step 3. Fold in the flour.");
        assert_eq!(audio_data_url(b"ID3"), "data:audio/mpeg;base64,SUQz");
    }
}
