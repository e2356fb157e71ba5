//! Speech-synthesis client.
//!
//! Talks to a `text:synthesize` REST API that accepts text plus a voice name
//! and speaking rate and returns base64-encoded MP3 bytes. All requests run
//! through the retry engine.

use std::sync::RwLock;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{GenAiError, GenAiResult};
use crate::retry::{call_with_retry, RetryConfig};

const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// A voice offered by the speech service.
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub name: String,
    #[serde(rename = "languageCodes", default)]
    pub language_codes: Vec<String>,
}

/// Client for the speech-synthesis service.
pub struct TtsClient {
    api_key: String,
    base_url: String,
    http: RwLock<Client>,
    retry: RetryConfig,
    request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest {
    input: SynthesisInput,
    voice: VoiceSelection,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput {
    text: String,
}

#[derive(Debug, Serialize)]
struct VoiceSelection {
    #[serde(rename = "languageCode")]
    language_code: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: String,
    #[serde(rename = "speakingRate")]
    speaking_rate: f64,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent", default)]
    audio_content: String,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<Voice>,
}

impl TtsClient {
    /// Create a client with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: RwLock::new(Client::new()),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Create a client from the `TTS_API_KEY` environment variable.
    pub fn from_env() -> GenAiResult<Self> {
        let api_key =
            std::env::var("TTS_API_KEY").map_err(|_| GenAiError::config("TTS_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    /// Override the service base URL (used by tests against a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the retry budget and backoff schedule.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn http(&self) -> Client {
        self.http.read().expect("http client lock poisoned").clone()
    }

    fn reset_client(&self) {
        let mut guard = self.http.write().expect("http client lock poisoned");
        *guard = Client::new();
    }

    fn retry_for(&self, operation: &str) -> RetryConfig {
        RetryConfig {
            operation_name: operation.to_string(),
            ..self.retry.clone()
        }
    }

    /// Synthesize one line of narration to MP3 bytes.
    pub async fn synthesize(&self, text: &str, voice: &str, rate: f64) -> GenAiResult<Vec<u8>> {
        let retry = self.retry_for("synthesize");
        call_with_retry(
            &retry,
            || self.reset_client(),
            || self.synthesize_once(text, voice, rate),
        )
        .await
    }

    async fn synthesize_once(&self, text: &str, voice: &str, rate: f64) -> GenAiResult<Vec<u8>> {
        let url = format!("{}/v1/text:synthesize?key={}", self.base_url, self.api_key);

        let request = SynthesizeRequest {
            input: SynthesisInput {
                text: text.to_string(),
            },
            voice: VoiceSelection {
                language_code: language_code_of(voice),
                name: voice.to_string(),
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3".to_string(),
                speaking_rate: rate,
            },
        };

        let response = self
            .http()
            .post(&url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::Status { status, body });
        }

        let synthesized: SynthesizeResponse = response.json().await?;
        if synthesized.audio_content.is_empty() {
            return Err(GenAiError::empty_response("no audioContent in response"));
        }
        base64::engine::general_purpose::STANDARD
            .decode(&synthesized.audio_content)
            .map_err(|e| GenAiError::AudioDecode(e.to_string()))
    }

    /// List the voices the service offers.
    pub async fn list_voices(&self) -> GenAiResult<Vec<Voice>> {
        let retry = self.retry_for("list_voices");
        call_with_retry(&retry, || self.reset_client(), || self.list_voices_once()).await
    }

    async fn list_voices_once(&self) -> GenAiResult<Vec<Voice>> {
        let url = format!("{}/v1/voices?key={}", self.base_url, self.api_key);
        let response = self
            .http()
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenAiError::Status { status, body });
        }

        let listed: VoicesResponse = response.json().await?;
        Ok(listed.voices)
    }
}

/// Derive the language code from a voice name like `en-US-Standard-C`.
fn language_code_of(voice: &str) -> String {
    let mut parts = voice.split('-');
    match (parts.next(), parts.next()) {
        (Some(lang), Some(region)) if !lang.is_empty() && !region.is_empty() => {
            format!("{lang}-{region}")
        }
        _ => "en-US".to_string(),
    }
}
