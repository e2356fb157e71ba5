//! Generation-service client.
//!
//! Talks to a Gemini-style `generateContent` REST API: uploads frame images,
//! polls uploaded files until they are ready, and issues JSON-mode generation
//! requests. Every request goes through the retry engine, and the underlying
//! HTTP client is rebuilt between attempts so a broken connection pool never
//! poisons the whole run.

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GenAiError, GenAiResult};
use crate::retry::{call_with_retry, RetryConfig};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";

/// Handle to a file uploaded to the generation service.
///
/// The service processes uploads asynchronously; `state` starts as
/// `PROCESSING` and flips to `ACTIVE` once the file is usable in prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHandle {
    /// Resource name, e.g. `files/abc-123`
    #[serde(default)]
    pub name: String,

    /// URI referenced from prompt parts
    #[serde(default)]
    pub uri: String,

    #[serde(rename = "mimeType", default)]
    pub mime_type: String,

    #[serde(default)]
    pub state: String,
}

impl FileHandle {
    /// Whether the service has finished processing this file.
    pub fn is_active(&self) -> bool {
        self.state.eq_ignore_ascii_case("ACTIVE")
    }
}

/// One element of an ordered prompt: either instructions or an uploaded image.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text(String),
    File(FileHandle),
}

impl PromptPart {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// Client for the generation service.
pub struct GenerationClient {
    api_key: String,
    model: String,
    base_url: String,
    http: RwLock<Client>,
    retry: RetryConfig,
    request_timeout: Duration,
    poll_interval: Duration,
    max_polls: u32,
}

/// Wire format for `generateContent` requests.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    temperature: f64,
}

/// Wire format for `generateContent` responses.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileHandle,
}

impl GenerationClient {
    /// Create a client with an explicit API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: RwLock::new(Client::new()),
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
            max_polls: 60,
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> GenAiResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GenAiError::config("GEMINI_API_KEY not set"))?;
        Ok(Self::new(api_key))
    }

    /// Override the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

    /// Override the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the upload readiness polling schedule.
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn http(&self) -> Client {
        self.http.read().expect("http client lock poisoned").clone()
    }

    /// Rebuild the HTTP client. Called between retry attempts to shed any
    /// broken pooled connections.
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

    /// Upload a file and wait for it to become ready.
    ///
    /// Readiness polling is bounded; if the bound is exceeded the last
    /// observed handle is returned as-is and the caller proceeds with a
    /// possibly not-yet-ready file.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        mime_type: &str,
    ) -> GenAiResult<FileHandle> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GenAiError::config(format!("cannot read {}: {e}", path.display())))?;

        let retry = self.retry_for("upload_file");
        let bytes: &[u8] = &bytes;
        call_with_retry(
            &retry,
            || self.reset_client(),
            || self.upload_and_poll(bytes, mime_type),
        )
        .await
    }

    async fn upload_and_poll(&self, bytes: &[u8], mime_type: &str) -> GenAiResult<FileHandle> {
        let handle = self.upload_once(bytes, mime_type).await?;
        Ok(self.poll_until_active(handle).await)
    }

    async fn upload_once(&self, bytes: &[u8], mime_type: &str) -> GenAiResult<FileHandle> {
        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.base_url, self.api_key
        );

        let response = self
            .http()
            .post(&url)
            .timeout(self.request_timeout)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(bytes.to_vec())
            .send()
            .await?;

        let response = check_status(response).await?;
        let upload: UploadResponse = response.json().await?;
        Ok(upload.file)
    }

    async fn poll_until_active(&self, handle: FileHandle) -> FileHandle {
        if handle.name.is_empty() || handle.is_active() {
            return handle;
        }

        let mut last = handle;
        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            match self.get_file(&last.name).await {
                Ok(current) => {
                    if current.is_active() {
                        return current;
                    }
                    last = current;
                }
                Err(e) => {
                    debug!(file = %last.name, error = %e, "readiness poll failed");
                }
            }
        }

        warn!(
            file = %last.name,
            state = %last.state,
            "file not ready after {} polls, proceeding anyway",
            self.max_polls
        );
        last
    }

    async fn get_file(&self, name: &str) -> GenAiResult<FileHandle> {
        let url = format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key);
        let response = self.http().get(&url).timeout(self.request_timeout).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Issue a JSON-mode generation request and return the parsed value.
    ///
    /// The prompt is an ordered list of text instructions and uploaded file
    /// references. The response text is extracted, stripped of code fences,
    /// and parsed; empty or non-JSON responses are errors that stay inside
    /// the retry budget.
    pub async fn generate_json(&self, parts: &[PromptPart]) -> GenAiResult<Value> {
        let retry = self.retry_for("generate_json");
        call_with_retry(&retry, || self.reset_client(), || self.generate_once(parts)).await
    }

    async fn generate_once(&self, parts: &[PromptPart]) -> GenAiResult<Value> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: parts.iter().map(to_request_part).collect(),
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: 0.0,
            },
        };

        let response = self
            .http()
            .post(&url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let generated: GenerateResponse = response.json().await?;
        let text = extract_text(&generated)?;
        parse_json_response(&text)
    }
}

fn to_request_part(part: &PromptPart) -> RequestPart {
    match part {
        PromptPart::Text(text) => RequestPart {
            text: Some(text.clone()),
            file_data: None,
        },
        PromptPart::File(handle) => RequestPart {
            text: None,
            file_data: Some(FileData {
                mime_type: handle.mime_type.clone(),
                file_uri: handle.uri.clone(),
            }),
        },
    }
}

async fn check_status(response: reqwest::Response) -> GenAiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GenAiError::Status { status, body })
}

/// Extract response text with a fixed priority order: the first part of the
/// first candidate, then every text part joined, then a descriptive
/// empty-response error carrying the prompt feedback.
fn extract_text(response: &GenerateResponse) -> GenAiResult<String> {
    let primary = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .unwrap_or_default()
        .trim()
        .to_string();

    let text = if primary.is_empty() {
        response
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        primary
    };

    if text.is_empty() {
        let feedback = response
            .prompt_feedback
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string());
        return Err(GenAiError::empty_response(feedback));
    }
    Ok(text)
}

/// Strip markdown code-fence markers the model sometimes wraps JSON in.
fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn parse_json_response(text: &str) -> GenAiResult<Value> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|_| GenAiError::malformed_response(&cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_from(value: Value) -> GenerateResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_text_primary_field() {
        let resp = response_from(json!({
            "candidates": [{"content": {"parts": [{"text": "[1, 2]"}]}}]
        }));
        assert_eq!(extract_text(&resp).unwrap(), "[1, 2]");
    }

    #[test]
    fn test_extract_text_joins_parts_when_primary_empty() {
        let resp = response_from(json!({
            "candidates": [{"content": {"parts": [
                {"text": ""},
                {"text": "{\"a\":"},
                {"text": " 1}"}
            ]}}]
        }));
        assert_eq!(extract_text(&resp).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_text_empty_is_descriptive_error() {
        let resp = response_from(json!({
            "candidates": [],
            "promptFeedback": {"blockReason": "SAFETY"}
        }));
        match extract_text(&resp) {
            Err(GenAiError::EmptyResponse { feedback }) => {
                assert!(feedback.contains("SAFETY"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fenced_json_parses_like_unfenced() {
        let fenced = "```json\n[{\"start\": 3}]\n```";
        let unfenced = "[{\"start\": 3}]";
        assert_eq!(
            parse_json_response(fenced).unwrap(),
            parse_json_response(unfenced).unwrap()
        );
    }

    #[test]
    fn test_non_json_response_carries_preview() {
        let text = "I could not find any events in this video.";
        match parse_json_response(text) {
            Err(GenAiError::MalformedResponse { preview }) => {
                assert!(preview.starts_with("I could not"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_request_part_serialization_shapes() {
        let text = serde_json::to_value(to_request_part(&PromptPart::text("hi"))).unwrap();
        assert_eq!(text, json!({"text": "hi"}));

        let handle = FileHandle {
            name: "files/f1".to_string(),
            uri: "https://files/f1".to_string(),
            mime_type: "image/jpeg".to_string(),
            state: "ACTIVE".to_string(),
        };
        let file = serde_json::to_value(to_request_part(&PromptPart::File(handle))).unwrap();
        assert_eq!(
            file,
            json!({"fileData": {"mimeType": "image/jpeg", "fileUri": "https://files/f1"}})
        );
    }
}
