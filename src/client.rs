//! Generation-service adapter: token counting and text generation.
//!
//! The orchestrators only see the [`GenerationClient`] trait, so tests swap in
//! scripted fakes and the retry policy stays independent of transport details.
//! The shipped implementation talks to the Gemini REST API over blocking
//! HTTP, which matches the sequential one-call-at-a-time execution model of
//! the pipeline.
//!
//! Error taxonomy: transport failures, HTTP error statuses, and malformed
//! response bodies are distinct variants, but all three are retryable at the
//! orchestrator. The distinction exists for logs and tests, not for policy.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Failure modes surfaced by a generation client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network/timeout/body-decode failure before an HTTP status arrived.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered with an error status.
    #[error("service returned HTTP {status}")]
    Service { status: u16 },
    /// A 2xx response whose body does not carry usable content.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A web reference the service claims grounded its answer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

/// Per-call knobs forwarded to the service.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    /// Attach the web-search grounding tool to the request.
    pub search_grounding: bool,
}

/// One successful generation: concatenated text plus any citations.
#[derive(Debug, Clone)]
pub struct GenerationReply {
    pub text: String,
    pub citations: Vec<GroundingSource>,
}

/// The two operations the pipeline needs from a text-generation service.
pub trait GenerationClient {
    /// Count input tokens for `content` under `model`.
    fn count_tokens(&self, model: &str, content: &str) -> Result<u64, ClientError>;

    /// Submit `content` to `model` and return the generated text.
    fn generate_content(
        &self,
        model: &str,
        content: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationReply, ClientError>;
}

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Blocking Gemini REST client.
pub struct GeminiClient {
    agent: ureq::Agent,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    fn endpoint(&self, model: &str, verb: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, verb, self.api_key
        )
    }

    fn post(&self, url: &str, body: serde_json::Value) -> Result<serde_json::Value, ClientError> {
        let mut response = self
            .agent
            .post(url)
            .send_json(body)
            .map_err(map_ureq_error)?;
        response
            .body_mut()
            .read_json()
            .map_err(|err| ClientError::Transport(format!("read response body: {err}")))
    }
}

fn map_ureq_error(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::StatusCode(status) => ClientError::Service { status },
        other => ClientError::Transport(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

impl GenerationClient for GeminiClient {
    fn count_tokens(&self, model: &str, content: &str) -> Result<u64, ClientError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": content }] }],
        });
        let raw = self.post(&self.endpoint(model, "countTokens"), body)?;
        let parsed: CountTokensResponse = serde_json::from_value(raw)
            .map_err(|err| ClientError::Malformed(format!("countTokens body: {err}")))?;
        Ok(parsed.total_tokens)
    }

    fn generate_content(
        &self,
        model: &str,
        content: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationReply, ClientError> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": content }] }],
        });
        if options.search_grounding {
            body["tools"] = json!([{ "google_search": {} }]);
        }

        let started = std::time::Instant::now();
        let raw = self.post(&self.endpoint(model, "generateContent"), body)?;
        let parsed: GenerateContentResponse = serde_json::from_value(raw)
            .map_err(|err| ClientError::Malformed(format!("generateContent body: {err}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Malformed("no candidates in response".to_string()))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ClientError::Malformed(
                "candidate carries no text parts".to_string(),
            ));
        }

        let citations: Vec<GroundingSource> = candidate
            .grounding_metadata
            .map(|meta| {
                meta.grounding_chunks
                    .into_iter()
                    .filter_map(|chunk| chunk.web)
                    .filter(|web| !web.uri.is_empty())
                    .map(|web| GroundingSource {
                        uri: web.uri,
                        title: web.title,
                    })
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(
            model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_bytes = text.len(),
            citations = citations.len(),
            "generate_content complete"
        );

        Ok(GenerationReply { text, citations })
    }
}
