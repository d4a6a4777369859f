//! Gemini API client used as the summarization gateway
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! One attempt per call; failures are handed back to the caller untouched.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{Summarizer, SUMMARY_SYSTEM_PROMPT};
use crate::config::Settings;
use crate::error::SummaryError;

const MAX_OUTPUT_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.4;

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Build a client from settings. Fails when no API key is configured.
    pub fn new(settings: &Settings) -> crate::Result<Self> {
        let api_key = settings.require_api_key()?.to_string();

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(settings.request_timeout)
            .build()?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            settings.gemini_base_url, settings.gemini_model
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            timeout: settings.request_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, text: &str) -> crate::Result<String> {
        let request = build_request(text);

        info!("Calling Gemini API");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                transport_error(e, self.timeout)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response ({}): {}", status, error_text);
            return Err(SummaryError::Upstream(format!(
                "status {}: {}",
                status, error_text
            )));
        }

        let body = response.text().await.map_err(|e| {
            error!("Failed to read Gemini response body: {}", e);
            transport_error(e, self.timeout)
        })?;
        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            e
        })?;

        let summary = extract_summary(&gemini_response)?;

        info!("Gemini response received ({} chars)", summary.chars().count());

        Ok(summary)
    }
}

/// Describe a reqwest failure, keeping the chain of underlying causes
fn transport_error(e: reqwest::Error, timeout: Duration) -> SummaryError {
    if e.is_timeout() {
        return SummaryError::Upstream(format!("request timed out after {:?}", timeout));
    }

    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    SummaryError::Upstream(message)
}

fn build_request(text: &str) -> GeminiRequest {
    GeminiRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: Some(SUMMARY_SYSTEM_PROMPT.to_string()),
            }],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(format!("Source text:\n{}", text.trim())),
            }],
        }],
        generation_config: GenerationConfig {
            max_output_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        },
    }
}

/// Join the text parts of the first candidate and trim the result
fn extract_summary(response: &GeminiResponse) -> crate::Result<String> {
    let Some(candidate) = response.candidates.first() else {
        return Err(SummaryError::EmptyResponse);
    };

    debug!("Gemini finish reason: {:?}", candidate.finish_reason);

    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    let summary = text.trim();
    if summary.is_empty() {
        return Err(SummaryError::EmptyResponse);
    }

    Ok(summary.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// (path action, api key header, request body) per call
    type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    #[derive(Clone)]
    struct StubState {
        status: StatusCode,
        reply: Value,
        seen: Seen,
    }

    async fn stub_generate(
        State(state): State<StubState>,
        Path(action): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        state.seen.lock().unwrap().push((action, key, body));
        (state.status, Json(state.reply.clone()))
    }

    /// Serve a fake Gemini endpoint on an ephemeral port
    async fn spawn_stub(status: StatusCode, reply: Value) -> (Settings, Seen) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            status,
            reply,
            seen: Arc::clone(&seen),
        };
        let router = Router::new()
            .route("/v1beta/models/:action", post(stub_generate))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let settings = Settings {
            gemini_api_key: Some("test-key".to_string()),
            gemini_base_url: format!("http://{}/v1beta", addr),
            request_timeout: Duration::from_secs(5),
            ..Settings::default()
        };
        (settings, seen)
    }

    fn candidate_reply(parts: &[&str]) -> Value {
        let parts: Vec<Value> = parts.iter().map(|t| json!({ "text": t })).collect();
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": parts },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn test_missing_api_key_fails_fast() {
        let result = GeminiClient::new(&Settings::default());
        assert!(matches!(result, Err(SummaryError::Config(_))));
    }

    #[test]
    fn test_endpoint_uses_configured_model() {
        let settings = Settings {
            gemini_api_key: Some("k".to_string()),
            ..Settings::default()
        };
        let client = GeminiClient::new(&settings).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_value(build_request("  What is RSI?\n")).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Source text:\nWhat is RSI?");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], SUMMARY_SYSTEM_PROMPT);
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 300);
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_extract_summary_joins_parts_and_trims() {
        let response: GeminiResponse =
            serde_json::from_value(candidate_reply(&["line1\n", "line2\nline3\n\n"])).unwrap();
        assert_eq!(extract_summary(&response).unwrap(), "line1\nline2\nline3");
    }

    #[test]
    fn test_extract_summary_without_text() {
        let no_candidates: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            extract_summary(&no_candidates),
            Err(SummaryError::EmptyResponse)
        ));

        let blocked: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        assert!(matches!(
            extract_summary(&blocked),
            Err(SummaryError::EmptyResponse)
        ));

        let whitespace: GeminiResponse =
            serde_json::from_value(candidate_reply(&["  ", "\n"])).unwrap();
        assert!(matches!(
            extract_summary(&whitespace),
            Err(SummaryError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_summarize_against_stub_server() {
        let (settings, seen) =
            spawn_stub(StatusCode::OK, candidate_reply(&["line1\nline2\nline3\n"])).await;
        let client = GeminiClient::new(&settings).unwrap();

        let summary = client.summarize("some long article").await.unwrap();
        assert_eq!(summary, "line1\nline2\nline3");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (action, key, body) = &seen[0];
        assert_eq!(action, "gemini-2.0-flash:generateContent");
        assert_eq!(key.as_deref(), Some("test-key"));
        assert_eq!(
            body["contents"][0]["parts"][0]["text"],
            "Source text:\nsome long article"
        );
    }

    #[tokio::test]
    async fn test_provider_error_status_is_upstream_error() {
        let (settings, seen) = spawn_stub(
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": { "message": "quota exhausted" } }),
        )
        .await;
        let client = GeminiClient::new(&settings).unwrap();

        let err = client.summarize("text").await.unwrap_err();
        match err {
            SummaryError::Upstream(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("quota exhausted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // No retry
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_candidates_from_provider() {
        let (settings, _seen) = spawn_stub(StatusCode::OK, json!({ "candidates": [] })).await;
        let client = GeminiClient::new(&settings).unwrap();

        let err = client.summarize("text").await.unwrap_err();
        assert!(matches!(err, SummaryError::EmptyResponse));
        assert_eq!(err.to_string(), "Gemini response did not contain text output.");
    }

    #[tokio::test]
    async fn test_unreachable_provider_reports_cause() {
        let settings = Settings {
            gemini_api_key: Some("k".to_string()),
            gemini_base_url: "http://127.0.0.1:1/v1beta".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Settings::default()
        };
        let client = GeminiClient::new(&settings).unwrap();

        let err = client.summarize("text").await.unwrap_err();
        match err {
            SummaryError::Upstream(msg) => {
                assert!(msg.starts_with("error sending request"));
                // Underlying connect failure is appended after the reqwest summary
                assert!(msg.matches(": ").count() >= 1, "no cause in: {msg}");
                assert!(!msg.contains("timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    async fn slow_generate() -> Json<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(candidate_reply(&["too late"]))
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let router = Router::new().route("/v1beta/models/:action", post(slow_generate));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let settings = Settings {
            gemini_api_key: Some("k".to_string()),
            gemini_base_url: format!("http://{}/v1beta", addr),
            request_timeout: Duration::from_secs(1),
            ..Settings::default()
        };
        let client = GeminiClient::new(&settings).unwrap();

        let started = std::time::Instant::now();
        let err = client.summarize("text").await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));

        match err {
            SummaryError::Upstream(msg) => assert_eq!(msg, "request timed out after 1s"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
