//! Model interaction: send the two prompt messages, get a worksheet back.
//!
//! The request is a plain OpenAI-compatible chat completion in JSON mode
//! (`response_format: {"type": "json_object"}`). There is exactly one call
//! per generation and no retry: a failed call surfaces to the user, who can
//! press generate again with the same document.
//!
//! ## Seam
//!
//! [`CompletionClient`] is the only boundary to the network. The production
//! [`OpenAiClient`] talks HTTP via `reqwest`; tests inject their own
//! implementation through [`crate::config::WorksheetConfigBuilder::client`].
//! Body construction, error-message extraction and response parsing are
//! free functions so they can be checked without a server.

use crate::error::WorksheetError;
use crate::pipeline::postprocess::clean_json_content;
use crate::worksheet::Worksheet;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Everything needed for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A parsed completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub worksheet: Worksheet,
    /// Cleaned message content the worksheet was parsed from.
    pub raw_content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Sends a completion request and returns the parsed worksheet.
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<CompletionResponse, WorksheetError>>;
}

/// JSON body for `POST /chat/completions`.
pub fn request_body(request: &CompletionRequest) -> Value {
    json!({
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
        "response_format": { "type": "json_object" },
    })
}

/// User-facing message for a non-2xx response.
///
/// Uses the provider's `error.message` when the body carries one, otherwise
/// a generic message with the status code.
pub fn api_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("API request failed (HTTP {status})"))
}

/// Parse a successful response body into a worksheet.
pub fn parse_completion(body: &str) -> Result<CompletionResponse, WorksheetError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| WorksheetError::MalformedResponse(format!("response is not JSON: {e}")))?;

    let content = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            WorksheetError::MalformedResponse("response has no choices[0].message.content".into())
        })?;

    let cleaned = clean_json_content(content);
    let worksheet: Worksheet = serde_json::from_str(&cleaned).map_err(|e| {
        WorksheetError::MalformedResponse(format!("worksheet JSON did not parse: {e}"))
    })?;

    let usage = |key: &str| {
        value
            .pointer(&format!("/usage/{key}"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };

    Ok(CompletionResponse {
        worksheet,
        raw_content: cleaned,
        input_tokens: usage("prompt_tokens"),
        output_tokens: usage("completion_tokens"),
    })
}

/// OpenAI-compatible HTTP client.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, WorksheetError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WorksheetError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, WorksheetError> {
        let url = self.endpoint();
        debug!("POST {} (model {})", url, request.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WorksheetError::Http(format!("request to {url} timed out"))
                } else {
                    WorksheetError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WorksheetError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = api_error_message(status.as_u16(), &body);
            warn!("Completion failed with HTTP {}: {}", status.as_u16(), message);
            return Err(WorksheetError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(&body)
    }
}

impl CompletionClient for OpenAiClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<CompletionResponse, WorksheetError>> {
        Box::pin(self.send(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("usr")],
            temperature: 0.7,
            max_tokens: 4000,
        }
    }

    #[test]
    fn body_uses_json_mode() {
        let body = request_body(&request());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        let t = body["temperature"].as_f64().unwrap();
        assert!((t - 0.7).abs() < 1e-6);
    }

    #[test]
    fn provider_error_message_is_used() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(401, body), "Incorrect API key provided");
    }

    #[test]
    fn fallback_error_message() {
        assert_eq!(
            api_error_message(502, "<html>Bad Gateway</html>"),
            "API request failed (HTTP 502)"
        );
        assert_eq!(
            api_error_message(500, r#"{"error":{}}"#),
            "API request failed (HTTP 500)"
        );
    }

    #[test]
    fn parse_success_with_usage() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "{\"title\":\"Cells\"}" } }],
            "usage": { "prompt_tokens": 1200, "completion_tokens": 800 }
        })
        .to_string();
        let resp = parse_completion(&body).unwrap();
        assert_eq!(resp.worksheet.title.as_deref(), Some("Cells"));
        assert_eq!(resp.input_tokens, 1200);
        assert_eq!(resp.output_tokens, 800);
    }

    #[test]
    fn parse_fenced_content() {
        let body = json!({
            "choices": [{ "message": { "content": "```json\n{\"title\":\"Fenced\"}\n```" } }]
        })
        .to_string();
        let resp = parse_completion(&body).unwrap();
        assert_eq!(resp.worksheet.title.as_deref(), Some("Fenced"));
        assert_eq!(resp.input_tokens, 0);
    }

    #[test]
    fn parse_tolerates_nulls_and_numbers() {
        let content = r#"{"title":"Cells","design":{"core_concepts":null,
            "key_terms":[{"term":"Nucleus","definition":"control centre","page":3}]},
            "student_worksheet":{"concept_explanations":[{"concept":"Cell","explanation":null}]}}"#;
        let body = json!({ "choices": [{ "message": { "content": content } }] }).to_string();

        let ws = parse_completion(&body).unwrap().worksheet;
        let design = ws.design.unwrap();
        assert!(design.core_concepts.is_empty());
        assert_eq!(design.key_terms[0].page.as_deref(), Some("3"));
        let ce = &ws.student_worksheet.unwrap().concept_explanations[0];
        assert_eq!(ce.explanation, "");
    }

    #[test]
    fn parse_failures_are_malformed() {
        assert!(matches!(
            parse_completion("not json"),
            Err(WorksheetError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(WorksheetError::MalformedResponse(_))
        ));
        let bad_content = json!({ "choices": [{ "message": { "content": "Sure! Here it is" } }] });
        assert!(matches!(
            parse_completion(&bad_content.to_string()),
            Err(WorksheetError::MalformedResponse(_))
        ));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = OpenAiClient::new("http://localhost:1234/v1/", "k", 5).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
