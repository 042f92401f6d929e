use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ExplainError;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Prefix of the analysis text when no explanation could be produced.
pub const ERROR_PREFIX: &str = "Error getting AI analysis";

#[derive(Debug, Clone)]
pub struct ExplainConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint that writes a
/// plain-language explanation of a medicine.
#[derive(Debug, Clone)]
pub struct Explainer {
    client: reqwest::Client,
    config: ExplainConfig,
}

impl Explainer {
    pub fn new(config: ExplainConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("healthcare-lookup/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .context("Failed creating HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub async fn explain(&self, name: &str, composition: &str) -> Result<String, ExplainError> {
        let api_key = self.api_key().ok_or(ExplainError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(name, composition),
            }],
        };

        tracing::debug!("Requesting explanation for {} from {}", name, url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| self.classify(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ExplainError::EmptyCompletion)
    }

    /// The explanation, or an inline error string in its place. Never retried.
    pub async fn explain_or_error(&self, name: &str, composition: &str) -> String {
        match self.explain(name, composition).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Explanation for {} failed: {}", name, e);
                format!("{ERROR_PREFIX}: {e}")
            }
        }
    }

    fn classify(&self, e: reqwest::Error) -> ExplainError {
        if e.is_timeout() {
            ExplainError::Timeout(self.config.timeout)
        } else {
            ExplainError::Http(e)
        }
    }
}

pub fn build_prompt(name: &str, composition: &str) -> String {
    format!(
        "You are a helpful and knowledgeable medical assistant.\n\
         For the medicine below, explain:\n\
         1. What it is typically used for.\n\
         2. What each ingredient in the composition does.\n\
         3. Its drug class (for example antibiotic or painkiller).\n\
         4. Common side effects or warnings, if any.\n\n\
         Medicine Name: {name}\n\
         Composition: {composition}\n\n\
         Keep the explanation simple, clear, and suitable for a general audience."
    )
}

fn truncate_for_log(text: &str) -> String {
    let trimmed = text.trim();
    let max_len = 300usize;
    if trimmed.len() <= max_len {
        return trimmed.to_string();
    }
    let mut end = max_len;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use serde_json::{Value, json};

    fn config(base_url: String, timeout: Duration) -> ExplainConfig {
        ExplainConfig {
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            base_url,
            timeout,
        }
    }

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    async fn completion(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-key");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
        }
        let prompt = body["messages"][0]["content"].as_str().unwrap_or("");
        let content = if prompt.contains("Dolo 650") && body["model"] == "test-model" {
            "Dolo 650 relieves fever and mild pain."
        } else {
            "unexpected prompt"
        };
        (
            StatusCode::OK,
            Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})),
        )
    }

    #[test]
    fn prompt_mentions_name_and_composition() {
        let prompt = build_prompt("Dolo 650", "Paracetamol (650mg)");
        assert!(prompt.contains("Medicine Name: Dolo 650"));
        assert!(prompt.contains("Composition: Paracetamol (650mg)"));
    }

    #[test]
    fn truncate_for_log_caps_length() {
        assert_eq!(truncate_for_log("  short  "), "short");
        let long = "x".repeat(400);
        assert_eq!(truncate_for_log(&long).len(), 303);
    }

    #[tokio::test]
    async fn missing_key_degrades_to_error_text() {
        let explainer = Explainer::new(ExplainConfig::default()).unwrap();
        assert!(!explainer.is_configured());
        assert!(matches!(
            explainer.explain("Dolo 650", "Paracetamol").await,
            Err(ExplainError::NotConfigured)
        ));
        let text = explainer.explain_or_error("Dolo 650", "Paracetamol").await;
        assert!(text.starts_with("Error getting AI analysis:"), "{text}");
    }

    #[tokio::test]
    async fn returns_completion_text() {
        let base = serve(axum::Router::new().route("/v1/chat/completions", post(completion))).await;
        let explainer = Explainer::new(config(base, Duration::from_secs(5))).unwrap();
        let text = explainer.explain("Dolo 650", "Paracetamol (650mg)").await.unwrap();
        assert_eq!(text, "Dolo 650 relieves fever and mild pain.");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let base = serve(axum::Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        ))
        .await;
        let explainer = Explainer::new(config(base, Duration::from_secs(5))).unwrap();
        match explainer.explain("Dolo 650", "Paracetamol").await {
            Err(ExplainError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_an_error() {
        let base = serve(axum::Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        ))
        .await;
        let explainer = Explainer::new(config(base, Duration::from_secs(5))).unwrap();
        assert!(matches!(
            explainer.explain("Dolo 650", "Paracetamol").await,
            Err(ExplainError::EmptyCompletion)
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let explainer =
            Explainer::new(config(format!("http://{addr}/v1"), Duration::from_secs(5))).unwrap();
        let text = explainer.explain_or_error("Dolo 650", "Paracetamol").await;
        assert!(text.starts_with("Error getting AI analysis: request failed"), "{text}");
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let explainer =
            Explainer::new(config(format!("http://{addr}/v1"), Duration::from_millis(200)))
                .unwrap();
        assert!(matches!(
            explainer.explain("Dolo 650", "Paracetamol").await,
            Err(ExplainError::Timeout(_))
        ));
    }
}
