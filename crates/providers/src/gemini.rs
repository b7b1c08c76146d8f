//! Gemini `generateContent` transport.
//!
//! Features:
//! - API key passed as the `key` query parameter
//! - Conversation turns as `contents: [{role, parts: [{text}]}]`
//! - `generationConfig` and `safetySettings` from configuration
//! - Error bodies of the form `{"error": {"message": "…"}}` surfaced in
//!   `TransportError::Api`

use std::time::Duration;

use async_trait::async_trait;
use parley_config::AppConfig;
use parley_core::error::TransportError;
use parley_core::payload::{Conversation, TurnRole};
use parley_core::transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

/// One entry of `safetySettings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Transport for Google's generative-language API.
pub struct GeminiTransport {
    name: String,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    generation: GenerationSettings,
    safety: Vec<SafetySetting>,
}

impl GeminiTransport {
    /// Create a transport with the default endpoint, model, and timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport whose requests give up after `timeout`.
    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            api_key: api_key.into(),
            client,
            generation: GenerationSettings::default(),
            safety: Vec::new(),
        })
    }

    /// Build a transport from the application config.
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| TransportError::NotConfigured("no API key configured".into()))?;

        let generation = GenerationSettings {
            temperature: config.generation.temperature,
            top_k: config.generation.top_k,
            top_p: config.generation.top_p,
            max_output_tokens: config.generation.max_output_tokens,
        };
        let safety = config
            .safety
            .categories
            .iter()
            .map(|category| SafetySetting::new(category, &config.safety.threshold))
            .collect();

        Ok(
            Self::with_timeout(api_key, Duration::from_secs(config.request_timeout_secs))?
                .with_base_url(&config.api_url)
                .with_model(&config.model)
                .with_generation(generation)
                .with_safety(safety),
        )
    }

    /// Use a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_safety(mut self, safety: Vec<SafetySetting>) -> Self {
        self.safety = safety;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body<'a>(&'a self, payload: &'a Conversation) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: payload
                .turns
                .iter()
                .map(|turn| ApiContent {
                    role: turn.role,
                    parts: vec![ApiPart { text: &turn.text }],
                })
                .collect(),
            generation_config: &self.generation,
            safety_settings: &self.safety,
        }
    }

    /// Pull the reply text out of `candidates[0].content.parts[0].text`.
    fn extract_text(resp: GenerateResponse) -> Result<String, TransportError> {
        resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| TransportError::MalformedResponse("no candidate text".into()))
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Unknown error".into())
    }
}

#[async_trait]
impl Transport for GeminiTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, payload: &Conversation) -> Result<String, TransportError> {
        let body = self.request_body(payload);

        debug!(transport = "gemini", model = %self.model, turns = payload.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = Self::error_message(&error_body);
            warn!(status, message = %message, "Gemini API error");
            return Err(match status {
                429 => TransportError::RateLimited,
                401 | 403 => TransportError::AuthenticationFailed(message),
                _ => TransportError::Api {
                    status_code: status,
                    message,
                },
            });
        }

        let api_resp: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(format!("Failed to parse Gemini response: {e}")))?;

        Self::extract_text(api_resp)
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<ApiContent<'a>>,
    generation_config: &'a GenerationSettings,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct ApiContent<'a> {
    role: TurnRole,
    parts: Vec<ApiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::payload::Turn;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT_PATH: &str = "/models/gemini-2.0-flash:generateContent";

    fn payload() -> Conversation {
        Conversation {
            turns: vec![Turn::user("be brief"), Turn::model("ok"), Turn::user("Hi")],
        }
    }

    fn transport_for(server: &MockServer) -> GeminiTransport {
        GeminiTransport::new("test-key").unwrap().with_base_url(server.uri())
    }

    #[test]
    fn constructor_defaults() {
        let transport = GeminiTransport::new("k").unwrap();
        assert_eq!(transport.name(), "gemini");
        assert_eq!(transport.base_url, DEFAULT_BASE_URL);
        assert_eq!(transport.model(), "gemini-2.0-flash");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let transport = GeminiTransport::new("k").unwrap().with_base_url("http://proxy.local/v1beta/");
        assert_eq!(
            transport.endpoint(),
            "http://proxy.local/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn from_config_requires_api_key() {
        let err = GeminiTransport::from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, TransportError::NotConfigured(_)));
    }

    #[test]
    fn from_config_applies_settings() {
        let mut config = AppConfig::default();
        config.api_key = Some("k".into());
        config.model = "gemini-1.5-pro".into();
        config.generation.temperature = 0.2;

        let transport = GeminiTransport::from_config(&config).unwrap();
        assert_eq!(transport.model(), "gemini-1.5-pro");
        assert!((transport.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(transport.safety.len(), 4);
        assert_eq!(transport.safety[0].threshold, "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn request_body_shape() {
        let transport = GeminiTransport::new("k")
            .unwrap()
            .with_safety(vec![SafetySetting::new("HARM_CATEGORY_HARASSMENT", "BLOCK_MEDIUM_AND_ABOVE")]);
        let payload = payload();
        let body = serde_json::to_value(transport.request_body(&payload)).unwrap();

        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "Hi");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["safetySettings"][0]["category"], "HARM_CATEGORY_HARASSMENT");
    }

    #[test]
    fn extract_text_requires_candidate_text() {
        let ok: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello!"}], "role": "model"}}]
        }))
        .unwrap();
        assert_eq!(GeminiTransport::extract_text(ok).unwrap(), "Hello!");

        for body in [json!({}), json!({"candidates": []}), json!({"candidates": [{"finishReason": "SAFETY"}]})] {
            let resp: GenerateResponse = serde_json::from_value(body).unwrap();
            assert!(matches!(
                GeminiTransport::extract_text(resp),
                Err(TransportError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn error_message_falls_back_to_unknown() {
        assert_eq!(
            GeminiTransport::error_message(r#"{"error": {"code": 400, "message": "API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(GeminiTransport::error_message("<html>bad gateway</html>"), "Unknown error");
    }

    #[tokio::test]
    async fn invoke_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "be brief"}]},
                    {"role": "model", "parts": [{"text": "ok"}]},
                    {"role": "user", "parts": [{"text": "Hi"}]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello!"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = transport_for(&server).invoke(&payload()).await.unwrap();
        assert_eq!(reply, "Hello!");
    }

    #[tokio::test]
    async fn invoke_surfaces_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"code": 500, "message": "backend overloaded"}
            })))
            .mount(&server)
            .await;

        let err = transport_for(&server).invoke(&payload()).await.unwrap_err();
        match err {
            TransportError::Api { status_code, message } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "backend overloaded");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invoke_maps_rate_limit_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        let err = transport_for(&server).invoke(&payload()).await.unwrap_err();
        assert!(matches!(err, TransportError::RateLimited));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"error": {"message": "denied"}})))
            .mount(&server)
            .await;
        let err = transport_for(&server).invoke(&payload()).await.unwrap_err();
        assert!(matches!(err, TransportError::AuthenticationFailed(m) if m == "denied"));
    }

    #[tokio::test]
    async fn invoke_rejects_unparseable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = transport_for(&server).invoke(&payload()).await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn invoke_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"candidates": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let transport = GeminiTransport::with_timeout("test-key", Duration::from_millis(50))
            .unwrap()
            .with_base_url(server.uri());
        let err = transport.invoke(&payload()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }
}
