//! Gemini REST client (`/v1beta/models/{model}:generateContent`).

use super::{ChatTurn, ImageModel, LlmError, Role, TextModel};
use crate::config::GenerationConfig;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Client bound to one model and API key.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    generation: Option<GenerationConfig>,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            generation: None,
            client,
        }
    }

    /// Send these sampling settings with every request.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = Some(generation);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST generateContent and return the concatenated text parts of the first candidate.
    async fn generate_content(&self, contents: Vec<Content>) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents,
            generation_config: self.generation,
        };
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        let data: GenerateResponse = res.json().await?;
        data.text().ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, history: &[ChatTurn], prompt: &str) -> Result<String, LlmError> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|t| Content {
                role: gemini_role(t.role).to_string(),
                parts: vec![Part::text(&t.text)],
            })
            .collect();
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part::text(prompt)],
        });
        self.generate_content(contents).await
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn describe(
        &self,
        instruction: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError> {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::text(instruction),
                Part {
                    text: None,
                    inline_data: Some(Blob {
                        mime_type: mime_type.to_string(),
                        data,
                    }),
                },
            ],
        }];
        self.generate_content(contents).await
    }
}

/// Gemini only accepts "user" and "model".
fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<Blob>,
}

impl Part {
    fn text(s: &str) -> Self {
        Self {
            text: Some(s.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
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

impl GenerateResponse {
    /// Text of the first candidate, or None when it has no text parts.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
    }

    fn client(server: &MockServer, model: &str) -> GeminiClient {
        GeminiClient::new(reqwest::Client::new(), &server.uri(), model, "test_key")
    }

    #[tokio::test]
    async fn generate_sends_history_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test_key"))
            .and(body_partial_json(json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "earlier" }] },
                    { "role": "model", "parts": [{ "text": "noted" }] },
                    { "role": "user", "parts": [{ "text": "now" }] }
                ],
                "generationConfig": { "topK": 30, "maxOutputTokens": 8192 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server, "gemini-1.5-flash").with_generation(GenerationConfig::default());
        let history = [ChatTurn::user("earlier"), ChatTurn::model("noted")];
        let text = c.generate(&history, "now").await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn describe_sends_inline_jpeg() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "what is this" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } }
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("a cat")))
            .mount(&server)
            .await;

        let c = client(&server, "gemini-1.5-pro");
        let text = c
            .describe("what is this", &[1, 2, 3], "image/jpeg")
            .await
            .unwrap();
        assert_eq!(text, "a cat");
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server, "m").generate(&[], "x").await.unwrap_err();
        match err {
            LlmError::Api(msg) => assert!(msg.contains("429") && msg.contains("quota")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn candidate_without_text_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = client(&server, "m").generate(&[], "x").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn malformed_body_is_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server, "m").generate(&[], "x").await.unwrap_err();
        assert!(matches!(err, LlmError::Request(_)));
    }

    #[test]
    fn multiple_parts_are_concatenated() {
        let r: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        }))
        .unwrap();
        assert_eq!(r.text().as_deref(), Some("ab"));
    }
}
