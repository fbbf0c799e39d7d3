//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diagnosis::GenerativeModel;
use crate::encoder::ImagePayload;
use crate::error::{DetectorError, Result};

/// How much of a response body ends up in the debug log.
const LOGGED_BODY_CHARS: usize = 500;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.api_base, config.model
        );
        info!(%endpoint, "Gemini client ready");

        Ok(Self {
            http: builder.build()?,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }
}

fn build_request<'a>(prompt: &'a str, images: &'a [ImagePayload]) -> GenerateRequest<'a> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(Part::Text { text: prompt });
    parts.extend(images.iter().map(|image| Part::InlineData {
        inline_data: InlineData {
            mime_type: &image.mime_type,
            data: &image.data,
        },
    }));

    GenerateRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
        },
    }
}

/// Pulls the first candidate's text out of a `generateContent` response body.
fn extract_text(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text)
        .ok_or(DetectorError::EmptyResponse)
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str, images: &[ImagePayload]) -> Result<String> {
        let request = build_request(prompt, images);

        info!(images = images.len(), "sending request to Gemini");
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let preview: String = body.chars().take(LOGGED_BODY_CHARS).collect();
        debug!(%status, body = %preview, "Gemini response");

        if !status.is_success() {
            warn!(%status, "Gemini returned an error status");
            return Err(DetectorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_image;
    use serde_json::json;

    #[test]
    fn request_puts_prompt_before_images() {
        let images = vec![
            encode_image(b"one", Some("image/png")),
            encode_image(b"two", Some("image/jpeg")),
        ];
        let value = serde_json::to_value(build_request("look", &images)).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        { "text": "look" },
                        { "inline_data": { "mime_type": "image/png", "data": "b25l" } },
                        { "inline_data": { "mime_type": "image/jpeg", "data": "dHdv" } }
                    ]
                }],
                "generationConfig": { "responseMimeType": "application/json" }
            })
        );
    }

    #[test]
    fn text_comes_from_first_candidate() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"disease\": \"Rust\"}" }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
        .to_string();
        assert_eq!(extract_text(&body).unwrap(), "{\"disease\": \"Rust\"}");
    }

    #[test]
    fn blocked_or_empty_responses_are_errors() {
        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        assert!(matches!(extract_text(&blocked), Err(DetectorError::EmptyResponse)));

        let no_text = json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string();
        assert!(matches!(extract_text(&no_text), Err(DetectorError::EmptyResponse)));

        assert!(matches!(extract_text("not json"), Err(DetectorError::Parse(_))));
    }

    #[test]
    fn endpoint_uses_configured_model() {
        let config = Config::from_lookup(|key| match key {
            "GEMINI_API_KEY" => Some("k".into()),
            "GEMINI_MODEL" => Some("gemini-test".into()),
            "GEMINI_API_BASE" => Some("http://127.0.0.1:1".into()),
            _ => None,
        })
        .unwrap();
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint,
            "http://127.0.0.1:1/v1beta/models/gemini-test:generateContent"
        );
    }
}
