use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerateFuture, GenerationRequest, GenerativeModel};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Config for a `models/{model}:generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL without the `/models/...` suffix.
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

fn request_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: &request.mime_type,
                        data: &request.image_base64,
                    },
                },
                RequestPart::Text {
                    text: &request.instructions,
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.response_schema,
        },
    }
}

/// Joins the text parts of the first candidate. `None` if there are none.
fn response_text(response: GenerateContentResponse) -> Option<String> {
    let parts = response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?;

    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub struct GeminiClient {
    client: Client,
    cfg: GeminiConfig,
}

impl GeminiClient {
    pub fn new(cfg: GeminiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .context("http client build failed")?;
        Ok(Self { client, cfg })
    }

    async fn generate_content(&self, request: &GenerationRequest) -> anyhow::Result<Option<String>> {
        let res = self
            .client
            .post(self.cfg.url())
            .header("x-goog-api-key", &self.cfg.api_key)
            .json(&request_body(request))
            .send()
            .await
            .context("gemini request failed")?
            .error_for_status()
            .context("gemini non-2xx response")?
            .json::<GenerateContentResponse>()
            .await
            .context("gemini response decode failed")?;

        Ok(response_text(res))
    }
}

impl GenerativeModel for GeminiClient {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(self.generate_content(request))
    }
}
