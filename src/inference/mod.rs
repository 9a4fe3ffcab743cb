pub mod gemini;
pub mod prompt;
pub mod schema;

use std::future::Future;
use std::pin::Pin;

use anyhow::{anyhow, Context};
use serde_json::Value;
use thiserror::Error;

use crate::capture::CapturedImage;
use crate::models::{PredictionResult, RewardRange};

pub use gemini::{GeminiClient, GeminiConfig};
pub use prompt::build_instructions;
pub use schema::prediction_schema;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const UNAVAILABLE_MESSAGE: &str = "Thầy bói đang đi du xuân, vui lòng thử lại sau!";

/// Everything one call to the model carries.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub mime_type: String,
    /// Base64 image payload without any `data:` prefix.
    pub image_base64: String,
    pub instructions: String,
    pub response_schema: Value,
}

pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

/// Boundary to the external multimodal service.
///
/// Resolves to the raw response text, or `None` when the service answered
/// without any text.
pub trait GenerativeModel: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a>;
}

/// The single failure callers see. `reason` is for logs only.
#[derive(Debug, Clone, Error)]
#[error("inference unavailable: {reason}")]
pub struct InferenceError {
    reason: String,
}

impl InferenceError {
    fn new(err: anyhow::Error) -> Self {
        Self {
            reason: format!("{err:#}"),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn user_message(&self) -> &'static str {
        UNAVAILABLE_MESSAGE
    }
}

pub fn build_request(image: &CapturedImage, range: RewardRange) -> GenerationRequest {
    GenerationRequest {
        mime_type: image.mime_type().to_string(),
        image_base64: image.base64_payload().to_string(),
        instructions: build_instructions(range),
        response_schema: prediction_schema(),
    }
}

/// Asks the model for a fortune. Exactly one attempt; never retried.
pub async fn analyze(
    model: &dyn GenerativeModel,
    image: &CapturedImage,
    range: RewardRange,
) -> Result<PredictionResult, InferenceError> {
    let request = build_request(image, range);

    let outcome: anyhow::Result<PredictionResult> = async {
        let text = model
            .generate(&request)
            .await
            .context("generate request failed")?
            .ok_or_else(|| anyhow!("model returned no text"))?;
        parse_prediction(&text)
    }
    .await;

    match outcome {
        Ok(result) => {
            log_info!("fortune drawn: {}", result.title);
            Ok(result)
        }
        Err(err) => {
            log_error!("inference failed: {err:#}");
            Err(InferenceError::new(err))
        }
    }
}

pub fn parse_prediction(text: &str) -> anyhow::Result<PredictionResult> {
    let result: PredictionResult =
        serde_json::from_str(text.trim()).context("response is not a prediction object")?;

    let blank = result.blank_fields();
    if !blank.is_empty() {
        return Err(anyhow!("response has empty fields: {}", blank.join(", ")));
    }

    Ok(result)
}
