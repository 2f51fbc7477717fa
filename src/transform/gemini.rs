// src/transform/gemini.rs

//! Gemini image generation over the `generateContent` REST endpoint.
//!
//! Request: every input image as an `inlineData` part (base64), followed by
//! the prompt as a text part. Response: the first `inlineData` part of the
//! first candidate is the result image.

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::TransformSection;
use crate::transform::{TransformError, TransformFuture, TransformRequest, TransformService};
use crate::types::ImageData;

pub struct GeminiTransformService {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl GeminiTransformService {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Build a client from the `[transform]` section, applying its request
    /// timeout.
    pub fn from_config(cfg: &TransformSection) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("building HTTP client for the transform service")?;
        Ok(Self::new(client, cfg.endpoint.clone(), cfg.model.clone()))
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl TransformService for GeminiTransformService {
    fn transform(&self, request: TransformRequest) -> TransformFuture<'_> {
        Box::pin(async move {
            let body = build_request_body(&request);
            debug!(
                model = %self.model,
                images = request.images.len(),
                temperature = request.temperature,
                "sending generateContent request"
            );

            let resp = self
                .client
                .post(self.url())
                .header("x-goog-api-key", &request.credential)
                .json(&body)
                .send()
                .await
                .map_err(|e| TransformError::Http(e.to_string()))?;

            let status = resp.status().as_u16();
            let text = resp
                .text()
                .await
                .map_err(|e| TransformError::Http(e.to_string()))?;

            parse_response(status, &text)
        })
    }
}

/// JSON body for one `generateContent` call.
pub fn build_request_body(request: &TransformRequest) -> Value {
    let mut parts: Vec<Value> = request
        .images
        .iter()
        .map(|img| {
            json!({
                "inlineData": {
                    "mimeType": img.mime_type(),
                    "data": BASE64.encode(img.bytes()),
                }
            })
        })
        .collect();
    parts.push(json!({ "text": request.prompt }));

    json!({
        "contents": [{ "parts": parts }],
        "generationConfig": {
            "temperature": request.temperature,
            "responseModalities": ["IMAGE", "TEXT"],
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
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
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineBlob>,
}

#[derive(Debug, Deserialize)]
struct InlineBlob {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Map an HTTP status and body to the result image or a `TransformError`.
pub fn parse_response(status: u16, body: &str) -> Result<ImageData, TransformError> {
    if !(200..300).contains(&status) {
        return Err(map_error_status(status, body));
    }

    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| TransformError::Decode(e.to_string()))?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked ({r})"))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(TransformError::NoImage(reason));
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    let mut texts = Vec::new();
    for part in parts {
        if let Some(blob) = part.inline_data {
            let bytes = BASE64
                .decode(blob.data.as_bytes())
                .map_err(|e| TransformError::Decode(e.to_string()))?;
            return Ok(ImageData::new(bytes, blob.mime_type));
        }
        if let Some(text) = part.text {
            texts.push(text);
        }
    }

    let reason = if !texts.is_empty() {
        texts.join(" ")
    } else {
        candidate
            .finish_reason
            .map(|r| format!("finish reason {r}"))
            .unwrap_or_else(|| "candidate had no parts".to_string())
    };
    Err(TransformError::NoImage(reason))
}

fn map_error_status(status: u16, body: &str) -> TransformError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (body.trim().to_string(), None),
    };

    let key_rejected = message.contains("API key not valid")
        || body.contains("API_KEY_INVALID")
        || api_status.as_deref() == Some("UNAUTHENTICATED");

    if status == 401 || status == 403 || key_rejected {
        return TransformError::InvalidCredential;
    }

    TransformError::Api { status, message }
}
