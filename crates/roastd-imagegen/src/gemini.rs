//! Client for the Gemini `generateContent` REST endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{GeneratedImage, GenerationOutput, ImageGenError, ImageGenerator, SourceImage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Override for tests and proxies; defaults to the public endpoint.
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }
}

/// HTTP client for one Gemini model.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ImageGenError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        info!("Gemini image generation enabled (model {})", config.model);
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, image: &SourceImage, prompt: &str) -> Result<GenerationOutput, ImageGenError> {
        let body = build_request(image, prompt);

        debug!("Calling {} ({} byte source image)", self.endpoint(), image.data.len());
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageGenError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ImageGenError::Malformed(e.to_string()))?;

        extract_output(parsed)
    }
}

/// Wrap the user's prompt in the instruction the model responds best to.
pub fn instruction_for(prompt: &str) -> String {
    format!(
        "Based on this image, {}. Generate a completely new AI image that transforms the original concept. Return the generated image.",
        prompt
    )
}

// -- Wire types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type", default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

fn build_request(image: &SourceImage, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: Some(instruction_for(prompt)),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: Some(image.mime_type.to_string()),
                        data: B64.encode(&image.data),
                    }),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE", "TEXT"],
            temperature: 0.9,
            top_k: 40,
            top_p: 0.95,
        },
    }
}

/// Walk every candidate part. The last image part wins; text parts are
/// concatenated in order.
fn extract_output(response: GenerateContentResponse) -> Result<GenerationOutput, ImageGenError> {
    let mut image: Option<GeneratedImage> = None;
    let mut text = String::new();

    let parts = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts);

    for part in parts {
        if let Some(inline) = part.inline_data {
            let data = B64
                .decode(inline.data.as_bytes())
                .map_err(|e| ImageGenError::Malformed(format!("image payload is not base64: {}", e)))?;
            if data.is_empty() {
                warn!("Skipping empty inline image part");
                continue;
            }
            image = Some(GeneratedImage {
                data,
                mime_type: inline.mime_type.unwrap_or_else(|| "image/jpeg".to_string()),
            });
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    debug!(
        "Generation response: image={} text_len={}",
        image.is_some(),
        text.len()
    );

    Ok(GenerationOutput {
        image,
        text: (!text.trim().is_empty()).then_some(text),
    })
}
