//! Multimodal image generation.
//!
//! [`ImageGenerator`] is the single capability the orchestrator consumes:
//! hand it a source image and a prompt, get back optional image bytes and
//! optional descriptive text. [`GeminiClient`] implements it against the
//! Gemini `generateContent` endpoint.

pub mod gemini;

use async_trait::async_trait;
use bytes::Bytes;

pub use gemini::{GeminiClient, GeminiConfig};

/// Input image handed to the generator.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub data: Bytes,
    pub mime_type: &'static str,
}

impl SourceImage {
    pub fn new(data: Bytes) -> Self {
        let mime_type = sniff_mime(&data);
        Self { data, mime_type }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// What the service returned. Either part may be missing.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    pub image: Option<GeneratedImage>,
    pub text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageGenError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed generation response: {0}")]
    Malformed(String),

    #[error("Image generation is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, image: &SourceImage, prompt: &str) -> Result<GenerationOutput, ImageGenError>;
}

/// Stand-in used when no API key is configured. Every call fails, which the
/// orchestrator turns into a fallback to the original photo.
pub struct UnconfiguredGenerator;

#[async_trait]
impl ImageGenerator for UnconfiguredGenerator {
    async fn generate(&self, _image: &SourceImage, _prompt: &str) -> Result<GenerationOutput, ImageGenError> {
        Err(ImageGenError::NotConfigured)
    }
}

/// Guess an image MIME type from its magic bytes. Defaults to JPEG.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        "image/webp"
    } else if data.starts_with(b"GIF8") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a]), "image/png");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime(&[0xff, 0xd8, 0xff, 0xe0]), "image/jpeg");
        assert_eq!(sniff_mime(b""), "image/jpeg");
    }

    #[tokio::test]
    async fn test_unconfigured_generator_always_fails() {
        let image = SourceImage::new(Bytes::from_static(&[0xff, 0xd8]));
        let err = UnconfiguredGenerator.generate(&image, "p").await.unwrap_err();
        assert!(matches!(err, ImageGenError::NotConfigured));
    }
}
