//! Image generation orchestrator.
//!
//! One call turns a `(session_id, prompt)` pair into a committed submission
//! and inbox entry. It fails only when there is nothing to show: bad input,
//! unknown session, or an unreachable source photo. Every failure after the
//! source photo is in hand falls back to that photo instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use roastd_imagegen::{GeneratedImage, ImageGenerator, SourceImage};
use roastd_storage::{ObjectStore, extension_for};

use crate::error::{RoastError, RoastResult};
use crate::inbox::{InboxStore, NewInboxEntry};
use crate::registry::SessionRegistry;

pub const DEFAULT_MESSAGE: &str = "AI image generated successfully!";
pub const DEGRADED_MESSAGE: &str = "Image generation was unavailable, so your original photo was delivered.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub image_url: String,
    /// `None` if the submission row could not be written.
    pub submission_id: Option<Uuid>,
    /// True when the original photo stands in for a generated one.
    pub degraded: bool,
    pub message: String,
}

pub struct Orchestrator {
    registry: SessionRegistry,
    inbox: InboxStore,
    storage: Arc<dyn ObjectStore>,
    generator: Arc<dyn ImageGenerator>,
    generation_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: SessionRegistry,
        inbox: InboxStore,
        storage: Arc<dyn ObjectStore>,
        generator: Arc<dyn ImageGenerator>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            inbox,
            storage,
            generator,
            generation_timeout,
        }
    }

    pub async fn generate(&self, session_id: Option<&str>, prompt: Option<&str>) -> RoastResult<GenerationOutcome> {
        let (session_id, prompt) = validate_input(session_id, prompt)?;

        let session = self.registry.get_session(session_id).await?;
        info!("Generating for session {} (link {})", session_id, session.link_code);

        // Doubles as the run id that owns the `generating` state.
        let submission_id = Uuid::new_v4();

        match self.registry.begin_generation(session_id, &prompt, submission_id).await {
            Ok(_) => debug!("Recorded recipient prompt for {}", session_id),
            Err(e) => warn!("Failed to record recipient prompt for {}: {}", session_id, e),
        }

        let source = match self.storage.get(&session.original_photo_url).await {
            Ok(bytes) => SourceImage::new(bytes),
            Err(e) => {
                error!("Source image for {} unavailable: {}", session_id, e);
                if let Err(e) = self.registry.abandon_generation(session_id, submission_id).await {
                    warn!("Failed to roll back state of {}: {}", session_id, e);
                }
                return Err(RoastError::source_image_unavailable(e));
            }
        };

        let (generated, text) = self.call_generator(session_id, &source, &prompt).await;

        let uploaded = match generated {
            Some(image) => self.upload(session_id, submission_id, image).await,
            None => None,
        };
        let degraded = uploaded.is_none();
        let image_url = uploaded.unwrap_or_else(|| session.original_photo_url.clone());
        if degraded {
            warn!("Session {} degraded to original photo", session_id);
        }

        match self.registry.complete_generation(session_id, &image_url).await {
            Ok(_) => debug!("Session {} generated_photo_url updated", session_id),
            Err(e) => error!("Failed to store generated_photo_url for {}: {}", session_id, e),
        }

        let submission_id = match self
            .registry
            .record_submission(submission_id, session_id, &prompt, &image_url)
            .await
        {
            Ok(()) => Some(submission_id),
            Err(e) => {
                error!("Failed to record submission for {}: {}", session_id, e);
                None
            }
        };

        let message = match (degraded, text) {
            (true, _) => DEGRADED_MESSAGE.to_string(),
            (false, Some(text)) => text,
            (false, None) => DEFAULT_MESSAGE.to_string(),
        };

        let entry = NewInboxEntry {
            session_id,
            creator_identity: session.creator_identity.clone(),
            prompt: prompt.clone(),
            original_photo_url: session.original_photo_url.clone(),
            generated_photo_url: image_url.clone(),
            message: message.clone(),
        };
        if let Err(e) = self.inbox.append(entry).await {
            error!("Failed to deliver inbox entry for {}: {}", session_id, e);
        }

        info!("Generation for {} finished (degraded={})", session_id, degraded);
        Ok(GenerationOutcome {
            image_url,
            submission_id,
            degraded,
            message,
        })
    }

    /// Run [`generate`](Self::generate) on its own task and wait for it.
    ///
    /// Once spawned the run always reaches its commit steps, even if the
    /// caller's future is dropped (an HTTP client hanging up).
    pub async fn generate_detached(
        self: &Arc<Self>,
        session_id: Option<String>,
        prompt: Option<String>,
    ) -> RoastResult<GenerationOutcome> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator
                .generate(session_id.as_deref(), prompt.as_deref())
                .await
        })
        .await
        .map_err(|e| anyhow::anyhow!("generation task failed: {}", e))?
    }

    /// Bounded call to the generation service. Errors, timeouts and
    /// image-less responses all come back as `None`.
    async fn call_generator(
        &self,
        session_id: Uuid,
        source: &SourceImage,
        prompt: &str,
    ) -> (Option<GeneratedImage>, Option<String>) {
        let call = self.generator.generate(source, prompt);
        match tokio::time::timeout(self.generation_timeout, call).await {
            Ok(Ok(output)) => {
                if output.image.is_none() {
                    warn!("Generation for {} returned no image", session_id);
                }
                (output.image, output.text)
            }
            Ok(Err(e)) => {
                warn!("Generation service failed for {}: {}", session_id, e);
                (None, None)
            }
            Err(_) => {
                warn!(
                    "Generation service timed out for {} after {:?}",
                    session_id, self.generation_timeout
                );
                (None, None)
            }
        }
    }

    /// Objects are named after the session, the time and the submission, so
    /// concurrent runs never collide.
    async fn upload(&self, session_id: Uuid, submission_id: Uuid, image: GeneratedImage) -> Option<String> {
        let discriminator = submission_id.simple().to_string();
        let name = format!(
            "ai_generated_{}_{}_{}.{}",
            session_id,
            Utc::now().timestamp_millis(),
            &discriminator[..8],
            extension_for(&image.mime_type)
        );
        match self.storage.put(image.data.into(), &name, &image.mime_type).await {
            Ok(url) => {
                info!("Uploaded generated image {}", name);
                Some(url)
            }
            Err(e) => {
                warn!("Upload of {} failed, falling back to original: {}", name, e);
                None
            }
        }
    }
}

fn validate_input(session_id: Option<&str>, prompt: Option<&str>) -> RoastResult<(Uuid, String)> {
    let session_id = session_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RoastError::InvalidInput("sessionId is required".into()))?;
    let prompt = prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| RoastError::InvalidInput("prompt is required".into()))?;

    let session_id = session_id
        .parse::<Uuid>()
        .map_err(|_| RoastError::InvalidInput("sessionId is not a valid id".into()))?;

    Ok((session_id, prompt.to_string()))
}
