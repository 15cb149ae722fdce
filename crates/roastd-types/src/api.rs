use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{InboxEntry, RoastSession, SessionState, Submission};

// -- Sessions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSessionRequest {
    pub photo_url: String,
    pub prompt: String,
    /// Caller-drawn code. When omitted the server allocates one.
    pub link_code: Option<String>,
    pub creator_identity: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub link_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetPromptRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// What the recipient surface sees after opening a link.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub link_code: String,
    pub creator_prompt: String,
    pub recipient_prompt: Option<String>,
    pub prompt: String,
    pub original_photo_url: String,
    pub generated_photo_url: Option<String>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl From<RoastSession> for SessionResponse {
    fn from(session: RoastSession) -> Self {
        let prompt = session.effective_prompt().to_string();
        Self {
            session_id: session.session_id,
            link_code: session.link_code,
            creator_prompt: session.creator_prompt,
            recipient_prompt: session.recipient_prompt,
            prompt,
            original_photo_url: session.original_photo_url,
            generated_photo_url: session.generated_photo_url,
            state: session.state,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub submission_id: Uuid,
    pub session_id: Uuid,
    pub roast_text: String,
    pub ai_generated_image_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionResponse {
    fn from(s: Submission) -> Self {
        Self {
            submission_id: s.submission_id,
            session_id: s.session_id,
            roast_text: s.roast_text,
            ai_generated_image_url: s.ai_generated_image_url,
            created_at: s.created_at,
        }
    }
}

// -- Generation --

/// Both fields are optional on the wire so that a missing one surfaces as
/// an input error from the orchestrator rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub session_id: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub image_url: String,
    pub submission_id: Option<Uuid>,
    pub degraded: bool,
    pub message: String,
}

// -- Inbox --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntryResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub creator_identity: Option<String>,
    pub prompt: String,
    pub original_photo_url: String,
    pub generated_photo_url: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<InboxEntry> for InboxEntryResponse {
    fn from(e: InboxEntry) -> Self {
        Self {
            id: e.id,
            session_id: e.session_id,
            creator_identity: e.creator_identity,
            prompt: e.prompt,
            original_photo_url: e.original_photo_url,
            generated_photo_url: e.generated_photo_url,
            message: e.message,
            created_at: e.created_at,
        }
    }
}

// -- Photos --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadPhotoResponse {
    pub url: String,
}
