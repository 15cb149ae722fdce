use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a roast session.
///
/// Stored next to the session data so transitions can be checked at write
/// time instead of being inferred from which nullable columns are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Creator posted the photo; nobody has opened the link yet.
    Created,
    /// Recipient has set (or overwritten) their prompt.
    PromptNegotiated,
    /// An orchestrator run is in flight.
    Generating,
    /// A generated (or fallback) image has been recorded.
    Completed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PromptNegotiated => "prompt_negotiated",
            Self::Generating => "generating",
            Self::Completed => "completed",
        }
    }

    /// Clients may only touch the prompts before generation has started.
    pub fn accepts_prompt_edits(&self) -> bool {
        matches!(self, Self::Created | Self::PromptNegotiated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "prompt_negotiated" => Ok(Self::PromptNegotiated),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown session state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoastSession {
    pub session_id: Uuid,
    pub link_code: String,
    pub creator_identity: Option<String>,
    pub original_photo_url: String,
    pub creator_prompt: String,
    pub recipient_prompt: Option<String>,
    pub generated_photo_url: Option<String>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl RoastSession {
    /// The recipient's prompt overrides the creator's once it is set.
    pub fn effective_prompt(&self) -> &str {
        self.recipient_prompt
            .as_deref()
            .unwrap_or(&self.creator_prompt)
    }
}

/// One recorded generation attempt. Never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: Uuid,
    pub session_id: Uuid,
    pub roast_text: String,
    pub ai_generated_image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Delivery record surfaced to the creator once a generation completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    pub id: Uuid,
    pub session_id: Uuid,
    pub creator_identity: Option<String>,
    pub prompt: String,
    pub original_photo_url: String,
    pub generated_photo_url: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
