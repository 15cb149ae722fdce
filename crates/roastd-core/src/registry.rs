use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use roastd_db::models::{SessionRow, SubmissionRow};
use roastd_db::{Database, InsertSession, PromptUpdate};
use roastd_types::models::{RoastSession, SessionState, Submission};

use crate::convert::{db_timestamp, session_from_row, submission_from_row};
use crate::error::{RoastError, RoastResult};
use crate::{db_call, ids};

/// Bounded retries when the server draws the link code itself.
pub const MAX_LINK_CODE_ATTEMPTS: usize = 5;

/// How long a run may hold a session in `generating` before clients may
/// edit prompts again.
pub const DEFAULT_GENERATION_LEASE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct NewSession {
    pub photo_url: String,
    pub prompt: String,
    /// Caller-drawn code; a collision is reported back instead of retried.
    pub link_code: Option<String>,
    pub creator_identity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub session_id: Uuid,
    pub link_code: String,
}

/// Durable record of every roast session.
#[derive(Clone)]
pub struct SessionRegistry {
    db: Arc<Database>,
    next_link_code: fn() -> String,
    generation_lease: Duration,
}

impl SessionRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            next_link_code: ids::new_link_code,
            generation_lease: DEFAULT_GENERATION_LEASE,
        }
    }

    pub fn with_generation_lease(mut self, lease: Duration) -> Self {
        self.generation_lease = lease;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_link_code_source(db: Arc<Database>, next_link_code: fn() -> String) -> Self {
        Self {
            next_link_code,
            ..Self::new(db)
        }
    }

    /// Runs that started before this timestamp no longer lock the prompts.
    fn stale_before(&self) -> String {
        chrono::Duration::from_std(self.generation_lease)
            .ok()
            .and_then(|lease| Utc::now().checked_sub_signed(lease))
            .map(db_timestamp)
            .unwrap_or_default()
    }

    pub async fn create_session(&self, new: NewSession) -> RoastResult<CreatedSession> {
        let photo_url = new.photo_url.trim().to_string();
        if !(photo_url.starts_with("http://") || photo_url.starts_with("https://")) {
            return Err(RoastError::InvalidInput("photoUrl must be an http(s) URL".into()));
        }
        let prompt = required_prompt(&new.prompt)?;
        let creator_identity = new
            .creator_identity
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let caller_code = match new.link_code {
            Some(code) if !ids::is_valid_link_code(&code) => {
                return Err(RoastError::InvalidInput(
                    "linkCode must be 8 alphanumeric characters".into(),
                ));
            }
            other => other,
        };
        let attempts = if caller_code.is_some() { 1 } else { MAX_LINK_CODE_ATTEMPTS };

        for attempt in 1..=attempts {
            let link_code = caller_code.clone().unwrap_or_else(self.next_link_code);
            let session_id = ids::new_session_id();
            let row = SessionRow {
                session_id: session_id.to_string(),
                link_code: link_code.clone(),
                creator_identity: creator_identity.clone(),
                original_photo_url: photo_url.clone(),
                creator_prompt: prompt.clone(),
                recipient_prompt: None,
                generated_photo_url: None,
                state: SessionState::Created.as_str().to_string(),
                created_at: db_timestamp(Utc::now()),
            };

            match db_call(&self.db, move |db| db.insert_session(&row)).await? {
                InsertSession::Inserted => {
                    info!("Session {} created with link code {}", session_id, link_code);
                    return Ok(CreatedSession { session_id, link_code });
                }
                InsertSession::LinkCodeTaken => {
                    warn!("Link code collision on attempt {}/{}", attempt, attempts);
                }
            }
        }

        Err(RoastError::Conflict("link code already in use".into()))
    }

    /// Overwrite the creator's prompt ("reroll"). Only before generation.
    pub async fn set_creator_prompt(&self, link_code: &str, prompt: &str) -> RoastResult<()> {
        let prompt = required_prompt(prompt)?;
        let code = link_code.to_string();
        let stale_before = self.stale_before();
        let outcome = db_call(&self.db, move |db| db.update_creator_prompt(&code, &prompt, &stale_before)).await?;
        check_prompt_update(link_code, outcome)?;
        debug!("Creator prompt updated for {}", link_code);
        Ok(())
    }

    /// Upsert the recipient's prompt. Repeated calls before generation
    /// overwrite each other; last write wins.
    pub async fn set_recipient_prompt(&self, link_code: &str, prompt: &str) -> RoastResult<()> {
        let prompt = required_prompt(prompt)?;
        let code = link_code.to_string();
        let stale_before = self.stale_before();
        let outcome = db_call(&self.db, move |db| db.update_recipient_prompt(&code, &prompt, &stale_before)).await?;
        check_prompt_update(link_code, outcome)?;
        debug!("Recipient prompt updated for {}", link_code);
        Ok(())
    }

    pub async fn get_session_by_link_code(&self, link_code: &str) -> RoastResult<RoastSession> {
        let code = link_code.to_string();
        let row = db_call(&self.db, move |db| db.get_session_by_link_code(&code))
            .await?
            .ok_or_else(|| RoastError::session_not_found(link_code))?;
        Ok(session_from_row(row)?)
    }

    pub async fn get_session(&self, session_id: Uuid) -> RoastResult<RoastSession> {
        let row = db_call(&self.db, move |db| db.get_session_by_id(&session_id.to_string()))
            .await?
            .ok_or_else(|| RoastError::session_not_found(session_id.to_string()))?;
        Ok(session_from_row(row)?)
    }

    /// Every generation attempt recorded for a session, newest first.
    pub async fn submissions(&self, link_code: &str) -> RoastResult<Vec<Submission>> {
        let session = self.get_session_by_link_code(link_code).await?;
        let sid = session.session_id.to_string();
        let rows = db_call(&self.db, move |db| db.get_submissions(&sid)).await?;
        rows.into_iter()
            .map(|r| submission_from_row(r).map_err(RoastError::from))
            .collect()
    }

    // -- Orchestrator-side writes. Concurrent runs race; the latest begin owns the state. --

    pub(crate) async fn begin_generation(&self, session_id: Uuid, prompt: &str, run_id: Uuid) -> RoastResult<usize> {
        let prompt = prompt.to_string();
        let started_at = db_timestamp(Utc::now());
        db_call(&self.db, move |db| {
            db.begin_generation(&session_id.to_string(), &prompt, &run_id.to_string(), &started_at)
        })
        .await
    }

    pub(crate) async fn abandon_generation(&self, session_id: Uuid, run_id: Uuid) -> RoastResult<usize> {
        db_call(&self.db, move |db| {
            db.abandon_generation(&session_id.to_string(), &run_id.to_string())
        })
        .await
    }

    pub(crate) async fn complete_generation(&self, session_id: Uuid, image_url: &str) -> RoastResult<usize> {
        let url = image_url.to_string();
        db_call(&self.db, move |db| db.complete_generation(&session_id.to_string(), &url)).await
    }

    pub(crate) async fn record_submission(
        &self,
        submission_id: Uuid,
        session_id: Uuid,
        roast_text: &str,
        image_url: &str,
    ) -> RoastResult<()> {
        let row = SubmissionRow {
            submission_id: submission_id.to_string(),
            session_id: session_id.to_string(),
            roast_text: roast_text.to_string(),
            ai_generated_image_url: image_url.to_string(),
            created_at: db_timestamp(Utc::now()),
        };
        db_call(&self.db, move |db| db.insert_submission(&row)).await
    }
}

fn required_prompt(prompt: &str) -> RoastResult<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(RoastError::InvalidInput("prompt is required".into()));
    }
    Ok(prompt.to_string())
}

fn check_prompt_update(link_code: &str, outcome: PromptUpdate) -> RoastResult<()> {
    match outcome {
        PromptUpdate::Updated => Ok(()),
        PromptUpdate::NotFound => Err(RoastError::session_not_found(link_code)),
        PromptUpdate::Locked(state) => Err(RoastError::Conflict(format!(
            "session is {}; prompts can no longer be edited",
            state
        ))),
    }
}
