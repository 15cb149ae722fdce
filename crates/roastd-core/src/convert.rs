//! Row-to-model conversions and timestamp encoding for the DB layer.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use roastd_db::models::{InboxRow, SessionRow, SubmissionRow};
use roastd_types::models::{InboxEntry, RoastSession, SessionState, Submission};

/// Timestamps are stored as fixed-width RFC 3339 strings with microseconds,
/// so lexical order in SQLite matches chronological order.
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') format, no timezone
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt {} '{}'", what, raw))
}

pub fn session_from_row(row: SessionRow) -> Result<RoastSession> {
    let state: SessionState = row
        .state
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .with_context(|| format!("session {}", row.session_id))?;

    Ok(RoastSession {
        session_id: parse_id(&row.session_id, "session_id")?,
        link_code: row.link_code,
        creator_identity: row.creator_identity,
        original_photo_url: row.original_photo_url,
        creator_prompt: row.creator_prompt,
        recipient_prompt: row.recipient_prompt,
        generated_photo_url: row.generated_photo_url,
        state,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

pub fn submission_from_row(row: SubmissionRow) -> Result<Submission> {
    Ok(Submission {
        submission_id: parse_id(&row.submission_id, "submission_id")?,
        session_id: parse_id(&row.session_id, "session_id")?,
        roast_text: row.roast_text,
        ai_generated_image_url: row.ai_generated_image_url,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

pub fn inbox_entry_from_row(row: InboxRow) -> Result<InboxEntry> {
    Ok(InboxEntry {
        id: parse_id(&row.id, "inbox id")?,
        session_id: parse_id(&row.session_id, "session_id")?,
        creator_identity: row.creator_identity,
        prompt: row.prompt,
        original_photo_url: row.original_photo_url,
        generated_photo_url: row.generated_photo_url,
        message: row.message,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
