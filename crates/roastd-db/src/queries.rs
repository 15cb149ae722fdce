use crate::Database;
use crate::models::{InboxRow, SessionRow, SubmissionRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension};

const SESSION_COLUMNS: &str = "session_id, link_code, creator_identity, original_photo_url, \
     creator_prompt, recipient_prompt, generated_photo_url, state, created_at";

/// Result of inserting a new session.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertSession {
    Inserted,
    /// The link code already belongs to another session.
    LinkCodeTaken,
}

/// A session is open for prompt edits before generation, or when the run
/// holding it in `generating` started before the stale cutoff (`?3`).
/// Reopening a stale run moves the session back to `prompt_negotiated`.
const EDITABLE: &str = "(state IN ('created', 'prompt_negotiated')
     OR (state = 'generating' AND COALESCE(generation_started_at, '') < ?3))";

/// Result of a client-side prompt edit.
#[derive(Debug, PartialEq, Eq)]
pub enum PromptUpdate {
    Updated,
    NotFound,
    /// The session has left the editable states; carries the current state.
    Locked(String),
}

impl Database {
    // -- Sessions --

    pub fn insert_session(&self, row: &SessionRow) -> Result<InsertSession> {
        self.with_conn_mut(|conn| {
            let res = conn.execute(
                "INSERT INTO roast_sessions (session_id, link_code, creator_identity, original_photo_url,
                     creator_prompt, recipient_prompt, generated_photo_url, state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    row.session_id,
                    row.link_code,
                    row.creator_identity,
                    row.original_photo_url,
                    row.creator_prompt,
                    row.recipient_prompt,
                    row.generated_photo_url,
                    row.state,
                    row.created_at,
                ],
            );

            match res {
                Ok(_) => Ok(InsertSession::Inserted),
                Err(e) if is_link_code_collision(&e) => Ok(InsertSession::LinkCodeTaken),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_session_by_link_code(&self, link_code: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, "link_code", link_code))
    }

    pub fn get_session_by_id(&self, session_id: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| query_session(conn, "session_id", session_id))
    }

    /// Overwrite the creator's prompt while the session is still editable.
    /// `stale_before` is the cutoff timestamp for abandoned generation runs.
    pub fn update_creator_prompt(&self, link_code: &str, prompt: &str, stale_before: &str) -> Result<PromptUpdate> {
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE roast_sessions
                 SET creator_prompt = ?2,
                     state = CASE WHEN state = 'generating' THEN 'prompt_negotiated' ELSE state END,
                     generation_id = NULL
                 WHERE link_code = ?1 AND {}",
                EDITABLE
            );
            let changed = conn.execute(&sql, (link_code, prompt, stale_before))?;
            classify_prompt_update(conn, link_code, changed)
        })
    }

    /// Upsert the recipient's prompt while the session is still editable.
    /// Last write wins.
    pub fn update_recipient_prompt(&self, link_code: &str, prompt: &str, stale_before: &str) -> Result<PromptUpdate> {
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE roast_sessions
                 SET recipient_prompt = ?2, state = 'prompt_negotiated', generation_id = NULL
                 WHERE link_code = ?1 AND {}",
                EDITABLE
            );
            let changed = conn.execute(&sql, (link_code, prompt, stale_before))?;
            classify_prompt_update(conn, link_code, changed)
        })
    }

    /// Record the prompt a generation run is using and mark the session as
    /// generating by `run_id`. Unconditional: the latest run owns the state.
    pub fn begin_generation(&self, session_id: &str, prompt: &str, run_id: &str, started_at: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE roast_sessions
                 SET recipient_prompt = ?2, state = 'generating',
                     generation_id = ?3, generation_started_at = ?4
                 WHERE session_id = ?1",
                (session_id, prompt, run_id, started_at),
            )?;
            Ok(changed)
        })
    }

    /// Roll a session back out of `generating` after a run gave up before
    /// producing any image. No-op unless `run_id` still owns the state.
    pub fn abandon_generation(&self, session_id: &str, run_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE roast_sessions
                 SET state = CASE WHEN generated_photo_url IS NULL
                                  THEN 'prompt_negotiated' ELSE 'completed' END,
                     generation_id = NULL
                 WHERE session_id = ?1 AND state = 'generating' AND generation_id = ?2",
                (session_id, run_id),
            )?;
            Ok(changed)
        })
    }

    pub fn complete_generation(&self, session_id: &str, generated_photo_url: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE roast_sessions
                 SET generated_photo_url = ?2, state = 'completed', generation_id = NULL
                 WHERE session_id = ?1",
                (session_id, generated_photo_url),
            )?;
            Ok(changed)
        })
    }

    // -- Submissions --

    pub fn insert_submission(&self, row: &SubmissionRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO roast_submissions (submission_id, session_id, roast_text, ai_generated_image_url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    row.submission_id,
                    row.session_id,
                    row.roast_text,
                    row.ai_generated_image_url,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_submissions(&self, session_id: &str) -> Result<Vec<SubmissionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT submission_id, session_id, roast_text, ai_generated_image_url, created_at
                 FROM roast_submissions
                 WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([session_id], |row| {
                    Ok(SubmissionRow {
                        submission_id: row.get(0)?,
                        session_id: row.get(1)?,
                        roast_text: row.get(2)?,
                        ai_generated_image_url: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Inbox --

    pub fn insert_inbox_entry(&self, row: &InboxRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO inbox (id, session_id, creator_identity, prompt, original_photo_url,
                     generated_photo_url, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.session_id,
                    row.creator_identity,
                    row.prompt,
                    row.original_photo_url,
                    row.generated_photo_url,
                    row.message,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Every inbox entry, newest first. Ties on `created_at` fall back to
    /// insertion order.
    pub fn get_inbox_entries(&self) -> Result<Vec<InboxRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, creator_identity, prompt, original_photo_url,
                        generated_photo_url, message, created_at
                 FROM inbox
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(InboxRow {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        creator_identity: row.get(2)?,
                        prompt: row.get(3)?,
                        original_photo_url: row.get(4)?,
                        generated_photo_url: row.get(5)?,
                        message: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Returns false if no entry had this id.
    pub fn delete_inbox_entry(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM inbox WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_session(conn: &Connection, column: &str, value: &str) -> Result<Option<SessionRow>> {
    // `column` is always one of our own literals, never caller input.
    let sql = format!("SELECT {} FROM roast_sessions WHERE {} = ?1", SESSION_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(SessionRow {
                session_id: row.get(0)?,
                link_code: row.get(1)?,
                creator_identity: row.get(2)?,
                original_photo_url: row.get(3)?,
                creator_prompt: row.get(4)?,
                recipient_prompt: row.get(5)?,
                generated_photo_url: row.get(6)?,
                state: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn classify_prompt_update(conn: &Connection, link_code: &str, changed: usize) -> Result<PromptUpdate> {
    if changed > 0 {
        return Ok(PromptUpdate::Updated);
    }

    let state: Option<String> = conn
        .query_row(
            "SELECT state FROM roast_sessions WHERE link_code = ?1",
            [link_code],
            |row| row.get(0),
        )
        .optional()?;

    Ok(match state {
        Some(state) => PromptUpdate::Locked(state),
        None => PromptUpdate::NotFound,
    })
}

fn is_link_code_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) => {
            e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                && msg.as_deref().is_some_and(|m| m.contains("link_code"))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, code: &str) -> SessionRow {
        SessionRow {
            session_id: id.to_string(),
            link_code: code.to_string(),
            creator_identity: None,
            original_photo_url: "http://localhost:3000/storage/roast_1.jpg".to_string(),
            creator_prompt: "make me a pirate".to_string(),
            recipient_prompt: None,
            generated_photo_url: None,
            state: "created".to_string(),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    // Nothing sorts before the empty string, so no run is ever stale.
    const NEVER_STALE: &str = "";
    const STARTED: &str = "2026-01-01T00:01:00.000000Z";

    fn inbox(id: &str, created_at: &str) -> InboxRow {
        InboxRow {
            id: id.to_string(),
            session_id: "s1".to_string(),
            creator_identity: None,
            prompt: "p".to_string(),
            original_photo_url: "o".to_string(),
            generated_photo_url: "g".to_string(),
            message: "m".to_string(),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_insert_and_fetch_session() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.insert_session(&session("s1", "AAAAAAAA")).unwrap(), InsertSession::Inserted);

        let by_code = db.get_session_by_link_code("AAAAAAAA").unwrap().unwrap();
        assert_eq!(by_code.session_id, "s1");
        assert_eq!(by_code.state, "created");

        let by_id = db.get_session_by_id("s1").unwrap().unwrap();
        assert_eq!(by_id.link_code, "AAAAAAAA");

        assert!(db.get_session_by_link_code("BBBBBBBB").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_link_code_is_reported() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&session("s1", "AAAAAAAA")).unwrap();
        assert_eq!(
            db.insert_session(&session("s2", "AAAAAAAA")).unwrap(),
            InsertSession::LinkCodeTaken
        );
        assert!(db.get_session_by_id("s2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_session_id_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&session("s1", "AAAAAAAA")).unwrap();
        assert!(db.insert_session(&session("s1", "BBBBBBBB")).is_err());
    }

    #[test]
    fn test_prompt_updates_respect_state() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&session("s1", "AAAAAAAA")).unwrap();

        assert_eq!(db.update_recipient_prompt("AAAAAAAA", "first", NEVER_STALE).unwrap(), PromptUpdate::Updated);
        assert_eq!(db.update_recipient_prompt("AAAAAAAA", "second", NEVER_STALE).unwrap(), PromptUpdate::Updated);
        let row = db.get_session_by_id("s1").unwrap().unwrap();
        assert_eq!(row.recipient_prompt.as_deref(), Some("second"));
        assert_eq!(row.state, "prompt_negotiated");

        assert_eq!(db.update_creator_prompt("AAAAAAAA", "reroll", NEVER_STALE).unwrap(), PromptUpdate::Updated);

        db.begin_generation("s1", "second", "run-a", STARTED).unwrap();
        assert_eq!(
            db.update_creator_prompt("AAAAAAAA", "too late", NEVER_STALE).unwrap(),
            PromptUpdate::Locked("generating".to_string())
        );
        assert_eq!(db.update_recipient_prompt("nope", "x", NEVER_STALE).unwrap(), PromptUpdate::NotFound);

        db.complete_generation("s1", "http://img/1.jpg").unwrap();
        assert_eq!(
            db.update_recipient_prompt("AAAAAAAA", "after", "9999").unwrap(),
            PromptUpdate::Locked("completed".to_string())
        );
    }

    #[test]
    fn test_stale_generation_reopens_prompt_edits() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&session("s1", "AAAAAAAA")).unwrap();
        db.begin_generation("s1", "p", "run-a", STARTED).unwrap();

        // Cutoff at the start time: the run is not older than it yet
        assert_eq!(
            db.update_recipient_prompt("AAAAAAAA", "x", STARTED).unwrap(),
            PromptUpdate::Locked("generating".to_string())
        );

        let later = "2026-01-01T00:10:00.000000Z";
        assert_eq!(db.update_recipient_prompt("AAAAAAAA", "retry", later).unwrap(), PromptUpdate::Updated);
        let row = db.get_session_by_id("s1").unwrap().unwrap();
        assert_eq!(row.state, "prompt_negotiated");
        assert_eq!(row.recipient_prompt.as_deref(), Some("retry"));

        db.begin_generation("s1", "p", "run-b", STARTED).unwrap();
        assert_eq!(db.update_creator_prompt("AAAAAAAA", "reroll", later).unwrap(), PromptUpdate::Updated);
        assert_eq!(db.get_session_by_id("s1").unwrap().unwrap().state, "prompt_negotiated");
    }

    #[test]
    fn test_abandon_only_by_owning_run() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&session("s1", "AAAAAAAA")).unwrap();

        db.begin_generation("s1", "p", "run-a", STARTED).unwrap();
        db.begin_generation("s1", "p", "run-b", STARTED).unwrap();

        assert_eq!(db.abandon_generation("s1", "run-a").unwrap(), 0);
        assert_eq!(db.get_session_by_id("s1").unwrap().unwrap().state, "generating");

        assert_eq!(db.abandon_generation("s1", "run-b").unwrap(), 1);
        assert_eq!(db.get_session_by_id("s1").unwrap().unwrap().state, "prompt_negotiated");
    }

    #[test]
    fn test_abandon_generation_restores_previous_phase() {
        let db = Database::open_in_memory().unwrap();
        db.insert_session(&session("s1", "AAAAAAAA")).unwrap();

        db.begin_generation("s1", "p", "run-a", STARTED).unwrap();
        assert_eq!(db.abandon_generation("s1", "run-a").unwrap(), 1);
        assert_eq!(db.get_session_by_id("s1").unwrap().unwrap().state, "prompt_negotiated");

        db.begin_generation("s1", "p", "run-b", STARTED).unwrap();
        db.complete_generation("s1", "http://img/1.jpg").unwrap();
        db.begin_generation("s1", "p2", "run-c", STARTED).unwrap();
        db.abandon_generation("s1", "run-c").unwrap();
        let row = db.get_session_by_id("s1").unwrap().unwrap();
        assert_eq!(row.state, "completed");
        assert_eq!(row.generated_photo_url.as_deref(), Some("http://img/1.jpg"));
    }

    #[test]
    fn test_inbox_newest_first_and_delete() {
        let db = Database::open_in_memory().unwrap();
        db.insert_inbox_entry(&inbox("a", "2026-01-01T00:00:01.000000Z")).unwrap();
        db.insert_inbox_entry(&inbox("b", "2026-01-01T00:00:03.000000Z")).unwrap();
        db.insert_inbox_entry(&inbox("c", "2026-01-01T00:00:02.000000Z")).unwrap();
        db.insert_inbox_entry(&inbox("d", "2026-01-01T00:00:02.000000Z")).unwrap();

        let ids: Vec<String> = db.get_inbox_entries().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "d", "c", "a"]);

        assert!(db.delete_inbox_entry("c").unwrap());
        assert!(!db.delete_inbox_entry("c").unwrap());
        assert_eq!(db.get_inbox_entries().unwrap().len(), 3);
    }

    #[test]
    fn test_submissions_scoped_to_session() {
        let db = Database::open_in_memory().unwrap();
        for (id, sid) in [("x1", "s1"), ("x2", "s1"), ("x3", "s2")] {
            db.insert_submission(&SubmissionRow {
                submission_id: id.to_string(),
                session_id: sid.to_string(),
                roast_text: "p".to_string(),
                ai_generated_image_url: "u".to_string(),
                created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            })
            .unwrap();
        }
        let ids: Vec<String> = db.get_submissions("s1").unwrap().into_iter().map(|r| r.submission_id).collect();
        assert_eq!(ids, vec!["x2", "x1"]);
    }
}
