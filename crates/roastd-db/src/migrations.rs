use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (roast sessions, submissions, inbox)");
        conn.execute_batch(
            "
            CREATE TABLE roast_sessions (
                session_id          TEXT PRIMARY KEY,
                link_code           TEXT NOT NULL UNIQUE,
                creator_identity    TEXT,
                original_photo_url  TEXT NOT NULL,
                creator_prompt      TEXT NOT NULL,
                recipient_prompt    TEXT,
                generated_photo_url TEXT,
                state               TEXT NOT NULL DEFAULT 'created',
                created_at          TEXT NOT NULL
            );

            -- No foreign keys: submissions and inbox entries outlive a pruned session.
            CREATE TABLE roast_submissions (
                submission_id           TEXT PRIMARY KEY,
                session_id              TEXT NOT NULL,
                roast_text              TEXT NOT NULL,
                ai_generated_image_url  TEXT NOT NULL,
                created_at              TEXT NOT NULL
            );

            CREATE INDEX idx_submissions_session
                ON roast_submissions(session_id, created_at);

            CREATE TABLE inbox (
                id                  TEXT PRIMARY KEY,
                session_id          TEXT NOT NULL,
                creator_identity    TEXT,
                prompt              TEXT NOT NULL,
                original_photo_url  TEXT NOT NULL,
                generated_photo_url TEXT NOT NULL,
                message             TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_inbox_created ON inbox(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (generation run tracking)");
        conn.execute_batch(
            "
            ALTER TABLE roast_sessions ADD COLUMN generation_id TEXT;
            ALTER TABLE roast_sessions ADD COLUMN generation_started_at TEXT;

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
