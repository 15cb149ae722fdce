/// Database row types, mapping directly to SQLite rows.
/// Distinct from roastd-types models to keep the DB layer independent.

pub struct SessionRow {
    pub session_id: String,
    pub link_code: String,
    pub creator_identity: Option<String>,
    pub original_photo_url: String,
    pub creator_prompt: String,
    pub recipient_prompt: Option<String>,
    pub generated_photo_url: Option<String>,
    pub state: String,
    pub created_at: String,
}

pub struct SubmissionRow {
    pub submission_id: String,
    pub session_id: String,
    pub roast_text: String,
    pub ai_generated_image_url: String,
    pub created_at: String,
}

pub struct InboxRow {
    pub id: String,
    pub session_id: String,
    pub creator_identity: Option<String>,
    pub prompt: String,
    pub original_photo_url: String,
    pub generated_photo_url: String,
    pub message: String,
    pub created_at: String,
}
