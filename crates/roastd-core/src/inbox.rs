use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use roastd_db::Database;
use roastd_db::models::InboxRow;
use roastd_types::models::InboxEntry;

use crate::convert::{db_timestamp, inbox_entry_from_row};
use crate::db_call;
use crate::error::{RoastError, RoastResult};

#[derive(Debug, Clone)]
pub struct NewInboxEntry {
    pub session_id: Uuid,
    pub creator_identity: Option<String>,
    pub prompt: String,
    pub original_photo_url: String,
    pub generated_photo_url: String,
    pub message: String,
}

/// Append-only delivery surface polled by the creator's client.
///
/// The store does no per-creator filtering; entries carry the creator
/// identity so clients can filter on their side.
#[derive(Clone)]
pub struct InboxStore {
    db: Arc<Database>,
}

impl InboxStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn append(&self, entry: NewInboxEntry) -> RoastResult<InboxEntry> {
        let created_at = Utc::now();
        let id = Uuid::new_v4();
        let row = InboxRow {
            id: id.to_string(),
            session_id: entry.session_id.to_string(),
            creator_identity: entry.creator_identity.clone(),
            prompt: entry.prompt.clone(),
            original_photo_url: entry.original_photo_url.clone(),
            generated_photo_url: entry.generated_photo_url.clone(),
            message: entry.message.clone(),
            created_at: db_timestamp(created_at),
        };
        db_call(&self.db, move |db| db.insert_inbox_entry(&row)).await?;

        Ok(InboxEntry {
            id,
            session_id: entry.session_id,
            creator_identity: entry.creator_identity,
            prompt: entry.prompt,
            original_photo_url: entry.original_photo_url,
            generated_photo_url: entry.generated_photo_url,
            message: entry.message,
            created_at,
        })
    }

    /// All entries, newest first.
    pub async fn list_all(&self) -> RoastResult<Vec<InboxEntry>> {
        let rows = db_call(&self.db, |db| db.get_inbox_entries()).await?;
        rows.into_iter()
            .map(|r| inbox_entry_from_row(r).map_err(RoastError::from))
            .collect()
    }

    /// Moderation removal of a single entry.
    pub async fn delete(&self, id: Uuid) -> RoastResult<()> {
        let deleted = db_call(&self.db, move |db| db.delete_inbox_entry(&id.to_string())).await?;
        if !deleted {
            return Err(RoastError::NotFound {
                entity: "Inbox entry",
                key: id.to_string(),
            });
        }
        info!("Inbox entry {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(prompt: &str) -> NewInboxEntry {
        NewInboxEntry {
            session_id: Uuid::new_v4(),
            creator_identity: None,
            prompt: prompt.to_string(),
            original_photo_url: "https://cdn.example/o.jpg".into(),
            generated_photo_url: "https://cdn.example/g.jpg".into(),
            message: "AI image generated successfully!".into(),
        }
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let inbox = InboxStore::new(Arc::new(Database::open_in_memory().unwrap()));
        for p in ["first", "second", "third"] {
            inbox.append(entry(p)).await.unwrap();
        }

        let listed = inbox.list_all().await.unwrap();
        let prompts: Vec<&str> = listed.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["third", "second", "first"]);
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let inbox = InboxStore::new(Arc::new(Database::open_in_memory().unwrap()));
        let kept = inbox.append(entry("keep")).await.unwrap();
        let gone = inbox.append(entry("drop")).await.unwrap();

        inbox.delete(gone.id).await.unwrap();
        assert!(matches!(inbox.delete(gone.id).await, Err(RoastError::NotFound { .. })));

        let listed = inbox.list_all().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);
    }
}
