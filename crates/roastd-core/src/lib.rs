//! The roast session workflow: link-code addressed sessions, prompt
//! negotiation between creator and recipient, best-effort image generation
//! and fan-out of the result into the creator's inbox.

pub mod convert;
pub mod error;
pub mod ids;
pub mod inbox;
pub mod orchestrator;
pub mod registry;

use std::sync::Arc;

use roastd_db::Database;

pub use error::{RoastError, RoastResult};
pub use inbox::{InboxStore, NewInboxEntry};
pub use orchestrator::{GenerationOutcome, Orchestrator};
pub use registry::{CreatedSession, NewSession, SessionRegistry};

/// Run a blocking database call off the async runtime.
pub(crate) async fn db_call<F, T>(db: &Arc<Database>, f: F) -> RoastResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(RoastError::from)
}
