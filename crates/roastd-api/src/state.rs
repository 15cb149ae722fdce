use std::sync::Arc;

use roastd_core::{InboxStore, Orchestrator, SessionRegistry};
use roastd_storage::DiskStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub registry: SessionRegistry,
    pub inbox: InboxStore,
    pub orchestrator: Arc<Orchestrator>,
    /// Same store the orchestrator writes to, kept concrete for serving files.
    pub storage: Arc<DiskStore>,
    pub max_upload_bytes: usize,
}
