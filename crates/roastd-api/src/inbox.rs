use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use roastd_types::api::InboxEntryResponse;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /inbox: every delivered entry, newest first.
pub async fn list_inbox(State(state): State<AppState>) -> AppResult<Json<Vec<InboxEntryResponse>>> {
    let entries = state.inbox.list_all().await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// DELETE /inbox/{id}
pub async fn delete_inbox_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.inbox.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
