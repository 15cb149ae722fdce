pub mod error;
pub mod generate;
pub mod inbox;
pub mod photos;
pub mod sessions;
pub mod state;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::{AppState, AppStateInner};

/// Every route the mobile client and the recipient web surface use.
pub fn router(state: AppState) -> Router {
    let max_upload = state.max_upload_bytes;

    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{link_code}", get(sessions::get_session))
        .route("/sessions/{link_code}/creator-prompt", patch(sessions::set_creator_prompt))
        .route("/sessions/{link_code}/recipient-prompt", patch(sessions::set_recipient_prompt))
        .route("/sessions/{link_code}/submissions", get(sessions::list_submissions))
        .route("/generate", post(generate::generate))
        .route("/inbox", get(inbox::list_inbox))
        .route("/inbox/{id}", delete(inbox::delete_inbox_entry))
        .route("/photos", post(photos::upload_photo))
        .route("/storage/{name}", get(photos::serve_object))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload))
        // Recipients open links from arbitrary origins
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
