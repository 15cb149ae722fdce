use axum::{Json, extract::State};

use roastd_types::api::{GenerateRequest, GenerateResponse};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /generate
///
/// Called by the recipient surface. Answers with success whenever some
/// image could be delivered, even if it is the original photo. The run is
/// detached from the request, so a client hanging up does not cut it short.
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let outcome = state
        .orchestrator
        .generate_detached(req.session_id, req.prompt)
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        image_url: outcome.image_url,
        submission_id: outcome.submission_id,
        degraded: outcome.degraded,
        message: outcome.message,
    }))
}
