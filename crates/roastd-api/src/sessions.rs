use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use roastd_core::NewSession;
use roastd_types::api::{
    CreateSessionRequest, CreateSessionResponse, OkResponse, SessionResponse, SetPromptRequest,
    SubmissionResponse,
};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> AppResult<impl IntoResponse> {
    let created = state
        .registry
        .create_session(NewSession {
            photo_url: req.photo_url,
            prompt: req.prompt,
            link_code: req.link_code,
            creator_identity: req.creator_identity,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: created.session_id,
            link_code: created.link_code,
        }),
    ))
}

/// GET /sessions/{link_code}
pub async fn get_session(
    State(state): State<AppState>,
    Path(link_code): Path<String>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.registry.get_session_by_link_code(&link_code).await?;
    Ok(Json(session.into()))
}

/// PATCH /sessions/{link_code}/creator-prompt
pub async fn set_creator_prompt(
    State(state): State<AppState>,
    Path(link_code): Path<String>,
    Json(req): Json<SetPromptRequest>,
) -> AppResult<Json<OkResponse>> {
    state.registry.set_creator_prompt(&link_code, &req.prompt).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// PATCH /sessions/{link_code}/recipient-prompt
pub async fn set_recipient_prompt(
    State(state): State<AppState>,
    Path(link_code): Path<String>,
    Json(req): Json<SetPromptRequest>,
) -> AppResult<Json<OkResponse>> {
    state.registry.set_recipient_prompt(&link_code, &req.prompt).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /sessions/{link_code}/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Path(link_code): Path<String>,
) -> AppResult<Json<Vec<SubmissionResponse>>> {
    let submissions = state.registry.submissions(&link_code).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}
