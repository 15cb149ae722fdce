use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use tracing::info;

use roastd_imagegen::sniff_mime;
use roastd_storage::{ObjectStore, content_type_for, extension_for};
use roastd_types::api::UploadPhotoResponse;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /photos: raw image bytes in, public URL out.
pub async fn upload_photo(State(state): State<AppState>, bytes: Bytes) -> AppResult<impl IntoResponse> {
    if bytes.is_empty() {
        return Err(AppError::BadRequest("photo body is empty".into()));
    }
    if bytes.len() > state.max_upload_bytes {
        return Err(AppError::PayloadTooLarge);
    }

    let mime_type = sniff_mime(&bytes);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let name = format!(
        "roast_{}_{}.{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8],
        extension_for(mime_type)
    );

    let size = bytes.len();
    let url = state.storage.put(bytes, &name, mime_type).await?;
    info!("Photo {} uploaded ({} bytes)", name, size);

    Ok((StatusCode::CREATED, Json(UploadPhotoResponse { url })))
}

/// GET /storage/{name}
pub async fn serve_object(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let bytes = state.storage.read(&name).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}
