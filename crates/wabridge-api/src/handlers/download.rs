//! Media download for stored messages.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use wabridge_core::validation::validate_jid;
use wabridge_ipc::NetworkClient;

use crate::error::ApiError;
use crate::extract::StrictJson;
use crate::handlers::send::ensure_connected;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadRequest {
    pub message_id: String,
    pub chat_jid: String,
}

#[derive(Debug, Serialize)]
pub struct Downloaded {
    pub file_path: String,
    pub media_type: Option<String>,
    pub filename: Option<String>,
}

pub async fn download<N: NetworkClient>(
    State(state): State<AppState<N>>,
    StrictJson(req): StrictJson<DownloadRequest>,
) -> Result<ApiResponse<Downloaded>, ApiError> {
    if req.message_id.trim().is_empty() {
        return Err(ApiError::BadRequest("message_id cannot be empty".into()));
    }
    validate_jid(&req.chat_jid)?;

    let message = state.db.get_message(&req.message_id, &req.chat_jid).await?;
    if !message.has_media() {
        return Err(ApiError::NotFound(format!(
            "Message {} has no media",
            req.message_id
        )));
    }
    ensure_connected(&state)?;

    let path = state
        .network
        .download_media(&req.message_id, &req.chat_jid)
        .await?;
    tracing::info!(message_id = %req.message_id, file = %path.display(), "Downloaded media");

    let media_type = message.media_type.clone();
    let label = media_type.as_deref().unwrap_or("media");
    Ok(ApiResponse::ok(Downloaded {
        file_path: path.display().to_string(),
        filename: message.filename.clone(),
        media_type: media_type.clone(),
    })
    .with_message(format!("Successfully downloaded {label} media")))
}
