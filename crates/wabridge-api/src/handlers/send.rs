//! Outbound text and file messages.

use axum::extract::State;
use serde::Deserialize;

use wabridge_core::validation::{
    validate_file_path, validate_media_type, validate_message_content, validate_recipient,
};
use wabridge_ipc::NetworkClient;

use crate::error::ApiError;
use crate::extract::StrictJson;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Carries either `message` or `file_path`, never both.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendRequest {
    pub recipient: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

pub async fn send<N: NetworkClient>(
    State(state): State<AppState<N>>,
    StrictJson(req): StrictJson<SendRequest>,
) -> Result<ApiResponse, ApiError> {
    validate_recipient(&req.recipient)?;

    match (req.message, req.file_path) {
        (Some(message), None) => {
            if message.is_empty() {
                return Err(ApiError::BadRequest("message cannot be empty".into()));
            }
            validate_message_content(&message)?;
            ensure_connected(&state)?;

            state.network.send_message(&req.recipient, &message).await?;
            tracing::info!(recipient = %req.recipient, "Sent text message");
        }
        (None, Some(file_path)) => {
            let path = validate_file_path(&file_path)?;
            validate_media_type(&file_path)?;
            let is_file = tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if !is_file {
                return Err(ApiError::BadRequest(format!(
                    "file not found: {}",
                    path.display()
                )));
            }
            ensure_connected(&state)?;

            state.network.send_file(&req.recipient, &path).await?;
            tracing::info!(recipient = %req.recipient, file = %path.display(), "Sent file");
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "provide either message or file_path, not both".into(),
            ));
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "either message or file_path is required".into(),
            ));
        }
    }

    Ok(ApiResponse::message(format!("Message sent to {}", req.recipient)))
}

pub(crate) fn ensure_connected<N: NetworkClient>(state: &AppState<N>) -> Result<(), ApiError> {
    if state.network.is_connected() {
        Ok(())
    } else {
        Err(ApiError::NotConnected)
    }
}
