//! Health check endpoint.

use axum::extract::State;
use serde::Serialize;

use wabridge_ipc::NetworkClient;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub connected: bool,
    pub chats: i64,
    pub messages: i64,
    pub time: String,
}

pub async fn health<N: NetworkClient>(
    State(state): State<AppState<N>>,
) -> Result<ApiResponse<Health>, ApiError> {
    let health = Health {
        status: "ok",
        connected: state.network.is_connected(),
        chats: state.db.count_chats().await?,
        messages: state.db.count_messages(None).await?,
        time: chrono::Utc::now().to_rfc3339(),
    };
    Ok(ApiResponse::ok(health))
}
