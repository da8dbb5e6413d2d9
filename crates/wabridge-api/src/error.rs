use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use wabridge_core::ValidationError;
use wabridge_db::DbError;
use wabridge_ipc::IpcError;

use crate::response::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Not connected to the messaging network")]
    NotConnected,

    #[error(transparent)]
    Network(#[from] IpcError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Db(DbError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Db(DbError::ForeignKeyViolation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Db(DbError::StorageUnavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Network(IpcError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotConnected | ApiError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => tracing::error!("Storage failure: {}", self),
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                tracing::warn!("Network client failure: {}", self)
            }
            _ => tracing::debug!(status = status.as_u16(), "Rejected request: {}", self),
        }

        (status, Json(ApiResponse::failure(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(ValidationError::EmptyJid), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("chat".into()), StatusCode::NOT_FOUND),
            (
                ApiError::from(DbError::NotFound("message m1".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(DbError::ForeignKeyViolation("1@s.whatsapp.net".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::from(DbError::from(std::io::Error::other("disk gone"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(IpcError::ProcessNotRunning),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ApiError::from(IpcError::Timeout("send_message")),
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }
}
