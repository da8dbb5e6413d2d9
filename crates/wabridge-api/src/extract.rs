use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use wabridge_core::validation::{DEFAULT_PAGE_LIMIT, validate_pagination};

use crate::error::ApiError;

/// JSON body whose rejections come back in the response envelope as 400s.
/// Pair with `#[serde(deny_unknown_fields)]` on the target type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJson<T>(pub T);

impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(StrictJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Query values arrive as raw strings so a malformed number is reported in
/// the envelope instead of as a bare extractor rejection.
pub(crate) fn parse_int(name: &str, value: Option<&str>) -> Result<Option<i64>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Invalid {name}: {raw}"))),
    }
}

/// `limit` defaults to 20 and `offset` to 0.
pub(crate) fn pagination(
    limit: Option<&str>,
    offset: Option<&str>,
) -> Result<(i64, i64), ApiError> {
    let limit = parse_int("limit", limit)?.unwrap_or(DEFAULT_PAGE_LIMIT);
    let offset = parse_int("offset", offset)?.unwrap_or(0);
    Ok(validate_pagination(limit, offset)?)
}
