//! Mapping of catalog and authentication failures onto HTTP responses.

use api_shared::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use dxcat_core::CatalogError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    BadRequest(String),
    Catalog(CatalogError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Catalog(e) => match e {
                CatalogError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                CatalogError::Forbidden => (StatusCode::FORBIDDEN, e.to_string()),
                CatalogError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
                CatalogError::Conflict { .. } => (StatusCode::CONFLICT, e.to_string()),
                CatalogError::Repository(err) => {
                    tracing::error!("Catalog repository error: {:?}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
                }
            },
        };
        (status, Json(ErrorRes { error: message })).into_response()
    }
}
