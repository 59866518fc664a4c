//! Request extractors.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::{
    validate_api_key, API_KEY_HEADER, ORGANIZATION_ID_HEADER, PRINCIPAL_ID_HEADER,
    PRINCIPAL_ROLE_HEADER,
};
use api_shared::PrincipalHeaders;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use dxcat_core::Principal;

/// The caller, after the API key has been checked.
pub struct Authenticated(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let headers = &parts.headers;
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        validate_api_key(header(API_KEY_HEADER), &state.api_key)?;
        let principal = PrincipalHeaders {
            id: header(PRINCIPAL_ID_HEADER),
            role: header(PRINCIPAL_ROLE_HEADER),
            organization_id: header(ORGANIZATION_ID_HEADER),
        }
        .into_principal()?;

        Ok(Authenticated(principal))
    }
}
