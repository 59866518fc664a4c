//! Request authentication.
//!
//! Callers are authenticated upstream; the catalog only checks the shared API key and reads the
//! already-authenticated principal from request headers.

use dxcat_core::{Principal, Role};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";
pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing {0} header")]
    MissingHeader(&'static str),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Invalid {header} header: {reason}")]
    InvalidHeader {
        header: &'static str,
        reason: String,
    },
}

/// Validates the provided API key against the key configured at startup.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid or missing.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    let provided_key = provided_key.ok_or(AuthError::MissingHeader(API_KEY_HEADER))?;
    if provided_key == expected_key {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

/// Raw principal header values, as found on a request.
#[derive(Clone, Debug, Default)]
pub struct PrincipalHeaders<'a> {
    pub id: Option<&'a str>,
    pub role: Option<&'a str>,
    pub organization_id: Option<&'a str>,
}

impl PrincipalHeaders<'_> {
    /// Build the principal the headers describe.
    ///
    /// A blank organization header is treated as absent, so that individual accounts can be
    /// sent through proxies that always forward the header.
    pub fn into_principal(self) -> Result<Principal, AuthError> {
        let id = self
            .id
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingHeader(PRINCIPAL_ID_HEADER))?;
        let role = self
            .role
            .ok_or(AuthError::MissingHeader(PRINCIPAL_ROLE_HEADER))?
            .parse::<Role>()
            .map_err(|reason| AuthError::InvalidHeader {
                header: PRINCIPAL_ROLE_HEADER,
                reason,
            })?;
        let organization_id = self
            .organization_id
            .map(str::trim)
            .filter(|v| !v.is_empty());

        Ok(Principal::new(id, role, organization_id))
    }
}
