//! # API Shared
//!
//! Shared utilities and definitions for dxcat APIs.
//!
//! Contains:
//! - Shared services like `HealthService`
//! - Authentication utilities: API key checks and principal extraction from request headers
//!
//! Used by `api-rest` and the `dxcat-run` binary.

pub mod auth;
pub mod health;

pub use auth::{AuthError, PrincipalHeaders};
pub use health::{HealthRes, HealthService};
