//! Canonical record identifiers.
//!
//! Catalog entries and their notes are keyed by a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! - [`RecordId::new`] allocates a fresh identifier on insert.
//! - [`RecordId::parse`] validates identifiers arriving from outside (path segments, CLI
//!   arguments, snapshot files). Non-canonical values (uppercase, hyphenated, wrong length,
//!   non-hex) are rejected rather than normalised, so one entry can never be addressed by two
//!   different strings.
//!
//! Example: `550e8400e29b41d4a716446655440000`

mod record_id;

pub use record_id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
