//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{CatalogError, CatalogResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    default_page_size: usize,
    max_page_size: usize,
    vocabulary_sync: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            vocabulary_sync: true,
        }
    }
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if either page size is zero or the default exceeds the
    /// maximum.
    pub fn new(
        default_page_size: usize,
        max_page_size: usize,
        vocabulary_sync: bool,
    ) -> CatalogResult<Self> {
        if default_page_size == 0 || max_page_size == 0 {
            return Err(CatalogError::Validation(
                "page sizes must be positive".into(),
            ));
        }
        if default_page_size > max_page_size {
            return Err(CatalogError::Validation(format!(
                "default page size {} exceeds maximum page size {}",
                default_page_size, max_page_size
            )));
        }

        Ok(Self {
            default_page_size,
            max_page_size,
            vocabulary_sync,
        })
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Whether create/update/import push new symptom names into the vocabulary.
    pub fn vocabulary_sync(&self) -> bool {
        self.vocabulary_sync
    }
}

/// Parse a page size from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns `fallback`.
pub fn page_size_from_env_value(value: Option<String>, fallback: usize) -> CatalogResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(fallback),
        Some(v) => v
            .parse::<usize>()
            .map_err(|_| CatalogError::Validation(format!("invalid page size: '{}'", v))),
    }
}

/// Parse a boolean switch from an optional environment value (`true/false/1/0/yes/no/on/off`).
///
/// If `value` is `None` or empty/whitespace, returns `fallback`.
pub fn flag_from_env_value(value: Option<String>, fallback: bool) -> CatalogResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(fallback),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => Err(CatalogError::Validation(format!(
            "invalid boolean flag: '{}'",
            other
        ))),
    }
}
