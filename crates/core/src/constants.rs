//! Constants used throughout the catalog core crate.

/// Page size used when a request omits `pageSize` or supplies an unusable value.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound applied to any requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// Leading marker that UIs attach to symptom tags (`#insomnia`).
pub const SYMPTOM_TAG_MARKER: char = '#';

/// Maximum length of a diagnosis display name, in characters.
pub const MAX_NAME_LEN: usize = 256;

/// Maximum length of a single note body, in characters.
pub const MAX_NOTE_LEN: usize = 10_000;

/// Maximum number of symptoms stored on a single catalog entry.
pub const MAX_SYMPTOMS_PER_ENTRY: usize = 250;

/// Message shared by `Forbidden` and `NotFound` so the two cannot be told apart.
pub const NOT_AVAILABLE_MESSAGE: &str = "diagnosis not found or not accessible";
