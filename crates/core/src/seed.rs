//! Loading and saving catalog snapshot and membership files.
//!
//! The format follows the file extension: `.json`, or `.yaml`/`.yml`. Parse failures report the
//! path of the offending field (e.g. `[0].psychologists[1].active`).

use crate::catalog::NewDiagnosis;
use crate::error::RepositoryError;
use crate::model::DiagnosisEntry;
use crate::repositories::memory::{
    InMemoryCatalog, InMemoryMembership, InMemoryVocabulary, OrganizationMembership,
};
use crate::repositories::Stores;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("unsupported file extension for {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} does not match the expected schema at {location}: {message}")]
    Schema {
        path: PathBuf,
        location: String,
        message: String,
    },
    #[error("failed to serialise {path}: {message}")]
    Serialise { path: PathBuf, message: String },
    #[error("snapshot rejected: {0}")]
    Snapshot(#[from] RepositoryError),
}

pub type SeedResult<T> = std::result::Result<T, SeedError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> SeedResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(FileFormat::Json),
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            _ => Err(SeedError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn schema_error(path: &Path, location: String, message: String) -> SeedError {
    let location = if location.is_empty() || location == "." {
        "<root>".to_string()
    } else {
        location
    };
    SeedError::Schema {
        path: path.to_path_buf(),
        location,
        message,
    }
}

/// Read and deserialise a file, choosing the format from its extension.
pub fn read_file<T: DeserializeOwned>(path: &Path) -> SeedResult<T> {
    let format = FileFormat::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match format {
        FileFormat::Json => {
            let mut deserializer = serde_json::Deserializer::from_str(&text);
            serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
                let location = err.path().to_string();
                schema_error(path, location, err.into_inner().to_string())
            })
        }
        FileFormat::Yaml => {
            let deserializer = serde_yaml::Deserializer::from_str(&text);
            serde_path_to_error::deserialize(deserializer).map_err(|err| {
                let location = err.path().to_string();
                schema_error(path, location, err.into_inner().to_string())
            })
        }
    }
}

/// Serialise `value` to `path`, choosing the format from its extension.
pub fn write_file<T: Serialize>(path: &Path, value: &T) -> SeedResult<()> {
    let serialise_error = |message: String| SeedError::Serialise {
        path: path.to_path_buf(),
        message,
    };
    let text = match FileFormat::from_path(path)? {
        FileFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| serialise_error(e.to_string()))?
        }
        FileFormat::Yaml => serde_yaml::to_string(value).map_err(|e| serialise_error(e.to_string()))?,
    };
    fs::write(path, text).map_err(|source| SeedError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_catalog(path: &Path) -> SeedResult<Vec<DiagnosisEntry>> {
    read_file(path)
}

pub fn load_membership(path: &Path) -> SeedResult<Vec<OrganizationMembership>> {
    read_file(path)
}

/// Create-shaped records for bulk import.
pub fn load_import_records(path: &Path) -> SeedResult<Vec<NewDiagnosis>> {
    read_file(path)
}

pub fn write_catalog(path: &Path, entries: &[DiagnosisEntry]) -> SeedResult<()> {
    write_file(path, &entries)
}

/// In-memory stores populated from optional snapshot files.
///
/// The concrete catalog is returned alongside [`Stores`] so that callers can write a snapshot
/// back out after mutating it.
pub struct SeededStores {
    pub stores: Stores,
    pub catalog: Arc<InMemoryCatalog>,
}

/// Build in-memory stores from a catalog snapshot and a membership file.
///
/// The vocabulary starts out holding every symptom already present in the catalog.
///
/// # Errors
///
/// Returns a `SeedError` if either file cannot be read or parsed, or if the snapshot violates
/// the catalog's unique index.
pub fn load_stores(catalog: Option<&Path>, membership: Option<&Path>) -> SeedResult<SeededStores> {
    let entries = match catalog {
        Some(path) => load_catalog(path)?,
        None => vec![],
    };
    let organizations = match membership {
        Some(path) => load_membership(path)?,
        None => vec![],
    };

    let vocabulary =
        InMemoryVocabulary::from_names(entries.iter().flat_map(|e| e.symptoms.iter()));
    let catalog = Arc::new(InMemoryCatalog::from_entries(entries)?);

    tracing::info!(
        organizations = organizations.len(),
        "loaded catalog snapshot and membership"
    );

    Ok(SeededStores {
        stores: Stores {
            catalog: catalog.clone(),
            membership: Arc::new(InMemoryMembership::from_organizations(organizations)),
            vocabulary: Arc::new(vocabulary),
        },
        catalog,
    })
}
