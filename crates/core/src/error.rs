use crate::constants::NOT_AVAILABLE_MESSAGE;
use crate::model::EntryId;

/// The uniqueness shape that a duplicate collided on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniqueDimension {
    /// `(name, dsm5Code, organizationId)`
    NameDsm5Code,
    /// `(name, icd10Code, organizationId)`
    NameIcd10Code,
    /// `(name, codingSystem, code, organizationId)`
    NameLegacyCode,
}

impl std::fmt::Display for UniqueDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            UniqueDimension::NameDsm5Code => "name and DSM-5 code",
            UniqueDimension::NameIcd10Code => "name and ICD-10 code",
            UniqueDimension::NameLegacyCode => "name, coding system and code",
        };
        f.write_str(label)
    }
}

/// Errors raised by repository collaborators.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("unique constraint violated on {0}")]
    UniqueViolation(UniqueDimension),
    #[error("record {0} does not exist")]
    Missing(EntryId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Outcomes surfaced to the request layer.
///
/// `Forbidden` and `NotFound` render the same message so that callers cannot probe for the
/// existence of another tenant's entries.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{}", NOT_AVAILABLE_MESSAGE)]
    Forbidden,
    #[error("{}", NOT_AVAILABLE_MESSAGE)]
    NotFound,
    #[error("a diagnosis with the same {dimension} already exists")]
    Conflict { dimension: UniqueDimension },
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(dimension) => CatalogError::Conflict { dimension },
            RepositoryError::Missing(_) => CatalogError::NotFound,
            other => CatalogError::Repository(other),
        }
    }
}

impl From<dxcat_types::TextError> for CatalogError {
    fn from(err: dxcat_types::TextError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
