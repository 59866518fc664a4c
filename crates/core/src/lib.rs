//! # dxcat core
//!
//! Core business logic for the multi-tenant diagnosis catalog.
//!
//! This crate owns the catalog's rules:
//! - Visibility resolution: which entries a principal may read or modify
//! - Symptom normalisation and the symptom-overlap matching engine
//! - Catalog writes (create, update, delete, bulk import) and entry notes
//! - The symptom vocabulary used for autocomplete
//!
//! Storage is reached only through the traits in [`repositories`]; in-memory implementations
//! and snapshot-file loading ([`seed`]) are provided for the server, the CLI and tests.
//!
//! **No API concerns**: authentication and HTTP handling belong in `api-shared` and `api-rest`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod matching;
pub mod model;
pub mod notes;
pub mod pagination;
pub mod predicate;
pub mod principal;
pub mod repositories;
pub mod seed;
pub mod symptoms;
pub mod validation;
pub mod visibility;
pub mod vocabulary;

pub use catalog::{
    CatalogService, DiagnosisPage, DiagnosisPatch, ImportFailure, ImportSummary, ListQuery,
    NewDiagnosis,
};
pub use config::CoreConfig;
pub use error::{CatalogError, CatalogResult, RepositoryError, RepositoryResult, UniqueDimension};
pub use matching::{MatchOutcome, MatchQuery, MatchingEngine, RankedEntry, TriageContext};
pub use model::{CodingSystem, DiagnosisEntry, DiagnosisNote, EntryId, NoteId, Scope};
pub use notes::NoteService;
pub use pagination::{PageRequest, Pagination};
pub use principal::{OrganizationId, Principal, PrincipalId, Role};
pub use repositories::Stores;
pub use visibility::VisibilityResolver;
pub use vocabulary::VocabularyService;

pub use dxcat_types::NonEmptyText;
