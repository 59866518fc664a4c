//! Storage collaborators.
//!
//! The catalog core never talks to a database directly. It depends on three narrow traits, one
//! per collection it reads or writes, and ships in-memory implementations ([`memory`]) that back
//! the REST server, the CLI and the test suite.

pub mod memory;

use crate::error::RepositoryResult;
use crate::model::{DiagnosisEntry, DiagnosisNote, EntryId, NoteId};
use crate::predicate::{PageWindow, Predicate, SortSpec};
use crate::principal::{OrganizationId, PrincipalId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The diagnosis collection.
///
/// Implementations must enforce the uniqueness shapes of [`DiagnosisEntry::uniqueness_keys`] on
/// `insert`, `insert_many` and `update`, returning
/// [`RepositoryError::UniqueViolation`](crate::error::RepositoryError::UniqueViolation). The
/// service-level duplicate check is only an early, friendlier rejection.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find(
        &self,
        filter: &Predicate,
        sort: &SortSpec,
        window: Option<PageWindow>,
    ) -> RepositoryResult<Vec<DiagnosisEntry>>;

    async fn count(&self, filter: &Predicate) -> RepositoryResult<usize>;

    async fn get_by_id(&self, id: &EntryId) -> RepositoryResult<Option<DiagnosisEntry>>;

    async fn insert(&self, entry: DiagnosisEntry) -> RepositoryResult<DiagnosisEntry>;

    /// Unordered batch insert. One result per input, in input order; a failure never prevents
    /// the remaining records from being attempted.
    async fn insert_many(
        &self,
        entries: Vec<DiagnosisEntry>,
    ) -> Vec<RepositoryResult<DiagnosisEntry>>;

    /// Replace a stored entry (matched by id) with `entry`.
    ///
    /// The stored notes are kept: `entry.notes` is ignored, so a note written while the caller
    /// held its copy is not lost. The returned entry carries the stored notes.
    async fn update(&self, entry: DiagnosisEntry) -> RepositoryResult<DiagnosisEntry>;

    /// Append `note` to the entry's notes in one atomic step.
    async fn push_note(&self, entry_id: &EntryId, note: DiagnosisNote) -> RepositoryResult<()>;

    /// Replace the content of one note in place. `None` when the entry has no such note.
    async fn edit_note(
        &self,
        entry_id: &EntryId,
        note_id: &NoteId,
        content: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<DiagnosisNote>>;

    /// Remove one note. Returns `false` when the entry has no such note.
    async fn remove_note(&self, entry_id: &EntryId, note_id: &NoteId) -> RepositoryResult<bool>;

    /// Hard delete. Returns `false` when nothing was stored under `id`.
    async fn delete(&self, id: &EntryId) -> RepositoryResult<bool>;
}

/// Organization membership lookups used by the visibility resolver.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// The organization's current `company_admin`, if one is assigned.
    async fn current_admin(&self, org: &OrganizationId) -> RepositoryResult<Option<PrincipalId>>;

    /// Ids of the organization's active psychologists.
    async fn active_psychologists(
        &self,
        org: &OrganizationId,
    ) -> RepositoryResult<BTreeSet<PrincipalId>>;
}

/// Symptom suggestion list.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Insert `name` if absent. Returns `true` when it was newly added.
    async fn upsert(&self, name: &str) -> RepositoryResult<bool>;

    /// Every stored name, alphabetically sorted.
    async fn list_all(&self) -> RepositoryResult<Vec<String>>;
}

/// The collaborators a catalog deployment is wired with.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogRepository>,
    pub membership: Arc<dyn MembershipDirectory>,
    pub vocabulary: Arc<dyn VocabularyRepository>,
}

impl Stores {
    /// Fresh, empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            catalog: Arc::new(memory::InMemoryCatalog::default()),
            membership: Arc::new(memory::InMemoryMembership::default()),
            vocabulary: Arc::new(memory::InMemoryVocabulary::default()),
        }
    }
}
