//! In-memory implementations of the storage collaborators.
//!
//! Entries are kept in insertion order, which is the "natural order" that stable sorts in the
//! matching engine fall back to.

use super::{CatalogRepository, MembershipDirectory, VocabularyRepository};
use crate::error::{RepositoryError, RepositoryResult};
use crate::model::{DiagnosisEntry, DiagnosisNote, EntryId, NoteId};
use crate::predicate::{PageWindow, Predicate, SortSpec};
use crate::principal::{OrganizationId, PrincipalId};
use crate::symptoms::normalize_all;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<Vec<DiagnosisEntry>>,
}

impl InMemoryCatalog {
    /// Build a catalog from a snapshot, applying the unique index as entries are loaded.
    ///
    /// # Errors
    ///
    /// Returns the first `UniqueViolation` found in the snapshot.
    pub fn from_entries(entries: Vec<DiagnosisEntry>) -> RepositoryResult<Self> {
        let mut stored: Vec<DiagnosisEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            check_unique(&stored, &entry)?;
            stored.push(entry);
        }
        Ok(Self {
            entries: RwLock::new(stored),
        })
    }

    /// Copy of every stored entry in natural order.
    pub async fn snapshot(&self) -> Vec<DiagnosisEntry> {
        self.entries.read().await.clone()
    }
}

/// Reject `candidate` if another stored entry (different id) occupies one of its uniqueness
/// shapes.
fn check_unique(stored: &[DiagnosisEntry], candidate: &DiagnosisEntry) -> RepositoryResult<()> {
    let keys = candidate.uniqueness_keys();
    if keys.is_empty() {
        return Ok(());
    }
    for existing in stored.iter().filter(|e| e.id != candidate.id) {
        let existing_keys = existing.uniqueness_keys();
        if let Some(hit) = keys.iter().find(|k| existing_keys.contains(k)) {
            return Err(RepositoryError::UniqueViolation(hit.dimension));
        }
    }
    Ok(())
}

fn find_mut<'a>(
    entries: &'a mut [DiagnosisEntry],
    id: &EntryId,
) -> RepositoryResult<&'a mut DiagnosisEntry> {
    entries
        .iter_mut()
        .find(|e| &e.id == id)
        .ok_or(RepositoryError::Missing(*id))
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn find(
        &self,
        filter: &Predicate,
        sort: &SortSpec,
        window: Option<PageWindow>,
    ) -> RepositoryResult<Vec<DiagnosisEntry>> {
        let entries = self.entries.read().await;
        let mut hits: Vec<DiagnosisEntry> =
            entries.iter().filter(|e| filter.matches(e)).cloned().collect();
        // Vec::sort_by is stable, so ties keep insertion order.
        hits.sort_by(|a, b| sort.compare(a, b));

        Ok(match window {
            Some(w) => hits.into_iter().skip(w.skip).take(w.take).collect(),
            None => hits,
        })
    }

    async fn count(&self, filter: &Predicate) -> RepositoryResult<usize> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).count())
    }

    async fn get_by_id(&self, id: &EntryId) -> RepositoryResult<Option<DiagnosisEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|e| &e.id == id).cloned())
    }

    async fn insert(&self, entry: DiagnosisEntry) -> RepositoryResult<DiagnosisEntry> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(RepositoryError::Unavailable(format!(
                "duplicate primary key {}",
                entry.id
            )));
        }
        check_unique(&entries, &entry)?;
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn insert_many(
        &self,
        batch: Vec<DiagnosisEntry>,
    ) -> Vec<RepositoryResult<DiagnosisEntry>> {
        let mut entries = self.entries.write().await;
        let mut results = Vec::with_capacity(batch.len());
        for entry in batch {
            let outcome = check_unique(&entries, &entry).map(|()| {
                entries.push(entry.clone());
                entry
            });
            results.push(outcome);
        }
        results
    }

    async fn update(&self, entry: DiagnosisEntry) -> RepositoryResult<DiagnosisEntry> {
        let mut entries = self.entries.write().await;
        check_unique(&entries, &entry)?;
        let slot = entries
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or(RepositoryError::Missing(entry.id))?;
        let notes = std::mem::take(&mut slot.notes);
        *slot = DiagnosisEntry { notes, ..entry };
        Ok(slot.clone())
    }

    async fn push_note(&self, entry_id: &EntryId, note: DiagnosisNote) -> RepositoryResult<()> {
        let mut entries = self.entries.write().await;
        let entry = find_mut(&mut entries, entry_id)?;
        entry.notes.push(note);
        Ok(())
    }

    async fn edit_note(
        &self,
        entry_id: &EntryId,
        note_id: &NoteId,
        content: String,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<DiagnosisNote>> {
        let mut entries = self.entries.write().await;
        let entry = find_mut(&mut entries, entry_id)?;
        Ok(entry.notes.iter_mut().find(|n| &n.id == note_id).map(|note| {
            note.content = content;
            note.updated_at = at;
            note.clone()
        }))
    }

    async fn remove_note(&self, entry_id: &EntryId, note_id: &NoteId) -> RepositoryResult<bool> {
        let mut entries = self.entries.write().await;
        let entry = find_mut(&mut entries, entry_id)?;
        let before = entry.notes.len();
        entry.notes.retain(|n| &n.id != note_id);
        Ok(entry.notes.len() != before)
    }

    async fn delete(&self, id: &EntryId) -> RepositoryResult<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| &e.id != id);
        Ok(entries.len() != before)
    }
}

/// Membership record of one clinician.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub id: PrincipalId,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Membership of one organization, as loaded from a membership file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembership {
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub admin_id: Option<PrincipalId>,
    #[serde(default)]
    pub psychologists: Vec<MemberRecord>,
}

#[derive(Debug, Default)]
pub struct InMemoryMembership {
    organizations: RwLock<HashMap<OrganizationId, OrganizationMembership>>,
}

impl InMemoryMembership {
    pub fn from_organizations(organizations: Vec<OrganizationMembership>) -> Self {
        let map = organizations
            .into_iter()
            .map(|org| (org.organization_id.clone(), org))
            .collect();
        Self {
            organizations: RwLock::new(map),
        }
    }

    /// Insert or replace an organization's membership.
    pub async fn put(&self, membership: OrganizationMembership) {
        self.organizations
            .write()
            .await
            .insert(membership.organization_id.clone(), membership);
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembership {
    async fn current_admin(&self, org: &OrganizationId) -> RepositoryResult<Option<PrincipalId>> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(org).and_then(|m| m.admin_id.clone()))
    }

    async fn active_psychologists(
        &self,
        org: &OrganizationId,
    ) -> RepositoryResult<BTreeSet<PrincipalId>> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(org)
            .map(|m| {
                m.psychologists
                    .iter()
                    .filter(|p| p.active)
                    .map(|p| p.id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryVocabulary {
    names: RwLock<BTreeSet<String>>,
}

impl InMemoryVocabulary {
    /// Start from already-stored symptom names, normalising them on the way in.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: RwLock::new(normalize_all(names).into_iter().collect()),
        }
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryVocabulary {
    async fn upsert(&self, name: &str) -> RepositoryResult<bool> {
        Ok(self.names.write().await.insert(name.to_string()))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<String>> {
        Ok(self.names.read().await.iter().cloned().collect())
    }
}
