//! Discussion notes attached to catalog entries.
//!
//! Anyone who can read an entry can read and add notes on it. A note can only be edited or
//! removed by its author, whatever their role.

use crate::catalog::CatalogService;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{DiagnosisEntry, DiagnosisNote, EntryId, NoteId};
use crate::principal::Principal;
use crate::validation::validate_note;
use chrono::Utc;
use dxcat_uuid::RecordId;

#[derive(Clone)]
pub struct NoteService {
    catalog: CatalogService,
}

impl NoteService {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        entry_id: &EntryId,
    ) -> CatalogResult<Vec<DiagnosisNote>> {
        Ok(self.catalog.get_one(principal, entry_id).await?.notes)
    }

    pub async fn add(
        &self,
        principal: &Principal,
        entry_id: &EntryId,
        content: &str,
    ) -> CatalogResult<DiagnosisNote> {
        let content = validate_note(content)?;
        self.catalog.get_one(principal, entry_id).await?;

        let now = Utc::now();
        let note = DiagnosisNote {
            id: RecordId::new(),
            content,
            author_id: principal.id.clone(),
            created_at: now,
            updated_at: now,
        };
        self.catalog
            .repository()
            .push_note(entry_id, note.clone())
            .await?;

        tracing::info!(entry = %entry_id, note = %note.id, author = %principal.id, "note added");
        Ok(note)
    }

    /// Replace the content of a note written by `principal`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the entry is unreadable or has no such note; `Forbidden` if someone else
    /// wrote it.
    pub async fn edit(
        &self,
        principal: &Principal,
        entry_id: &EntryId,
        note_id: &NoteId,
        content: &str,
    ) -> CatalogResult<DiagnosisNote> {
        let content = validate_note(content)?;
        let entry = self.catalog.get_one(principal, entry_id).await?;
        check_author(&entry, note_id, principal)?;

        let edited = self
            .catalog
            .repository()
            .edit_note(entry_id, note_id, content, Utc::now())
            .await?
            .ok_or(CatalogError::NotFound)?;
        tracing::info!(entry = %entry_id, note = %note_id, "note edited");
        Ok(edited)
    }

    pub async fn delete(
        &self,
        principal: &Principal,
        entry_id: &EntryId,
        note_id: &NoteId,
    ) -> CatalogResult<()> {
        let entry = self.catalog.get_one(principal, entry_id).await?;
        check_author(&entry, note_id, principal)?;

        if !self
            .catalog
            .repository()
            .remove_note(entry_id, note_id)
            .await?
        {
            return Err(CatalogError::NotFound);
        }
        tracing::info!(entry = %entry_id, note = %note_id, "note deleted");
        Ok(())
    }
}

/// Authorship never changes after a note is written, so checking it on a read copy is enough.
fn check_author(entry: &DiagnosisEntry, note_id: &NoteId, principal: &Principal) -> CatalogResult<()> {
    let note = entry.note(note_id).ok_or(CatalogError::NotFound)?;
    if note.author_id != principal.id {
        return Err(CatalogError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DiagnosisPatch, NewDiagnosis};
    use crate::config::CoreConfig;
    use crate::error::RepositoryResult;
    use crate::model::ClinicalDetails;
    use crate::predicate::{PageWindow, Predicate, SortSpec};
    use crate::principal::{OrganizationId, PrincipalId, Role};
    use crate::repositories::memory::{
        InMemoryCatalog, InMemoryMembership, MemberRecord, OrganizationMembership,
    };
    use crate::repositories::{CatalogRepository, Stores};
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::Arc;

    /// Suspends after every read, the way a remote document store would, so that concurrent
    /// writers interleave between their read and their write.
    struct YieldingCatalog {
        inner: InMemoryCatalog,
    }

    #[async_trait]
    impl CatalogRepository for YieldingCatalog {
        async fn find(
            &self,
            filter: &Predicate,
            sort: &SortSpec,
            window: Option<PageWindow>,
        ) -> RepositoryResult<Vec<DiagnosisEntry>> {
            let found = self.inner.find(filter, sort, window).await;
            tokio::task::yield_now().await;
            found
        }
        async fn count(&self, filter: &Predicate) -> RepositoryResult<usize> {
            self.inner.count(filter).await
        }
        async fn get_by_id(&self, id: &EntryId) -> RepositoryResult<Option<DiagnosisEntry>> {
            let found = self.inner.get_by_id(id).await;
            tokio::task::yield_now().await;
            found
        }
        async fn insert(&self, entry: DiagnosisEntry) -> RepositoryResult<DiagnosisEntry> {
            self.inner.insert(entry).await
        }
        async fn insert_many(
            &self,
            entries: Vec<DiagnosisEntry>,
        ) -> Vec<RepositoryResult<DiagnosisEntry>> {
            self.inner.insert_many(entries).await
        }
        async fn update(&self, entry: DiagnosisEntry) -> RepositoryResult<DiagnosisEntry> {
            self.inner.update(entry).await
        }
        async fn delete(&self, id: &EntryId) -> RepositoryResult<bool> {
            self.inner.delete(id).await
        }
        async fn push_note(&self, entry_id: &EntryId, note: DiagnosisNote) -> RepositoryResult<()> {
            self.inner.push_note(entry_id, note).await
        }
        async fn edit_note(
            &self,
            entry_id: &EntryId,
            note_id: &NoteId,
            content: String,
            at: DateTime<Utc>,
        ) -> RepositoryResult<Option<DiagnosisNote>> {
            self.inner.edit_note(entry_id, note_id, content, at).await
        }
        async fn remove_note(&self, entry_id: &EntryId, note_id: &NoteId) -> RepositoryResult<bool> {
            self.inner.remove_note(entry_id, note_id).await
        }
    }

    async fn yielding_fixture() -> Fixture {
        fixture_over(Arc::new(YieldingCatalog {
            inner: InMemoryCatalog::default(),
        }))
        .await
    }

    struct Fixture {
        notes: NoteService,
        entry_id: EntryId,
    }

    fn admin() -> Principal {
        Principal::new("admin-a", Role::CompanyAdmin, Some("org-a"))
    }

    fn clinician() -> Principal {
        Principal::new("psy-a1", Role::Psychologist, Some("org-a"))
    }

    async fn fixture() -> Fixture {
        fixture_over(Arc::new(InMemoryCatalog::default())).await
    }

    async fn fixture_over(catalog: Arc<dyn CatalogRepository>) -> Fixture {
        let mut stores = Stores::in_memory();
        stores.catalog = catalog;
        stores.membership = Arc::new(InMemoryMembership::from_organizations(vec![
            OrganizationMembership {
                organization_id: OrganizationId::new("org-a"),
                admin_id: Some(PrincipalId::new("admin-a")),
                psychologists: vec![MemberRecord {
                    id: PrincipalId::new("psy-a1"),
                    active: true,
                }],
            },
        ]));
        let catalog = CatalogService::new(Arc::new(CoreConfig::default()), &stores);
        let entry = catalog
            .create(
                &admin(),
                NewDiagnosis {
                    name: "Social Anxiety Disorder".into(),
                    dsm5_code: Some("300.23".into()),
                    ..Default::default()
                },
            )
            .await
            .expect("create should succeed");
        Fixture {
            notes: NoteService::new(catalog),
            entry_id: entry.id,
        }
    }

    #[tokio::test]
    async fn test_readers_can_add_and_list_notes() {
        let f = fixture().await;
        let note = f
            .notes
            .add(&clinician(), &f.entry_id, "  Consider performance-only specifier ")
            .await
            .expect("clinician with read access should add a note");
        assert_eq!(note.content, "Consider performance-only specifier");
        assert_eq!(note.author_id, PrincipalId::new("psy-a1"));

        let listed = f
            .notes
            .list(&admin(), &f.entry_id)
            .await
            .expect("list should succeed");
        assert_eq!(listed, vec![note]);
    }

    #[tokio::test]
    async fn test_only_author_edits_or_deletes() {
        let f = fixture().await;
        let note = f
            .notes
            .add(&clinician(), &f.entry_id, "first draft")
            .await
            .expect("add should succeed");

        let err = f
            .notes
            .edit(&admin(), &f.entry_id, &note.id, "rewritten")
            .await
            .expect_err("admin is not the author");
        assert!(matches!(err, CatalogError::Forbidden));
        assert!(matches!(
            f.notes.delete(&admin(), &f.entry_id, &note.id).await,
            Err(CatalogError::Forbidden)
        ));

        let edited = f
            .notes
            .edit(&clinician(), &f.entry_id, &note.id, "second draft")
            .await
            .expect("author should edit");
        assert_eq!(edited.content, "second draft");

        f.notes
            .delete(&clinician(), &f.entry_id, &note.id)
            .await
            .expect("author should delete");
        assert!(f.notes.list(&clinician(), &f.entry_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_keep_every_note() {
        let f = yielding_fixture().await;
        let (clinician_user, admin_user) = (clinician(), admin());
        let (first, second) = tokio::join!(
            f.notes.add(&clinician_user, &f.entry_id, "first"),
            f.notes.add(&admin_user, &f.entry_id, "second"),
        );
        first.expect("first add should succeed");
        second.expect("second add should succeed");

        let listed = f
            .notes
            .list(&admin(), &f.entry_id)
            .await
            .expect("list should succeed");
        let mut contents: Vec<_> = listed.iter().map(|n| n.content.as_str()).collect();
        contents.sort();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_entry_update_keeps_concurrent_note() {
        let f = yielding_fixture().await;
        let patch = DiagnosisPatch {
            details: ClinicalDetails {
                summary: Some("Fear of social scrutiny".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let (admin_user, clinician_user) = (admin(), clinician());
        let (updated, note) = tokio::join!(
            f.notes.catalog.update(&admin_user, &f.entry_id, patch),
            f.notes.add(&clinician_user, &f.entry_id, "ask about onset"),
        );
        updated.expect("update should succeed");
        let note = note.expect("add should succeed");

        let stored = f
            .notes
            .catalog
            .get_one(&admin(), &f.entry_id)
            .await
            .expect("entry should be readable");
        assert_eq!(
            stored.details.summary.as_deref(),
            Some("Fear of social scrutiny")
        );
        assert_eq!(stored.notes, vec![note]);
    }

    #[tokio::test]
    async fn test_notes_hidden_from_other_tenants() {
        let f = fixture().await;
        let outsider = Principal::new("psy-b1", Role::Psychologist, Some("org-b"));
        assert!(matches!(
            f.notes.list(&outsider, &f.entry_id).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            f.notes.add(&outsider, &f.entry_id, "hello").await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_blank_note_rejected() {
        let f = fixture().await;
        assert!(matches!(
            f.notes.add(&clinician(), &f.entry_id, "   ").await,
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            f.notes
                .edit(&clinician(), &f.entry_id, &RecordId::new(), "text")
                .await,
            Err(CatalogError::NotFound)
        ));
    }
}
