//! Catalog reads and writes.
//!
//! [`CatalogService`] is the single entry point for listing, fetching, creating, updating,
//! deleting and bulk-importing diagnosis entries. Reads go through the caller's read predicate;
//! writes are decided by [`can_write`] on the stored entry.
//!
//! An entry the caller cannot read is reported as `NotFound`. `Forbidden` is reserved for entries
//! the caller can read but not modify, and renders the same message.

use crate::config::CoreConfig;
use crate::error::{CatalogError, CatalogResult, UniqueDimension};
use crate::model::{
    ClinicalDetails, CodingSystem, DiagnosisEntry, EntryId, Scope, UniquenessKey,
};
use crate::pagination::{PageRequest, Pagination};
use crate::predicate::{Predicate, SortSpec};
use crate::principal::{OrganizationId, Principal, PrincipalId};
use crate::repositories::{CatalogRepository, Stores};
use crate::validation::{validate_codes, validate_duration, validate_name, validate_symptoms};
use crate::visibility::{assign_scope, can_write, VisibilityResolver};
use crate::vocabulary::VocabularyService;
use chrono::{DateTime, Utc};
use dxcat_types::non_blank;
use dxcat_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Create-shaped payload, used by single creates and by bulk import.
///
/// `scope` is only honoured when an organization admin asks for `personal`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct NewDiagnosis {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coding_system: Option<CodingSystem>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub dsm5_code: Option<String>,
    #[serde(default)]
    pub icd10_code: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(flatten)]
    pub details: ClinicalDetails,
}

/// Partial update. Absent fields are left as they are.
///
/// The write-once fields are accepted so that clients may echo a whole document back, but they
/// are discarded before the update is applied.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub coding_system: Option<CodingSystem>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub owner_id: Option<PrincipalId>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub organization_id: Option<OrganizationId>,

    /// An empty string clears the code.
    #[serde(default)]
    pub dsm5_code: Option<String>,
    /// An empty string clears the code.
    #[serde(default)]
    pub icd10_code: Option<String>,
    #[serde(default)]
    pub symptoms: Option<Vec<String>>,
    #[serde(flatten)]
    pub details: ClinicalDetails,
}

impl DiagnosisPatch {
    /// Names of the write-once fields present in this patch.
    pub fn immutable_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("codingSystem", self.coding_system.is_some()),
            ("code", self.code.is_some()),
            ("scope", self.scope.is_some()),
            ("ownerId", self.owner_id.is_some()),
            ("organizationId", self.organization_id.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

/// Filters and ordering for [`CatalogService::list_readable`].
#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub scope: Option<Scope>,
    pub coding_system: Option<CodingSystem>,
    pub sort: SortSpec,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn new(page: PageRequest) -> Self {
        Self {
            search: None,
            scope: None,
            coding_system: None,
            sort: SortSpec::NATURAL,
            page,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisPage {
    pub results: Vec<DiagnosisEntry>,
    pub pagination: Pagination,
}

/// A bulk-import record that was not stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub inserted_count: usize,
    pub entries: Vec<DiagnosisEntry>,
    pub failures: Vec<ImportFailure>,
}

/// Validate a create payload and build the entry to store.
fn build_entry(
    payload: NewDiagnosis,
    owner: &PrincipalId,
    scope: Scope,
    organization_id: Option<OrganizationId>,
    now: DateTime<Utc>,
) -> CatalogResult<DiagnosisEntry> {
    let name = validate_name(&payload.name)?;
    let code = non_blank(payload.code);
    let dsm5_code = non_blank(payload.dsm5_code);
    let icd10_code = non_blank(payload.icd10_code);
    validate_codes(code.as_deref(), dsm5_code.as_deref(), icd10_code.as_deref())?;
    validate_duration(payload.details.typical_duration.as_ref())?;
    let symptoms = validate_symptoms(&payload.symptoms)?;

    Ok(DiagnosisEntry {
        id: RecordId::new(),
        name,
        coding_system: payload.coding_system.unwrap_or_default(),
        code,
        dsm5_code,
        icd10_code,
        scope,
        owner_id: owner.clone(),
        organization_id,
        symptoms,
        details: payload.details,
        notes: vec![],
        created_at: now,
        updated_at: now,
    })
}

/// Overlay every detail the patch carries onto `target`.
fn merge_details(target: &mut ClinicalDetails, patch: ClinicalDetails) {
    macro_rules! overlay {
        ($($field:ident),* $(,)?) => {
            $(if patch.$field.is_some() {
                target.$field = patch.$field;
            })*
        };
    }
    overlay!(
        section,
        chapter,
        summary,
        clinical_summary,
        typical_duration,
        duration_context,
        severity,
        course,
        specifiers,
        general_notes,
        criteria_page,
    );
}

#[derive(Clone)]
pub struct CatalogService {
    config: Arc<CoreConfig>,
    catalog: Arc<dyn CatalogRepository>,
    resolver: VisibilityResolver,
    vocabulary: VocabularyService,
}

impl CatalogService {
    pub fn new(config: Arc<CoreConfig>, stores: &Stores) -> Self {
        Self {
            config,
            catalog: stores.catalog.clone(),
            resolver: VisibilityResolver::new(stores.membership.clone()),
            vocabulary: VocabularyService::new(stores.vocabulary.clone()),
        }
    }

    pub(crate) fn repository(&self) -> &Arc<dyn CatalogRepository> {
        &self.catalog
    }

    /// One page of the entries `principal` may read.
    pub async fn list_readable(
        &self,
        principal: &Principal,
        query: &ListQuery,
    ) -> CatalogResult<DiagnosisPage> {
        let visible = self.resolver.read_predicate(principal).await?;
        let filter = Predicate::and(vec![
            visible,
            query.scope.map_or(Predicate::Always, Predicate::ScopeIs),
            query
                .coding_system
                .map_or(Predicate::Always, Predicate::CodedIn),
            query
                .search
                .as_deref()
                .map_or(Predicate::Always, Predicate::text_search),
        ]);

        let total = self.catalog.count(&filter).await?;
        let results = if total == 0 {
            vec![]
        } else {
            self.catalog
                .find(&filter, &query.sort, Some(query.page.window()))
                .await?
        };

        Ok(DiagnosisPage {
            results,
            pagination: Pagination::new(query.page, total),
        })
    }

    /// Fetch one entry.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` when the entry does not exist or is not readable by
    /// `principal`.
    pub async fn get_one(&self, principal: &Principal, id: &EntryId) -> CatalogResult<DiagnosisEntry> {
        let (visible, stored) = tokio::join!(
            self.resolver.read_predicate(principal),
            self.catalog.get_by_id(id)
        );
        let visible = visible?;
        match stored? {
            Some(entry) if visible.matches(&entry) => Ok(entry),
            _ => Err(CatalogError::NotFound),
        }
    }

    /// Fetch an entry that `principal` may modify.
    ///
    /// Write access is decided on the stored entry, not through the read predicate: a company
    /// admin may write every organization entry of their tenant, including ones a previous
    /// admin created. A refused write is `Forbidden` only when the entry is readable.
    async fn get_writable(&self, principal: &Principal, id: &EntryId) -> CatalogResult<DiagnosisEntry> {
        let (visible, stored) = tokio::join!(
            self.resolver.read_predicate(principal),
            self.catalog.get_by_id(id)
        );
        let visible = visible?;
        let entry = stored?.ok_or(CatalogError::NotFound)?;
        if can_write(principal, &entry) {
            Ok(entry)
        } else if visible.matches(&entry) {
            Err(CatalogError::Forbidden)
        } else {
            Err(CatalogError::NotFound)
        }
    }

    /// Create an entry owned by `principal`, with scope assigned from the principal's role.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an unusable payload and `CatalogError::Conflict`
    /// when the name and one of the codes collide with an existing entry in the same
    /// organization (or among organization-less entries).
    pub async fn create(
        &self,
        principal: &Principal,
        payload: NewDiagnosis,
    ) -> CatalogResult<DiagnosisEntry> {
        let (scope, organization_id) = assign_scope(principal, payload.scope);
        let entry = build_entry(payload, &principal.id, scope, organization_id, Utc::now())?;

        if let Some(dimension) = self.find_collision(&entry.uniqueness_keys()).await? {
            return Err(CatalogError::Conflict { dimension });
        }

        let stored = self.catalog.insert(entry).await?;
        tracing::info!(
            id = %stored.id,
            owner = %stored.owner_id,
            scope = stored.scope.as_str(),
            "diagnosis created"
        );
        self.sync_vocabulary(&stored.symptoms);
        Ok(stored)
    }

    async fn find_collision(
        &self,
        keys: &[UniquenessKey],
    ) -> CatalogResult<Option<UniqueDimension>> {
        if keys.is_empty() {
            return Ok(None);
        }
        let filter = Predicate::or(
            keys.iter()
                .cloned()
                .map(Predicate::SharesUniquenessKey)
                .collect(),
        );
        let existing = self.catalog.find(&filter, &SortSpec::NATURAL, None).await?;
        Ok(existing.iter().find_map(|e| {
            let taken = e.uniqueness_keys();
            keys.iter().find(|k| taken.contains(k)).map(|k| k.dimension)
        }))
    }

    /// Apply `patch` to an entry `principal` may modify.
    ///
    /// Write-once fields in the patch are dropped without error.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &EntryId,
        patch: DiagnosisPatch,
    ) -> CatalogResult<DiagnosisEntry> {
        let mut entry = self.get_writable(principal, id).await?;

        let ignored = patch.immutable_fields();
        if !ignored.is_empty() {
            tracing::debug!(%id, ?ignored, "discarding write-once fields from update");
        }

        if let Some(code) = patch.dsm5_code {
            entry.dsm5_code = non_blank(Some(code));
        }
        if let Some(code) = patch.icd10_code {
            entry.icd10_code = non_blank(Some(code));
        }
        validate_codes(
            entry.code.as_deref(),
            entry.dsm5_code.as_deref(),
            entry.icd10_code.as_deref(),
        )?;

        let symptoms_changed = match patch.symptoms {
            Some(raw) => {
                entry.symptoms = validate_symptoms(&raw)?;
                true
            }
            None => false,
        };

        merge_details(&mut entry.details, patch.details);
        validate_duration(entry.details.typical_duration.as_ref())?;
        entry.updated_at = Utc::now();

        let stored = self.catalog.update(entry).await?;
        tracing::info!(id = %stored.id, by = %principal.id, "diagnosis updated");
        if symptoms_changed {
            self.sync_vocabulary(&stored.symptoms);
        }
        Ok(stored)
    }

    /// Hard-delete an entry and its notes.
    pub async fn delete(&self, principal: &Principal, id: &EntryId) -> CatalogResult<()> {
        self.get_writable(principal, id).await?;
        if !self.catalog.delete(id).await? {
            return Err(CatalogError::NotFound);
        }
        tracing::info!(%id, by = %principal.id, "diagnosis deleted");
        Ok(())
    }

    /// Insert a batch of records into the global catalog on behalf of a platform admin.
    ///
    /// Every record becomes `global`, organization-less and owned by `importer`, whatever it
    /// asked for. Records are validated and inserted independently: one bad record never blocks
    /// the rest, and there is no service-level duplicate check (the repository's unique index
    /// still applies).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Forbidden` unless `importer` is a super admin. Per-record problems
    /// are reported in [`ImportSummary::failures`], not as an error.
    pub async fn bulk_import(
        &self,
        importer: &Principal,
        records: Vec<NewDiagnosis>,
    ) -> CatalogResult<ImportSummary> {
        if !importer.is_super_admin() {
            return Err(CatalogError::Forbidden);
        }

        let now = Utc::now();
        let mut failures = Vec::new();
        let mut positions = Vec::with_capacity(records.len());
        let mut batch = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            match build_entry(record, &importer.id, Scope::Global, None, now) {
                Ok(entry) => {
                    positions.push(index);
                    batch.push(entry);
                }
                Err(e) => failures.push(ImportFailure {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        let mut entries = Vec::with_capacity(batch.len());
        for (index, outcome) in positions.into_iter().zip(self.catalog.insert_many(batch).await) {
            match outcome {
                Ok(entry) => entries.push(entry),
                Err(e) => failures.push(ImportFailure {
                    index,
                    reason: CatalogError::from(e).to_string(),
                }),
            }
        }
        failures.sort_by_key(|f| f.index);

        tracing::info!(
            importer = %importer.id,
            inserted = entries.len(),
            failed = failures.len(),
            "bulk import finished"
        );

        let symptoms: Vec<String> = entries.iter().flat_map(|e| e.symptoms.clone()).collect();
        self.sync_vocabulary(&symptoms);

        Ok(ImportSummary {
            inserted_count: entries.len(),
            entries,
            failures,
        })
    }

    fn sync_vocabulary(&self, symptoms: &[String]) {
        if self.config.vocabulary_sync() && !symptoms.is_empty() {
            self.vocabulary.record_in_background(symptoms.to_vec());
        }
    }
}
