//! Catalog entry data model.
//!
//! A [`DiagnosisEntry`] is one diagnosis definition contributed at one of three visibility tiers
//! ([`Scope`]). Field names serialise in camelCase to match the document shape clients already
//! consume.
//!
//! Write-once fields (`name`, `codingSystem`, `code`, `scope`, `ownerId`, `organizationId`) sit
//! directly on the entry; everything an authorised writer may change afterwards lives in
//! [`ClinicalDetails`] or in the dual-coding fields.

use crate::error::UniqueDimension;
use crate::principal::{OrganizationId, PrincipalId};
use chrono::{DateTime, Utc};
use dxcat_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Identifier of a catalog entry.
pub type EntryId = RecordId;

/// Identifier of a note attached to a catalog entry.
pub type NoteId = RecordId;

/// Diagnostic code standard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum CodingSystem {
    #[default]
    #[serde(rename = "DSM-5")]
    Dsm5,
    #[serde(rename = "ICD-10")]
    Icd10,
}

impl CodingSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodingSystem::Dsm5 => "DSM-5",
            CodingSystem::Icd10 => "ICD-10",
        }
    }
}

impl FromStr for CodingSystem {
    type Err = String;

    /// Accepts the canonical labels plus the unpunctuated spellings spreadsheets tend to use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | ' ' | '_'))
            .collect::<String>()
            .to_ascii_uppercase();
        match folded.as_str() {
            "DSM5" => Ok(CodingSystem::Dsm5),
            "ICD10" => Ok(CodingSystem::Icd10),
            _ => Err(format!("unknown coding system: '{}'", s.trim())),
        }
    }
}

impl std::fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility tier of a catalog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Global,
    Organization,
    Personal,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Organization => "organization",
            Scope::Personal => "personal",
        }
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Scope::Global),
            "organization" | "organisation" => Ok(Scope::Organization),
            "personal" => Ok(Scope::Personal),
            other => Err(format!("unknown scope: '{}'", other)),
        }
    }
}

/// Typical course of a disorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Course {
    Continuous,
    Episodic,
    Either,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// Typical duration window, e.g. "at least 2 weeks" is `{min: 2, unit: weeks, max: None}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TypicalDuration {
    #[serde(default)]
    pub min: Option<u32>,
    pub unit: DurationUnit,
    #[serde(default)]
    pub max: Option<u32>,
}

/// A field that clinical sources express either as one value or as a list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn values(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(v) => vec![v.as_str()],
            OneOrMany::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }
}

/// Mutable clinical metadata carried by an entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClinicalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typical_duration: Option<TypicalDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Course>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifiers: Option<OneOrMany>,
    /// Free-text remarks about the diagnosis itself (distinct from the `notes` thread).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria_page: Option<String>,
}

/// A note in an entry's discussion thread. Only its author may change it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisNote {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub id: NoteId,
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub author_id: PrincipalId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One catalog entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisEntry {
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub id: EntryId,
    pub name: String,
    #[serde(default)]
    pub coding_system: CodingSystem,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub dsm5_code: Option<String>,
    #[serde(default)]
    pub icd10_code: Option<String>,
    pub scope: Scope,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub owner_id: PrincipalId,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub organization_id: Option<OrganizationId>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(flatten)]
    pub details: ClinicalDetails,
    #[serde(default)]
    pub notes: Vec<DiagnosisNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields that participate in one uniqueness shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UniquenessKey {
    pub dimension: UniqueDimension,
    pub name: String,
    pub coding_system: Option<CodingSystem>,
    pub code: String,
    pub organization_id: Option<OrganizationId>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DiagnosisEntry {
    /// True when the entry carries a code in `system`, through either the legacy pair or the
    /// dual-coding field.
    pub fn is_coded_in(&self, system: CodingSystem) -> bool {
        let dual = match system {
            CodingSystem::Dsm5 => present(&self.dsm5_code),
            CodingSystem::Icd10 => present(&self.icd10_code),
        };
        self.coding_system == system || dual.is_some()
    }

    /// The uniqueness shapes this entry occupies. Shapes whose code is absent are skipped.
    pub fn uniqueness_keys(&self) -> Vec<UniquenessKey> {
        let mut keys = Vec::with_capacity(3);
        let name = self.name.trim().to_string();

        if let Some(code) = present(&self.dsm5_code) {
            keys.push(UniquenessKey {
                dimension: UniqueDimension::NameDsm5Code,
                name: name.clone(),
                coding_system: None,
                code: code.to_string(),
                organization_id: self.organization_id.clone(),
            });
        }
        if let Some(code) = present(&self.icd10_code) {
            keys.push(UniquenessKey {
                dimension: UniqueDimension::NameIcd10Code,
                name: name.clone(),
                coding_system: None,
                code: code.to_string(),
                organization_id: self.organization_id.clone(),
            });
        }
        if let Some(code) = present(&self.code) {
            keys.push(UniquenessKey {
                dimension: UniqueDimension::NameLegacyCode,
                name,
                coding_system: Some(self.coding_system),
                code: code.to_string(),
                organization_id: self.organization_id.clone(),
            });
        }

        keys
    }

    /// The scope/organization coupling every stored entry must satisfy.
    pub fn scope_is_consistent(&self) -> bool {
        match self.scope {
            Scope::Organization => self.organization_id.is_some(),
            Scope::Global | Scope::Personal => self.organization_id.is_none(),
        }
    }

    pub fn note(&self, note_id: &NoteId) -> Option<&DiagnosisNote> {
        self.notes.iter().find(|n| &n.id == note_id)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::entry;
    use super::*;

    #[test]
    fn test_coding_system_parses_loose_spellings() {
        assert_eq!("dsm5".parse::<CodingSystem>().unwrap(), CodingSystem::Dsm5);
        assert_eq!("ICD-10".parse::<CodingSystem>().unwrap(), CodingSystem::Icd10);
        assert_eq!("icd 10".parse::<CodingSystem>().unwrap(), CodingSystem::Icd10);
        assert!("snomed".parse::<CodingSystem>().is_err());
    }

    #[test]
    fn test_coding_system_serializes_with_hyphen() {
        let json = serde_json::to_string(&CodingSystem::Icd10).expect("should serialize");
        assert_eq!(json, "\"ICD-10\"");
    }

    #[test]
    fn test_is_coded_in_checks_legacy_and_dual_fields() {
        let mut e = entry("Insomnia Disorder", Scope::Global, "admin", None, &[]);
        e.coding_system = CodingSystem::Icd10;
        assert!(e.is_coded_in(CodingSystem::Icd10));
        assert!(!e.is_coded_in(CodingSystem::Dsm5));

        e.dsm5_code = Some("307.42".into());
        assert!(e.is_coded_in(CodingSystem::Dsm5));

        e.dsm5_code = Some("   ".into());
        assert!(!e.is_coded_in(CodingSystem::Dsm5), "blank code should not count");
    }

    #[test]
    fn test_uniqueness_keys_skip_absent_codes() {
        let mut e = entry("Major Depressive Disorder", Scope::Global, "admin", None, &[]);
        assert!(e.uniqueness_keys().is_empty());

        e.dsm5_code = Some("296.23".into());
        e.code = Some("296.23".into());
        let dims: Vec<_> = e.uniqueness_keys().into_iter().map(|k| k.dimension).collect();
        assert_eq!(
            dims,
            vec![UniqueDimension::NameDsm5Code, UniqueDimension::NameLegacyCode]
        );
    }

    #[test]
    fn test_uniqueness_keys_hash_by_shape() {
        let mut e = entry("Major Depressive Disorder", Scope::Global, "admin", None, &[]);
        e.dsm5_code = Some("296.23".into());
        let twin = e.clone();

        let keys: std::collections::HashSet<UniquenessKey> = e
            .uniqueness_keys()
            .into_iter()
            .chain(twin.uniqueness_keys())
            .collect();
        assert_eq!(keys.len(), 1);
        let dims: std::collections::HashSet<UniqueDimension> =
            keys.iter().map(|k| k.dimension).collect();
        assert!(dims.contains(&UniqueDimension::NameDsm5Code));
    }

    #[test]
    fn test_entry_round_trips_camel_case_document() {
        let doc = r#"{
            "id": "550e8400e29b41d4a716446655440000",
            "name": "Generalized Anxiety Disorder",
            "codingSystem": "ICD-10",
            "code": "F41.1",
            "scope": "global",
            "ownerId": "root",
            "symptoms": ["excessive_worry"],
            "severity": ["mild", "moderate"],
            "typicalDuration": {"min": 6, "unit": "months"},
            "course": "Continuous",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let parsed: DiagnosisEntry = serde_json::from_str(doc).expect("document should parse");
        assert_eq!(parsed.coding_system, CodingSystem::Icd10);
        assert_eq!(
            parsed.details.severity,
            Some(OneOrMany::Many(vec!["mild".into(), "moderate".into()]))
        );
        assert_eq!(parsed.details.course, Some(Course::Continuous));
        assert!(parsed.scope_is_consistent());

        let value = serde_json::to_value(&parsed).expect("should serialize");
        assert_eq!(value["codingSystem"], "ICD-10");
        assert_eq!(value["typicalDuration"]["unit"], "months");
        assert!(value.get("section").is_none(), "absent details are omitted");
    }
}
