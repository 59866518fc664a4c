//! Declarative filters over catalog entries.
//!
//! A [`Predicate`] is a small expression tree that a repository can either evaluate in memory
//! ([`Predicate::matches`]) or translate into its own query language. The visibility resolver
//! builds them; the matching engine and catalog service compose them with their own filters.

use crate::model::{CodingSystem, DiagnosisEntry, Scope, UniquenessKey};
use crate::principal::PrincipalId;
use crate::symptoms::{normalize, overlaps};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Matches every entry.
    Always,
    /// Matches no entry.
    Never,
    ScopeIs(Scope),
    OwnerIs(PrincipalId),
    OwnerIn(BTreeSet<PrincipalId>),
    /// Entry carries a code in the system (legacy pair or dual-coding field).
    CodedIn(CodingSystem),
    /// At least one stored symptom overlaps one of these normalised keys.
    SymptomOverlap(Vec<String>),
    /// Case-insensitive substring over name, codes, section and chapter. Lower-cased on build.
    TextSearch(String),
    /// Entry occupies this uniqueness shape.
    SharesUniquenessKey(UniquenessKey),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction with the trivial cases folded away.
    pub fn and(parts: Vec<Predicate>) -> Predicate {
        let mut kept = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Always => {}
                Predicate::Never => return Predicate::Never,
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Predicate::Always,
            1 => kept.remove(0),
            _ => Predicate::And(kept),
        }
    }

    /// Disjunction with the trivial cases folded away.
    pub fn or(parts: Vec<Predicate>) -> Predicate {
        let mut kept = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Predicate::Never => {}
                Predicate::Always => return Predicate::Always,
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Predicate::Never,
            1 => kept.remove(0),
            _ => Predicate::Or(kept),
        }
    }

    pub fn text_search(term: &str) -> Predicate {
        let term = term.trim();
        if term.is_empty() {
            Predicate::Always
        } else {
            Predicate::TextSearch(term.to_lowercase())
        }
    }

    /// Evaluate against one entry.
    pub fn matches(&self, entry: &DiagnosisEntry) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Never => false,
            Predicate::ScopeIs(scope) => entry.scope == *scope,
            Predicate::OwnerIs(owner) => entry.owner_id == *owner,
            Predicate::OwnerIn(owners) => owners.contains(&entry.owner_id),
            Predicate::CodedIn(system) => entry.is_coded_in(*system),
            Predicate::SymptomOverlap(keys) => entry.symptoms.iter().any(|stored| {
                let stored = normalize(stored);
                keys.iter().any(|key| overlaps(&stored, key))
            }),
            Predicate::TextSearch(term) => text_fields(entry)
                .into_iter()
                .any(|field| field.to_lowercase().contains(term.as_str())),
            Predicate::SharesUniquenessKey(key) => entry.uniqueness_keys().contains(key),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(entry)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(entry)),
        }
    }
}

fn text_fields(entry: &DiagnosisEntry) -> Vec<&str> {
    [
        Some(entry.name.as_str()),
        entry.code.as_deref(),
        entry.dsm5_code.as_deref(),
        entry.icd10_code.as_deref(),
        entry.details.section.as_deref(),
        entry.details.chapter.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Repository insertion order.
    #[default]
    Natural,
    Name,
    Code,
    CodingSystem,
    Scope,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "natural" => Ok(SortKey::Natural),
            "name" => Ok(SortKey::Name),
            "code" => Ok(SortKey::Code),
            "codingSystem" => Ok(SortKey::CodingSystem),
            "scope" => Ok(SortKey::Scope),
            "createdAt" => Ok(SortKey::CreatedAt),
            "updatedAt" => Ok(SortKey::UpdatedAt),
            other => Err(format!("unsupported sort field: '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "asc" | "ascending" | "1" => Ok(SortOrder::Asc),
            "desc" | "descending" | "-1" => Ok(SortOrder::Desc),
            other => Err(format!("unsupported sort order: '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortSpec {
    pub const NATURAL: SortSpec = SortSpec {
        key: SortKey::Natural,
        order: SortOrder::Asc,
    };

    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }

    /// Ordering between two entries. `Natural` reports every pair as equal so that a stable sort
    /// keeps the repository's order.
    pub fn compare(&self, a: &DiagnosisEntry, b: &DiagnosisEntry) -> Ordering {
        let ordering = match self.key {
            SortKey::Natural => Ordering::Equal,
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Code => primary_code(a).cmp(&primary_code(b)),
            SortKey::CodingSystem => a.coding_system.as_str().cmp(b.coding_system.as_str()),
            SortKey::Scope => a.scope.as_str().cmp(b.scope.as_str()),
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        match self.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

fn primary_code(entry: &DiagnosisEntry) -> &str {
    entry
        .code
        .as_deref()
        .or(entry.dsm5_code.as_deref())
        .or(entry.icd10_code.as_deref())
        .unwrap_or("")
}

/// Slice of a result set: skip `skip` rows, return at most `take`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: usize,
    pub take: usize,
}
