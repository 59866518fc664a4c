//! Symptom matching and ranking.
//!
//! A triage request carries a set of observed symptom tags. The engine normalises them, asks the
//! repository for the entries the principal may read (optionally narrowed to one coding system),
//! scores each candidate by symptom overlap and returns one page of the ranked list.
//!
//! Scoring uses symptom overlap only. The triage context on [`MatchQuery`] (duration, course,
//! severity, preliminary diagnosis, notes) is accepted and logged but does not influence the
//! ranking; an implementation that wants it to must extend [`score`] and the ordering key in
//! [`rank`] together.

use crate::error::CatalogResult;
use crate::model::{CodingSystem, Course, DiagnosisEntry};
use crate::pagination::{paginate, PageRequest, Pagination};
use crate::predicate::{Predicate, SortSpec};
use crate::principal::Principal;
use crate::repositories::CatalogRepository;
use crate::symptoms::{normalize_all, overlaps};
use crate::visibility::VisibilityResolver;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Session context submitted with a triage request. Carried, not scored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TriageContext {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub course: Option<Course>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub preliminary_diagnosis: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TriageContext {
    fn is_empty(&self) -> bool {
        self == &TriageContext::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchQuery {
    pub symptoms: Vec<String>,
    pub coding_system: Option<CodingSystem>,
    pub page: PageRequest,
    pub show_all: bool,
    pub context: TriageContext,
}

/// Overlap score of one candidate against the normalised input.
#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    pub matched_symptoms: Vec<String>,
    pub match_count: usize,
    pub match_percentage: f64,
}

/// A catalog entry with its score attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    #[serde(flatten)]
    pub entry: DiagnosisEntry,
    pub matched_symptoms: Vec<String>,
    pub match_count: usize,
    pub match_percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub results: Vec<RankedEntry>,
    pub pagination: Pagination,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score `entry` against normalised, deduplicated `inputs`.
///
/// An input counts as matched when any of the entry's normalised symptoms is a substring or a
/// superstring of it. The percentage is taken over the entry's own symptom count and rounded to
/// two decimals; an entry without symptoms scores 0.
pub fn score(entry: &DiagnosisEntry, inputs: &[String]) -> Score {
    let stored = normalize_all(&entry.symptoms);
    let matched_symptoms: Vec<String> = inputs
        .iter()
        .filter(|input| stored.iter().any(|s| overlaps(s, input)))
        .cloned()
        .collect();
    let match_count = matched_symptoms.len();
    let match_percentage = if stored.is_empty() {
        0.0
    } else {
        round2(match_count as f64 / stored.len() as f64 * 100.0)
    };

    Score {
        matched_symptoms,
        match_count,
        match_percentage,
    }
}

/// Score, filter and order candidates.
///
/// Candidates without a match are dropped unless `keep_unmatched` is set. The sort is stable on
/// `(match_count desc, match_percentage desc)`, so equal scores keep the candidates' incoming
/// order.
pub fn rank(
    candidates: Vec<DiagnosisEntry>,
    inputs: &[String],
    keep_unmatched: bool,
) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = candidates
        .into_iter()
        .map(|entry| {
            let s = score(&entry, inputs);
            RankedEntry {
                entry,
                matched_symptoms: s.matched_symptoms,
                match_count: s.match_count,
                match_percentage: s.match_percentage,
            }
        })
        .filter(|r| keep_unmatched || r.match_count > 0)
        .collect();

    ranked.sort_by(|a, b| {
        b.match_count.cmp(&a.match_count).then_with(|| {
            b.match_percentage
                .partial_cmp(&a.match_percentage)
                .unwrap_or(Ordering::Equal)
        })
    });
    ranked
}

/// Ranks readable catalog entries against a symptom set.
#[derive(Clone)]
pub struct MatchingEngine {
    resolver: VisibilityResolver,
    catalog: Arc<dyn CatalogRepository>,
}

impl MatchingEngine {
    pub fn new(resolver: VisibilityResolver, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { resolver, catalog }
    }

    /// Run a triage match for `principal`.
    ///
    /// An input that normalises to nothing returns an empty page without touching the repository
    /// unless `show_all` is set, in which case every visible (system-filtered) entry is returned
    /// with its, possibly zero, score.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if membership resolution or the candidate query fails.
    pub async fn match_symptoms(
        &self,
        principal: &Principal,
        query: &MatchQuery,
    ) -> CatalogResult<MatchOutcome> {
        let inputs = normalize_all(&query.symptoms);

        if inputs.is_empty() && !query.show_all {
            tracing::debug!(principal = %principal.id, "no usable symptoms; skipping candidate scan");
            return Ok(MatchOutcome {
                results: vec![],
                pagination: Pagination::empty(query.page),
            });
        }

        if !query.context.is_empty() {
            tracing::debug!(
                principal = %principal.id,
                "triage context supplied; ranking uses symptom overlap only"
            );
        }

        let visible = self.resolver.read_predicate(principal).await?;
        let system = query
            .coding_system
            .map_or(Predicate::Always, Predicate::CodedIn);
        let overlap = if query.show_all {
            Predicate::Always
        } else {
            Predicate::SymptomOverlap(inputs.clone())
        };
        let candidates_filter = Predicate::and(vec![visible, system, overlap]);

        let candidates = self
            .catalog
            .find(&candidates_filter, &SortSpec::NATURAL, None)
            .await?;
        let scanned = candidates.len();

        let ranked = rank(candidates, &inputs, query.show_all);
        let (results, pagination) = paginate(ranked, query.page);

        tracing::info!(
            principal = %principal.id,
            inputs = inputs.len(),
            scanned,
            matched = pagination.total_items,
            "symptom match completed"
        );

        Ok(MatchOutcome {
            results,
            pagination,
        })
    }
}
