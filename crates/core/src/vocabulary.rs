//! Symptom vocabulary used for autocomplete.
//!
//! Every symptom that reaches the catalog is recorded here once. The list is read-only for UIs
//! and plays no part in matching.

use crate::error::CatalogResult;
use crate::repositories::VocabularyRepository;
use crate::symptoms::{normalize, normalize_all};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct VocabularyService {
    repo: Arc<dyn VocabularyRepository>,
}

impl VocabularyService {
    pub fn new(repo: Arc<dyn VocabularyRepository>) -> Self {
        Self { repo }
    }

    /// Record symptom names, normalising them first. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on the first failed upsert.
    pub async fn record<I, S>(&self, names: I) -> CatalogResult<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for name in normalize_all(names) {
            if self.repo.upsert(&name).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Record names on a background task. Failures are logged and otherwise ignored.
    pub fn record_in_background(&self, names: Vec<String>) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            match service.record(&names).await {
                Ok(0) => {}
                Ok(added) => tracing::debug!(added, "symptom vocabulary extended"),
                Err(e) => tracing::warn!("symptom vocabulary update failed: {}", e),
            }
        })
    }

    /// Every recorded name in alphabetical order.
    pub async fn list(&self) -> CatalogResult<Vec<String>> {
        Ok(self.repo.list_all().await?)
    }

    /// Names starting with the normalised `prefix`, alphabetical, at most `limit`.
    ///
    /// A prefix that normalises to nothing returns the head of the full list.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> CatalogResult<Vec<String>> {
        let prefix = normalize(prefix);
        Ok(self
            .repo
            .list_all()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .take(limit)
            .collect())
    }
}
