//! Symptom token normalisation.
//!
//! Symptoms arrive from tag pickers (`#Depressed_Mood`), free typing (`depressed mood`) and
//! spreadsheets (`Depressed-Mood`). All of them are reduced to one stable key before they are
//! stored or compared: lowercase words joined by single underscores.

use crate::constants::SYMPTOM_TAG_MARKER;
use std::collections::HashSet;

/// Canonicalise a raw symptom token.
///
/// Leading tag markers are removed, the remainder is lower-cased, and any run of whitespace,
/// hyphens or underscores becomes a single `_`. Leading and trailing separators are dropped.
///
/// The function is idempotent. An input that is blank or consists only of markers yields the
/// empty string, which callers must discard.
pub fn normalize(raw: &str) -> String {
    let stripped = raw.trim().trim_start_matches(SYMPTOM_TAG_MARKER);
    let lowered = stripped.to_lowercase();

    lowered
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalise a batch of raw tokens, dropping empties and duplicates.
///
/// First-seen order is preserved.
pub fn normalize_all<I, S>(raws: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raws.into_iter()
        .map(|raw| normalize(raw.as_ref()))
        .filter(|key| !key.is_empty())
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Bidirectional substring test between two normalised keys.
///
/// `insomnia` overlaps `chronic_insomnia` in either argument order. Empty keys never overlap.
pub fn overlaps(stored: &str, input: &str) -> bool {
    if stored.is_empty() || input.is_empty() {
        return false;
    }
    stored.contains(input) || input.contains(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_marker_and_joins_words() {
        assert_eq!(normalize("#Depressed_Mood"), "depressed_mood");
        assert_eq!(normalize("  depressed   mood "), "depressed_mood");
        assert_eq!(normalize("Depressed-Mood"), "depressed_mood");
        assert_eq!(normalize("sleep - wake  disturbance"), "sleep_wake_disturbance");
    }

    #[test]
    fn test_normalize_marker_only_is_empty() {
        assert_eq!(normalize("#"), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("# - _"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "#Depressed_Mood",
            "##double marker",
            "  Psycho-motor   Agitation ",
            "_leading_and_trailing_",
            "Übermäßige Sorge",
            "fatigue#late",
            "",
            "#",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "normalize should be idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_normalize_all_drops_empties_and_duplicates() {
        let keys = normalize_all(["#Insomnia", "insomnia", "", "#", "Fatigue", "INSOMNIA "]);
        assert_eq!(keys, vec!["insomnia".to_string(), "fatigue".to_string()]);
    }

    #[test]
    fn test_overlaps_is_bidirectional() {
        assert!(overlaps("insomnia", "chronic_insomnia"));
        assert!(overlaps("chronic_insomnia", "insomnia"));
        assert!(overlaps("fatigue", "fatigue"));
        assert!(!overlaps("fatigue", "insomnia"));
        assert!(!overlaps("", "insomnia"));
        assert!(!overlaps("insomnia", ""));
    }
}
