//! Input validation utilities.
//!
//! These functions check client-supplied catalog fields before they reach a repository. Each one
//! returns the cleaned value so callers store exactly what was validated.

use crate::constants::{MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SYMPTOMS_PER_ENTRY};
use crate::model::{EntryId, TypicalDuration};
use crate::symptoms::normalize_all;
use crate::{CatalogError, CatalogResult};
use dxcat_types::NonEmptyText;

/// Validates a diagnosis display name.
///
/// # Errors
///
/// Returns `CatalogError::Validation` if the trimmed name is empty or longer than
/// [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> CatalogResult<String> {
    NonEmptyText::bounded(name, MAX_NAME_LEN)
        .map(NonEmptyText::into_inner)
        .map_err(|e| CatalogError::Validation(format!("name: {}", e)))
}

/// Requires at least one diagnostic code among the legacy code and the two dual-coding fields.
///
/// Callers pass values that have already been through [`dxcat_types::non_blank`].
///
/// # Errors
///
/// Returns `CatalogError::Validation` if every code is absent.
pub fn validate_codes(
    code: Option<&str>,
    dsm5_code: Option<&str>,
    icd10_code: Option<&str>,
) -> CatalogResult<()> {
    if code.is_none() && dsm5_code.is_none() && icd10_code.is_none() {
        return Err(CatalogError::Validation(
            "at least one of code, dsm5Code or icd10Code is required".into(),
        ));
    }
    Ok(())
}

/// Checks that a typical duration window is not inverted.
///
/// # Errors
///
/// Returns `CatalogError::Validation` if both bounds are set and `min > max`.
pub fn validate_duration(duration: Option<&TypicalDuration>) -> CatalogResult<()> {
    if let Some(TypicalDuration {
        min: Some(min),
        max: Some(max),
        ..
    }) = duration
    {
        if min > max {
            return Err(CatalogError::Validation(format!(
                "typicalDuration.min ({}) exceeds typicalDuration.max ({})",
                min, max
            )));
        }
    }
    Ok(())
}

/// Normalises a symptom list for storage.
///
/// # Errors
///
/// Returns `CatalogError::Validation` if more than [`MAX_SYMPTOMS_PER_ENTRY`] distinct symptoms
/// remain after normalisation.
pub fn validate_symptoms<I, S>(raw: I) -> CatalogResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let symptoms = normalize_all(raw);
    if symptoms.len() > MAX_SYMPTOMS_PER_ENTRY {
        return Err(CatalogError::Validation(format!(
            "an entry may list at most {} symptoms",
            MAX_SYMPTOMS_PER_ENTRY
        )));
    }
    Ok(symptoms)
}

/// Validates a note body.
///
/// # Errors
///
/// Returns `CatalogError::Validation` if the trimmed content is empty or longer than
/// [`MAX_NOTE_LEN`] characters.
pub fn validate_note(content: &str) -> CatalogResult<String> {
    NonEmptyText::bounded(content, MAX_NOTE_LEN)
        .map(NonEmptyText::into_inner)
        .map_err(|e| CatalogError::Validation(format!("content: {}", e)))
}

/// Parses a client-supplied entry or note identifier.
///
/// # Errors
///
/// Returns `CatalogError::Validation` if `raw` is not a canonical 32-character identifier.
pub fn parse_record_id(raw: &str) -> CatalogResult<EntryId> {
    raw.parse::<EntryId>()
        .map_err(|_| CatalogError::Validation(format!("malformed identifier: '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DurationUnit;

    #[test]
    fn test_validate_name_trims_and_bounds() {
        assert_eq!(
            validate_name("  Insomnia Disorder ").expect("name should be valid"),
            "Insomnia Disorder"
        );
        assert!(matches!(
            validate_name("   "),
            Err(CatalogError::Validation(_))
        ));
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_codes_requires_one() {
        assert!(validate_codes(None, None, None).is_err());
        assert!(validate_codes(None, None, Some("F51.01")).is_ok());
        assert!(validate_codes(Some("307.42"), None, None).is_ok());
    }

    #[test]
    fn test_validate_duration_rejects_inverted_window() {
        let inverted = TypicalDuration {
            min: Some(6),
            unit: DurationUnit::Months,
            max: Some(2),
        };
        assert!(validate_duration(Some(&inverted)).is_err());

        let open_ended = TypicalDuration {
            min: Some(2),
            unit: DurationUnit::Weeks,
            max: None,
        };
        assert!(validate_duration(Some(&open_ended)).is_ok());
        assert!(validate_duration(None).is_ok());
    }

    #[test]
    fn test_validate_symptoms_normalises_and_caps() {
        let symptoms =
            validate_symptoms(["#Low Energy", "low-energy", " "]).expect("should be valid");
        assert_eq!(symptoms, vec!["low_energy".to_string()]);

        let too_many: Vec<String> = (0..=MAX_SYMPTOMS_PER_ENTRY)
            .map(|i| format!("symptom {}", i))
            .collect();
        assert!(validate_symptoms(&too_many).is_err());
    }

    #[test]
    fn test_parse_record_id_rejects_hyphenated_form() {
        assert!(parse_record_id("550e8400e29b41d4a716446655440000").is_ok());
        assert!(parse_record_id("550e8400-e29b-41d4-a716-446655440000").is_err());
        assert!(parse_record_id("").is_err());
    }
}
