use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical identifier for a stored record (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to render in canonical form, so equality on
/// the string form and equality on the value always agree.
///
/// # Construction
/// - [`RecordId::new`] generates a new random (v4) identifier.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String))]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// This does **not** normalise hyphenated or uppercase input.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "identifier must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is exactly 32 characters of `0-9a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let id = RecordId::parse(canonical).expect("canonical id should parse");
        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_id() {
        let err = RecordId::parse("550e8400-e29b-41d4-a716-446655440000")
            .expect_err("hyphenated id should be rejected");
        match err {
            UuidError::InvalidInput(msg) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
        }
    }

    #[test]
    fn test_parse_rejects_uppercase_and_non_hex() {
        assert!(RecordId::parse("550E8400E29B41D4A716446655440000").is_err());
        assert!(RecordId::parse("550e8400e29b41d4a71644665544000g").is_err());
        assert!(RecordId::parse("550e8400").is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").expect("should parse");
        let json = serde_json::to_string(&id).expect("should serialize");
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: RecordId = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, id);

        let bad = serde_json::from_str::<RecordId>("\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(bad.is_err(), "hyphenated ids should not deserialize");
    }
}
