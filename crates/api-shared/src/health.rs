use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Simple health service shared by every API surface.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "dxcat is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_serializes_flat() {
        let json = serde_json::to_value(HealthService::check_health()).expect("should serialize");
        assert_eq!(json["ok"], true);
        assert_eq!(json["message"], "dxcat is alive");
    }
}
