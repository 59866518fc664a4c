//! The authenticated actor behind a request.
//!
//! Principals are produced by an upstream authentication layer; this crate only consumes them.
//! Identifiers are opaque strings because they originate in the account system, not here.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identifier of an account (clinician, organization admin, or platform admin).
    PrincipalId
);

opaque_id!(
    /// Identifier of a customer organization.
    OrganizationId
);

/// Account role as issued by the authentication layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    CompanyAdmin,
    Psychologist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::CompanyAdmin => "company_admin",
            Role::Psychologist => "psychologist",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "super_admin" => Ok(Role::SuperAdmin),
            "company_admin" => Ok(Role::CompanyAdmin),
            "psychologist" => Ok(Role::Psychologist),
            other => Err(format!("unknown role: '{}'", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated actor making a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role, organization_id: Option<&str>) -> Self {
        Self {
            id: PrincipalId::new(id),
            role,
            organization_id: organization_id.map(OrganizationId::new),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parses_wire_names() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(" company_admin ".parse::<Role>().unwrap(), Role::CompanyAdmin);
        assert_eq!("psychologist".parse::<Role>().unwrap(), Role::Psychologist);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_principal_deserializes_without_organization() {
        let principal: Principal =
            serde_json::from_str(r#"{"id":"u-1","role":"psychologist"}"#).expect("should parse");
        assert_eq!(principal.organization_id, None);
        assert_eq!(principal.role.to_string(), "psychologist");
    }
}
