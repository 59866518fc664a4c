//! Visibility resolution: which catalog entries a principal may read and write.
//!
//! Read access is expressed as a [`Predicate`] so the repository can apply it while querying.
//! The principal is classified into exactly one [`Branch`] (in precedence order: platform
//! admin, organization admin, organization clinician, individual account) and each branch owns
//! a pure builder of type [`ReadBuilder`].
//!
//! Organization-scoped entries are owned by the organization's admin rather than tagged with a
//! redundant "visible to" field, so clinicians need a per-request lookup of their organization's
//! current admin. Lookups are never cached across requests: a membership change is visible on
//! the next call.

use crate::error::CatalogResult;
use crate::model::{DiagnosisEntry, Scope};
use crate::predicate::Predicate;
use crate::principal::{OrganizationId, Principal, PrincipalId, Role};
use crate::repositories::MembershipDirectory;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Membership facts resolved for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrgContext {
    pub admin_id: Option<PrincipalId>,
    pub psychologist_ids: BTreeSet<PrincipalId>,
}

/// Pure predicate builder for one branch.
pub type ReadBuilder = fn(&Principal, &OrgContext) -> Predicate;

/// Visibility branch a principal falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    Unrestricted,
    OrganizationAdmin,
    OrganizationClinician,
    Individual,
}

/// Which membership lookups a branch needs before its builder can run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lookups {
    pub admin: bool,
    pub psychologists: bool,
}

impl Branch {
    pub fn of(principal: &Principal) -> Branch {
        match (principal.role, principal.organization_id.is_some()) {
            (Role::SuperAdmin, _) => Branch::Unrestricted,
            (Role::CompanyAdmin, true) => Branch::OrganizationAdmin,
            (Role::Psychologist, true) => Branch::OrganizationClinician,
            (_, false) => Branch::Individual,
        }
    }

    pub fn builder(self) -> ReadBuilder {
        match self {
            Branch::Unrestricted => unrestricted,
            Branch::OrganizationAdmin => organization_admin,
            Branch::OrganizationClinician => organization_clinician,
            Branch::Individual => individual,
        }
    }

    pub fn lookups(self) -> Lookups {
        match self {
            Branch::OrganizationAdmin => Lookups {
                admin: false,
                psychologists: true,
            },
            Branch::OrganizationClinician => Lookups {
                admin: true,
                psychologists: false,
            },
            Branch::Unrestricted | Branch::Individual => Lookups::default(),
        }
    }
}

fn unrestricted(_: &Principal, _: &OrgContext) -> Predicate {
    Predicate::Always
}

fn own_personal(principal: &Principal) -> Predicate {
    Predicate::and(vec![
        Predicate::ScopeIs(Scope::Personal),
        Predicate::OwnerIs(principal.id.clone()),
    ])
}

fn organization_admin(principal: &Principal, ctx: &OrgContext) -> Predicate {
    let clinicians_personal = if ctx.psychologist_ids.is_empty() {
        Predicate::Never
    } else {
        Predicate::and(vec![
            Predicate::ScopeIs(Scope::Personal),
            Predicate::OwnerIn(ctx.psychologist_ids.clone()),
        ])
    };

    Predicate::or(vec![
        Predicate::ScopeIs(Scope::Global),
        Predicate::and(vec![
            Predicate::ScopeIs(Scope::Organization),
            Predicate::OwnerIs(principal.id.clone()),
        ]),
        clinicians_personal,
        own_personal(principal),
    ])
}

fn organization_clinician(principal: &Principal, ctx: &OrgContext) -> Predicate {
    let organization_catalog = match &ctx.admin_id {
        Some(admin) => Predicate::and(vec![
            Predicate::ScopeIs(Scope::Organization),
            Predicate::OwnerIs(admin.clone()),
        ]),
        None => Predicate::Never,
    };

    Predicate::or(vec![
        Predicate::ScopeIs(Scope::Global),
        organization_catalog,
        own_personal(principal),
    ])
}

fn individual(principal: &Principal, _: &OrgContext) -> Predicate {
    Predicate::or(vec![
        Predicate::ScopeIs(Scope::Global),
        own_personal(principal),
    ])
}

/// Build the read predicate from already-resolved membership facts.
pub fn build_read_predicate(principal: &Principal, ctx: &OrgContext) -> Predicate {
    Branch::of(principal).builder()(principal, ctx)
}

/// Whether `principal` may modify or delete `entry`.
pub fn can_write(principal: &Principal, entry: &DiagnosisEntry) -> bool {
    if principal.is_super_admin() || entry.owner_id == principal.id {
        return true;
    }
    principal.role == Role::CompanyAdmin
        && entry.scope == Scope::Organization
        && entry.organization_id.is_some()
        && entry.organization_id == principal.organization_id
}

/// Scope, organization and owner a newly created entry receives.
///
/// Only an organization admin's request is consulted, and only to opt into `personal`; every
/// other principal gets a fixed scope regardless of what the client sent.
pub fn assign_scope(
    principal: &Principal,
    requested: Option<Scope>,
) -> (Scope, Option<OrganizationId>) {
    match (principal.role, &principal.organization_id) {
        (Role::SuperAdmin, _) => (Scope::Global, None),
        (Role::CompanyAdmin, Some(org)) => match requested {
            Some(Scope::Personal) => (Scope::Personal, None),
            _ => (Scope::Organization, Some(org.clone())),
        },
        _ => (Scope::Personal, None),
    }
}

/// Resolves read predicates against live membership data.
#[derive(Clone)]
pub struct VisibilityResolver {
    membership: Arc<dyn MembershipDirectory>,
}

impl VisibilityResolver {
    pub fn new(membership: Arc<dyn MembershipDirectory>) -> Self {
        Self { membership }
    }

    /// Predicate describing every entry `principal` may read.
    ///
    /// Membership lookups needed by the principal's branch are issued concurrently and joined
    /// before the predicate is built.
    ///
    /// # Errors
    ///
    /// Propagates a membership lookup failure as `CatalogError::Repository`.
    pub async fn read_predicate(&self, principal: &Principal) -> CatalogResult<Predicate> {
        let branch = Branch::of(principal);
        let ctx = self.org_context(principal, branch.lookups()).await?;
        tracing::debug!(principal = %principal.id, ?branch, "resolved visibility branch");
        Ok(branch.builder()(principal, &ctx))
    }

    async fn org_context(&self, principal: &Principal, needs: Lookups) -> CatalogResult<OrgContext> {
        let Some(org) = principal.organization_id.as_ref() else {
            return Ok(OrgContext::default());
        };

        let admin = async {
            if needs.admin {
                self.membership.current_admin(org).await
            } else {
                Ok(None)
            }
        };
        let psychologists = async {
            if needs.psychologists {
                self.membership.active_psychologists(org).await
            } else {
                Ok(BTreeSet::new())
            }
        };

        let (admin_id, psychologist_ids) = tokio::join!(admin, psychologists);
        Ok(OrgContext {
            admin_id: admin_id?,
            psychologist_ids: psychologist_ids?,
        })
    }
}
