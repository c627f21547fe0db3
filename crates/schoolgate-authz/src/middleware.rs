//! Request authorization.
//!
//! [`Authorizer::authorize`] runs the checks in a fixed order and stops at
//! the first failure:
//!
//! 1. credential validation (401)
//! 2. tenant scope: path tenant vs credential tenant, tenant existence and
//!    status (403)
//! 3. billing hold (402)
//! 4. required capability (403)
//! 5. quota on creation routes (403 `LIMIT_EXCEEDED`)
//!
//! Platform operators skip the tenant match, the inactive-tenant check and
//! the billing hold. They do not skip capability or quota checks.

use std::sync::Arc;

use schoolgate_auth::{AuthenticatedPrincipal, SessionManager};
use schoolgate_core::capability::{Capability, CapabilitySet};
use schoolgate_core::error::GateError;
use schoolgate_core::models::limit::ResourceKind;
use schoolgate_core::models::tenant::{Tenant, TenantId};
use schoolgate_core::repository::{
    EntitlementRepository, PrincipalRepository, ResourceCounter, TenantRepository,
};
use tracing::{debug, info};

use crate::entitlement::{EffectivePolicy, EntitlementResolver};
use crate::error::AuthzError;
use crate::permission::{effective_capabilities, granted_capabilities};
use crate::quota::{self, QuotaDecision};

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    /// Tenant named in the request path, if any.
    pub tenant: Option<TenantId>,
    pub capability: Option<Capability>,
    /// Set on routes that create a quota-bounded resource.
    pub creates: Option<ResourceKind>,
}

impl RouteRequirement {
    /// A route outside any tenant path.
    pub fn platform() -> Self {
        Self::default()
    }

    pub fn tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant: Some(tenant_id),
            ..Self::default()
        }
    }

    pub fn require(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn creating(mut self, kind: ResourceKind) -> Self {
        self.creates = Some(kind);
        self
    }
}

/// A request that passed every check.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub principal: AuthenticatedPrincipal,
    /// The tenant the request acts in: the path tenant, or the
    /// credential's own tenant on routes without one.
    pub tenant: Option<Tenant>,
    /// Effective capabilities within that tenant.
    pub capabilities: CapabilitySet,
    pub policy: Option<EffectivePolicy>,
    /// Present on creation routes.
    pub quota: Option<QuotaDecision>,
}

/// Extract the credential from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Request authorizer.
///
/// Generic over every repository it reads so that it has no dependency on
/// a storage crate.
pub struct Authorizer<P, T, E, R>
where
    P: PrincipalRepository,
    T: TenantRepository,
    E: EntitlementRepository,
    R: ResourceCounter,
{
    sessions: Arc<SessionManager<P>>,
    tenants: T,
    entitlements: EntitlementResolver<E>,
    counter: R,
}

impl<P, T, E, R> Authorizer<P, T, E, R>
where
    P: PrincipalRepository,
    T: TenantRepository,
    E: EntitlementRepository,
    R: ResourceCounter,
{
    pub fn new(
        sessions: Arc<SessionManager<P>>,
        tenants: T,
        entitlements: EntitlementResolver<E>,
        counter: R,
    ) -> Self {
        Self {
            sessions,
            tenants,
            entitlements,
            counter,
        }
    }

    pub fn sessions(&self) -> &SessionManager<P> {
        &self.sessions
    }

    pub fn entitlements(&self) -> &EntitlementResolver<E> {
        &self.entitlements
    }

    /// Authorize one request. `bearer` is the raw credential, `None` when
    /// the request carried none.
    pub async fn authorize(
        &self,
        bearer: Option<&str>,
        req: &RouteRequirement,
    ) -> Result<AccessGrant, AuthzError> {
        let result = self.decide(bearer, req).await;
        match &result {
            Ok(grant) => debug!(
                principal_id = %grant.principal.principal_id,
                tenant_id = ?grant.tenant.as_ref().map(|t| t.id),
                capability = ?req.capability,
                "Request authorized"
            ),
            Err(err) => info!(
                code = err.code(),
                reason = %err,
                route_tenant = ?req.tenant,
                capability = ?req.capability,
                "Request denied"
            ),
        }
        result
    }

    async fn decide(
        &self,
        bearer: Option<&str>,
        req: &RouteRequirement,
    ) -> Result<AccessGrant, AuthzError> {
        // 1. Credential.
        let token =
            bearer.ok_or_else(|| AuthzError::Unauthenticated("missing bearer credential".into()))?;
        let principal = self.sessions.validate_access(token).await?;
        let is_platform = principal.role.kind.is_platform_admin();

        // 2. Tenant scope.
        if let Some(route_tenant) = req.tenant {
            if principal.tenant_id != Some(route_tenant) && !is_platform {
                return Err(AuthzError::forbidden(format!(
                    "tenant {route_tenant} is outside the credential's tenant"
                )));
            }
        }

        let Some(tenant_id) = req.tenant.or(principal.tenant_id) else {
            return self.platform_scope(principal, req);
        };

        let tenant = match self.tenants.get_by_id(tenant_id).await {
            Ok(tenant) => tenant,
            Err(GateError::NotFound { .. }) => {
                return Err(AuthzError::forbidden(format!("tenant {tenant_id} does not exist")));
            }
            Err(e) => return Err(e.into()),
        };
        if !tenant.is_active() && !is_platform {
            return Err(AuthzError::forbidden(format!("tenant {tenant_id} is inactive")));
        }

        // 3. Billing hold.
        let policy = self.entitlements.load(tenant_id).await?;
        if policy.billing.is_lapsed() && !is_platform {
            return Err(AuthzError::SubscriptionLapsed);
        }

        // 4. Capability.
        let capabilities =
            effective_capabilities(principal.role, &principal.grant, &policy.module_capabilities);
        if let Some(capability) = req.capability {
            if !capabilities.contains(capability) {
                return Err(AuthzError::missing_capability(capability));
            }
        }

        // 5. Quota, against a fresh count.
        let quota = match req.creates {
            Some(kind) => {
                let decision = quota::check_with(kind, tenant_id, &policy.quotas, || {
                    self.counter.count(tenant_id, kind)
                })
                .await?;
                if !decision.allowed {
                    return Err(AuthzError::LimitExceeded(decision));
                }
                Some(decision)
            }
            None => None,
        };

        Ok(AccessGrant {
            principal,
            tenant: Some(tenant),
            capabilities,
            policy: Some(policy),
            quota,
        })
    }

    /// Routes with no tenant in the path, for principals with no tenant
    /// of their own. No module ceiling applies.
    fn platform_scope(
        &self,
        principal: AuthenticatedPrincipal,
        req: &RouteRequirement,
    ) -> Result<AccessGrant, AuthzError> {
        if principal.role.kind.requires_tenant() {
            return Err(AuthzError::forbidden("principal is not bound to a tenant"));
        }
        let capabilities = granted_capabilities(principal.role, &principal.grant);
        if let Some(capability) = req.capability {
            if !capabilities.contains(capability) {
                return Err(AuthzError::missing_capability(capability));
            }
        }
        if req.creates.is_some() {
            return Err(AuthzError::forbidden("resource creation requires a tenant"));
        }

        Ok(AccessGrant {
            principal,
            tenant: None,
            capabilities,
            policy: None,
            quota: None,
        })
    }
}
