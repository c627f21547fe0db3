//! Repository trait definitions for data access abstraction.
//!
//! The engine never talks to storage directly. All operations are async;
//! tenant-scoped reads take a `tenant_id` to enforce isolation.

use std::collections::BTreeSet;

use crate::error::GateResult;
use crate::models::{
    limit::ResourceKind,
    plan::Plan,
    principal::{CreatePrincipal, Principal, PrincipalId, UpdateRole},
    subscription::Subscription,
    tenant::{CreateTenant, Tenant, TenantId},
};
use crate::module::ModuleKey;

// ---------------------------------------------------------------------------
// Global scope
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = GateResult<Tenant>> + Send;
    fn get_by_id(&self, id: TenantId) -> impl Future<Output = GateResult<Tenant>> + Send;
}

/// Principal storage.
///
/// `get_by_id` backs credential validation and must be a strongly
/// consistent read: a stale token version would let a revoked credential
/// through.
pub trait PrincipalRepository: Send + Sync {
    fn create(&self, input: CreatePrincipal)
    -> impl Future<Output = GateResult<Principal>> + Send;
    fn get_by_id(&self, id: PrincipalId) -> impl Future<Output = GateResult<Principal>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = GateResult<Principal>> + Send;
    /// Increment the token version, returning the new value.
    fn bump_token_version(&self, id: PrincipalId) -> impl Future<Output = GateResult<u64>> + Send;
    /// Reassign role fields. Implementations must bump the token version
    /// in the same write.
    fn update_role(
        &self,
        id: PrincipalId,
        input: UpdateRole,
    ) -> impl Future<Output = GateResult<Principal>> + Send;
    /// `secret` of `Some(None)` clears the stored secret.
    fn set_mfa(
        &self,
        id: PrincipalId,
        enabled: bool,
        secret: Option<Option<String>>,
    ) -> impl Future<Output = GateResult<Principal>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped entitlement data
// ---------------------------------------------------------------------------

/// Read side of subscriptions, plans and module activation. Missing
/// records are `Ok(None)`, never errors.
pub trait EntitlementRepository: Send + Sync {
    fn get_subscription(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = GateResult<Option<Subscription>>> + Send;
    fn get_plan(&self, plan_id: i64) -> impl Future<Output = GateResult<Option<Plan>>> + Send;
    fn active_modules(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = GateResult<Option<BTreeSet<ModuleKey>>>> + Send;
}

/// Live resource counts for quota checks.
pub trait ResourceCounter: Send + Sync {
    fn count(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
    ) -> impl Future<Output = GateResult<u64>> + Send;
}
