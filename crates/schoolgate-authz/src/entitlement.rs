//! Entitlement resolution: a tenant's quotas, active modules and billing
//! standing, merged from subscription, plan and module records.
//!
//! Missing records never fail resolution. They fall back to the
//! conservative defaults in [`EntitlementConfig`].

use std::collections::{BTreeMap, BTreeSet};

use schoolgate_core::capability::CapabilitySet;
use schoolgate_core::error::GateResult;
use schoolgate_core::models::limit::{Limit, ResourceKind};
use schoolgate_core::models::plan::Plan;
use schoolgate_core::models::subscription::{BillingState, Subscription};
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::module::{self, ModuleKey};
use schoolgate_core::repository::EntitlementRepository;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EntitlementConfig;

/// Which layer a resolved limit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaSource {
    Override,
    Plan,
    Default,
}

impl QuotaSource {
    pub fn as_str(self) -> &'static str {
        match self {
            QuotaSource::Override => "override",
            QuotaSource::Plan => "plan",
            QuotaSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedLimit {
    pub limit: Limit,
    pub source: QuotaSource,
}

/// A limit for every resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuotaTable(BTreeMap<ResourceKind, ResolvedLimit>);

impl QuotaTable {
    pub fn get(&self, kind: ResourceKind) -> ResolvedLimit {
        // Every kind is filled in by `resolve`; the fallback only guards
        // hand-built tables.
        self.0.get(&kind).copied().unwrap_or(ResolvedLimit {
            limit: Limit::Finite(0),
            source: QuotaSource::Default,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, ResolvedLimit)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(ResourceKind, ResolvedLimit)> for QuotaTable {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, ResolvedLimit)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything the authorizer needs to know about a tenant's entitlement.
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePolicy {
    pub tenant_id: TenantId,
    pub quotas: QuotaTable,
    pub active_modules: BTreeSet<ModuleKey>,
    pub module_capabilities: CapabilitySet,
    pub billing: BillingState,
}

/// Pick the limit for one resource kind: override, then plan, then the
/// configured default. An explicit `"unlimited"` override wins like any
/// other override.
fn resolve_limit(
    kind: ResourceKind,
    subscription: Option<&Subscription>,
    plan: Option<&Plan>,
    config: &EntitlementConfig,
) -> ResolvedLimit {
    if let Some(limit) = subscription.and_then(|s| s.override_limits.get(&kind)) {
        return ResolvedLimit {
            limit: *limit,
            source: QuotaSource::Override,
        };
    }
    if let Some(limit) = plan.and_then(|p| p.limits.get(&kind)) {
        return ResolvedLimit {
            limit: *limit,
            source: QuotaSource::Plan,
        };
    }
    ResolvedLimit {
        limit: config.default_limit(kind),
        source: QuotaSource::Default,
    }
}

/// Merge the stored records into an [`EffectivePolicy`].
///
/// `active_modules` of `None` means the tenant has no module data. Core is
/// always part of the active set.
pub fn resolve(
    tenant_id: TenantId,
    subscription: Option<&Subscription>,
    plan: Option<&Plan>,
    active_modules: Option<BTreeSet<ModuleKey>>,
    config: &EntitlementConfig,
) -> EffectivePolicy {
    let quotas = ResourceKind::ALL
        .into_iter()
        .map(|kind| (kind, resolve_limit(kind, subscription, plan, config)))
        .collect();

    let mut active_modules = active_modules.unwrap_or_else(|| {
        if config.all_modules_fallback {
            module::all_modules()
        } else {
            module::core_modules()
        }
    });
    active_modules.insert(ModuleKey::Core);

    EffectivePolicy {
        tenant_id,
        quotas,
        module_capabilities: module::capabilities_for(&active_modules),
        active_modules,
        billing: BillingState::of(subscription),
    }
}

/// Loads entitlement records from a repository and resolves them.
pub struct EntitlementResolver<E: EntitlementRepository> {
    repo: E,
    config: EntitlementConfig,
}

impl<E: EntitlementRepository> EntitlementResolver<E> {
    pub fn new(repo: E, config: EntitlementConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &EntitlementConfig {
        &self.config
    }

    pub async fn load(&self, tenant_id: TenantId) -> GateResult<EffectivePolicy> {
        let subscription = self.repo.get_subscription(tenant_id).await?;

        let plan = match subscription.as_ref().and_then(|s| s.plan_id) {
            Some(plan_id) => {
                let plan = self.repo.get_plan(plan_id).await?;
                if plan.is_none() {
                    warn!(tenant_id = %tenant_id, plan_id, "Subscription references unknown plan, using defaults");
                }
                plan
            }
            None => None,
        };

        let modules = self.repo.active_modules(tenant_id).await?;
        if modules.is_none() {
            debug!(
                tenant_id = %tenant_id,
                all_modules_fallback = self.config.all_modules_fallback,
                "No active-module data for tenant"
            );
        }

        Ok(resolve(
            tenant_id,
            subscription.as_ref(),
            plan.as_ref(),
            modules,
            &self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolgate_core::capability::Capability;
    use schoolgate_core::models::limit::LimitMap;
    use schoolgate_core::models::subscription::SubscriptionStatus;

    const T: TenantId = TenantId(1);

    fn plan(limits: LimitMap) -> Plan {
        Plan {
            id: 10,
            name: "Basic".into(),
            limits,
        }
    }

    fn subscription(status: SubscriptionStatus, overrides: LimitMap) -> Subscription {
        Subscription {
            tenant_id: T,
            status,
            trial_expired: false,
            plan_id: Some(10),
            override_limits: overrides,
            provisioned_modules: BTreeSet::new(),
        }
    }

    #[test]
    fn no_records_resolve_to_defaults() {
        let policy = resolve(T, None, None, None, &EntitlementConfig::default());
        let students = policy.quotas.get(ResourceKind::Students);
        assert_eq!(students.limit, Limit::Finite(50));
        assert_eq!(students.source, QuotaSource::Default);
        assert_eq!(policy.billing, BillingState::Unsubscribed);
        assert_eq!(policy.active_modules, module::core_modules());
    }

    #[test]
    fn override_beats_plan_beats_default() {
        let plan = plan(LimitMap::from([
            (ResourceKind::Students, Limit::Finite(200)),
            (ResourceKind::Teachers, Limit::Finite(20)),
        ]));
        let sub = subscription(
            SubscriptionStatus::Active,
            LimitMap::from([(ResourceKind::Students, Limit::Finite(250))]),
        );
        let policy = resolve(T, Some(&sub), Some(&plan), None, &EntitlementConfig::default());

        assert_eq!(
            policy.quotas.get(ResourceKind::Students),
            ResolvedLimit {
                limit: Limit::Finite(250),
                source: QuotaSource::Override
            }
        );
        assert_eq!(
            policy.quotas.get(ResourceKind::Teachers),
            ResolvedLimit {
                limit: Limit::Finite(20),
                source: QuotaSource::Plan
            }
        );
        assert_eq!(
            policy.quotas.get(ResourceKind::Buses),
            ResolvedLimit {
                limit: Limit::Finite(2),
                source: QuotaSource::Default
            }
        );
    }

    #[test]
    fn unlimited_override_wins_over_finite_plan() {
        let plan = plan(LimitMap::from([(ResourceKind::Students, Limit::Finite(50))]));
        let sub = subscription(
            SubscriptionStatus::Active,
            LimitMap::from([(ResourceKind::Students, Limit::Unlimited)]),
        );
        let policy = resolve(T, Some(&sub), Some(&plan), None, &EntitlementConfig::default());
        let students = policy.quotas.get(ResourceKind::Students);
        assert_eq!(students.limit, Limit::Unlimited);
        assert_eq!(students.source, QuotaSource::Override);
    }

    #[test]
    fn missing_module_data_honors_fallback_switch() {
        let strict = resolve(T, None, None, None, &EntitlementConfig::default());
        assert!(!strict.module_capabilities.contains(Capability::ManageFinance));

        let lenient = resolve(
            T,
            None,
            None,
            None,
            &EntitlementConfig {
                all_modules_fallback: true,
                ..Default::default()
            },
        );
        assert_eq!(lenient.active_modules, module::all_modules());
        assert!(lenient.module_capabilities.contains(Capability::ManageFinance));
    }

    #[test]
    fn core_is_always_active() {
        let policy = resolve(
            T,
            None,
            None,
            Some(BTreeSet::from([ModuleKey::Finance])),
            &EntitlementConfig::default(),
        );
        assert!(policy.active_modules.contains(&ModuleKey::Core));
        assert!(policy.module_capabilities.contains(Capability::ManageStudents));
        assert!(policy.module_capabilities.contains(Capability::ManageFinance));
        assert!(!policy.module_capabilities.contains(Capability::ManageLibrary));
    }

    #[test]
    fn billing_state_follows_subscription() {
        let canceled = subscription(SubscriptionStatus::Canceled, LimitMap::new());
        let policy = resolve(T, Some(&canceled), None, None, &EntitlementConfig::default());
        assert!(policy.billing.is_lapsed());

        let past_due = subscription(SubscriptionStatus::PastDue, LimitMap::new());
        let policy = resolve(T, Some(&past_due), None, None, &EntitlementConfig::default());
        assert_eq!(policy.billing, BillingState::Grace);
    }

    #[test]
    fn quota_table_serializes_with_sources() {
        let policy = resolve(T, None, None, None, &EntitlementConfig::default());
        let json = serde_json::to_value(&policy.quotas).unwrap();
        assert_eq!(json["students"]["limit"], 50);
        assert_eq!(json["students"]["source"], "default");
    }
}
