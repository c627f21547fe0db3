//! Quota guard.
//!
//! A pure decision over a live count and the tenant's quota table. It does
//! not lock anything: a decision is only as fresh as the count it was
//! given, so creation paths must pair it with an atomic count-and-insert
//! in storage.

use std::future::Future;

use schoolgate_core::error::GateResult;
use schoolgate_core::models::limit::{Limit, ResourceKind};
use schoolgate_core::models::tenant::TenantId;
use serde::Serialize;
use tracing::debug;

use crate::entitlement::{QuotaSource, QuotaTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    pub resource: ResourceKind,
    pub current: u64,
    pub max: Limit,
    pub source: QuotaSource,
}

/// Decide whether the tenant may create one more `resource` given
/// `current` existing ones. Denies iff `current >= max` for a finite max.
pub fn check(
    resource: ResourceKind,
    tenant_id: TenantId,
    current: u64,
    quotas: &QuotaTable,
) -> QuotaDecision {
    let resolved = quotas.get(resource);
    let decision = QuotaDecision {
        allowed: resolved.limit.admits(current),
        resource,
        current,
        max: resolved.limit,
        source: resolved.source,
    };
    debug!(
        tenant_id = %tenant_id,
        resource = %resource,
        current,
        max = %resolved.limit,
        source = resolved.source.as_str(),
        allowed = decision.allowed,
        "Quota checked"
    );
    decision
}

/// [`check`] with the count fetched from `count` first.
pub async fn check_with<F, Fut>(
    resource: ResourceKind,
    tenant_id: TenantId,
    quotas: &QuotaTable,
    count: F,
) -> GateResult<QuotaDecision>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = GateResult<u64>>,
{
    let current = count().await?;
    Ok(check(resource, tenant_id, current, quotas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::ResolvedLimit;

    fn table(limit: Limit, source: QuotaSource) -> QuotaTable {
        [(ResourceKind::Students, ResolvedLimit { limit, source })]
            .into_iter()
            .collect()
    }

    #[test]
    fn allows_below_max() {
        let d = check(
            ResourceKind::Students,
            TenantId(1),
            49,
            &table(Limit::Finite(50), QuotaSource::Plan),
        );
        assert!(d.allowed);
        assert_eq!(d.current, 49);
        assert_eq!(d.max, Limit::Finite(50));
        assert_eq!(d.source, QuotaSource::Plan);
    }

    #[test]
    fn denies_at_and_above_max() {
        let quotas = table(Limit::Finite(50), QuotaSource::Plan);
        assert!(!check(ResourceKind::Students, TenantId(1), 50, &quotas).allowed);
        assert!(!check(ResourceKind::Students, TenantId(1), 75, &quotas).allowed);
    }

    #[test]
    fn unlimited_always_allows() {
        let quotas = table(Limit::Unlimited, QuotaSource::Override);
        for current in [0, 50, 1_000_000] {
            assert!(check(ResourceKind::Students, TenantId(1), current, &quotas).allowed);
        }
    }

    #[test]
    fn zero_limit_denies_first_creation() {
        let quotas = table(Limit::Finite(0), QuotaSource::Override);
        assert!(!check(ResourceKind::Students, TenantId(1), 0, &quotas).allowed);
    }

    #[test]
    fn decision_serializes_for_response_bodies() {
        let d = check(
            ResourceKind::Students,
            TenantId(1),
            50,
            &table(Limit::Finite(50), QuotaSource::Plan),
        );
        let json = serde_json::to_value(d).unwrap();
        assert_eq!(json["resource"], "students");
        assert_eq!(json["max"], 50);
        assert_eq!(json["source"], "plan");
    }

    #[tokio::test]
    async fn check_with_uses_supplied_count() {
        let quotas = table(Limit::Finite(3), QuotaSource::Default);
        let d = check_with(ResourceKind::Students, TenantId(1), &quotas, || async { Ok(3) })
            .await
            .unwrap();
        assert!(!d.allowed);
        assert_eq!(d.current, 3);
    }
}
