//! Entitlement resolver configuration.

use schoolgate_core::models::limit::{Limit, LimitMap, ResourceKind};

/// Built-in limit for a resource kind when neither the tenant override nor
/// the plan names one.
pub fn conservative_default(kind: ResourceKind) -> Limit {
    let max = match kind {
        ResourceKind::Students => 50,
        ResourceKind::Teachers => 10,
        ResourceKind::Staff => 5,
        ResourceKind::Parents => 100,
        ResourceKind::Classes => 10,
        ResourceKind::Buses => 2,
    };
    Limit::Finite(max)
}

#[derive(Debug, Clone)]
pub struct EntitlementConfig {
    /// Treat missing active-module data as "every module on". Only for
    /// non-production deployments; the default resolves it to core only.
    pub all_modules_fallback: bool,
    /// Limits used when neither override nor plan names a resource kind.
    /// Kinds absent here fall back to [`conservative_default`].
    pub default_limits: LimitMap,
}

impl EntitlementConfig {
    pub fn default_limit(&self, kind: ResourceKind) -> Limit {
        self.default_limits
            .get(&kind)
            .copied()
            .unwrap_or_else(|| conservative_default(kind))
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            all_modules_fallback: false,
            default_limits: ResourceKind::ALL
                .into_iter()
                .map(|kind| (kind, conservative_default(kind)))
                .collect(),
        }
    }
}
