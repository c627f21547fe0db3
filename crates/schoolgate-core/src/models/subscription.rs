//! Subscription domain model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::limit::LimitMap;
use super::tenant::TenantId;
use crate::module::ModuleKey;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Canceled,
}

/// A tenant's subscription. At most one per tenant; absence means the
/// built-in defaults apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub tenant_id: TenantId,
    pub status: SubscriptionStatus,
    pub trial_expired: bool,
    pub plan_id: Option<i64>,
    /// Tenant-specific limits. Present keys win over plan defaults.
    #[serde(default)]
    pub override_limits: LimitMap,
    /// Billed modules. Informational only; access follows the tenant's
    /// active module set.
    #[serde(default)]
    pub provisioned_modules: BTreeSet<ModuleKey>,
}

/// Billing standing derived from a subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingState {
    /// Active subscription or unexpired trial.
    Good,
    /// Past due; access continues.
    Grace,
    /// Canceled or expired trial; tenant is on billing hold.
    Lapsed,
    /// No subscription record; default limits apply.
    Unsubscribed,
}

impl BillingState {
    pub fn of(subscription: Option<&Subscription>) -> BillingState {
        let Some(sub) = subscription else {
            return BillingState::Unsubscribed;
        };
        match sub.status {
            SubscriptionStatus::Active => BillingState::Good,
            SubscriptionStatus::Trial if sub.trial_expired => BillingState::Lapsed,
            SubscriptionStatus::Trial => BillingState::Good,
            SubscriptionStatus::PastDue => BillingState::Grace,
            SubscriptionStatus::Canceled => BillingState::Lapsed,
        }
    }

    pub fn is_lapsed(self) -> bool {
        self == BillingState::Lapsed
    }
}
