//! In-memory implementation of [`EntitlementRepository`].
//!
//! Subscriptions, plans and module activation are written by billing and
//! school-settings screens; the setters here stand in for those writers.

use std::collections::BTreeSet;

use schoolgate_core::error::GateResult;
use schoolgate_core::models::plan::Plan;
use schoolgate_core::models::subscription::Subscription;
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::module::ModuleKey;
use schoolgate_core::repository::EntitlementRepository;

use crate::db::MemoryDb;

#[derive(Clone)]
pub struct MemoryEntitlementRepository {
    db: MemoryDb,
}

impl MemoryEntitlementRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    pub async fn put_plan(&self, plan: Plan) {
        self.db.write().await.plans.insert(plan.id, plan);
    }

    /// Insert or replace the tenant's subscription.
    pub async fn put_subscription(&self, subscription: Subscription) {
        self.db
            .write()
            .await
            .subscriptions
            .insert(subscription.tenant_id, subscription);
    }

    pub async fn remove_subscription(&self, tenant_id: TenantId) {
        self.db.write().await.subscriptions.remove(&tenant_id);
    }

    /// Set the tenant's active module set. `None` forgets it, which the
    /// resolver treats as missing data.
    pub async fn set_active_modules(&self, tenant_id: TenantId, modules: Option<BTreeSet<ModuleKey>>) {
        let mut tables = self.db.write().await;
        match modules {
            Some(modules) => {
                tables.active_modules.insert(tenant_id, modules);
            }
            None => {
                tables.active_modules.remove(&tenant_id);
            }
        }
    }
}

impl EntitlementRepository for MemoryEntitlementRepository {
    async fn get_subscription(&self, tenant_id: TenantId) -> GateResult<Option<Subscription>> {
        Ok(self.db.read().await.subscriptions.get(&tenant_id).cloned())
    }

    async fn get_plan(&self, plan_id: i64) -> GateResult<Option<Plan>> {
        Ok(self.db.read().await.plans.get(&plan_id).cloned())
    }

    async fn active_modules(&self, tenant_id: TenantId) -> GateResult<Option<BTreeSet<ModuleKey>>> {
        Ok(self.db.read().await.active_modules.get(&tenant_id).cloned())
    }
}
