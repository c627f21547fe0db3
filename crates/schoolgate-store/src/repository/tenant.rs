//! In-memory implementation of [`TenantRepository`].

use chrono::Utc;
use schoolgate_core::error::GateResult;
use schoolgate_core::models::tenant::{CreateTenant, Tenant, TenantId, TenantStatus};
use schoolgate_core::repository::TenantRepository;

use crate::db::MemoryDb;
use crate::error::StoreError;

#[derive(Clone)]
pub struct MemoryTenantRepository {
    db: MemoryDb,
}

impl MemoryTenantRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Activate or deactivate a tenant.
    pub async fn set_status(&self, id: TenantId, status: TenantStatus) -> GateResult<Tenant> {
        let mut tables = self.db.write().await;
        let tenant = tables
            .tenants
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "tenant".into(),
                id: id.to_string(),
            })?;
        tenant.status = status;
        tenant.updated_at = Utc::now();
        Ok(tenant.clone())
    }
}

impl TenantRepository for MemoryTenantRepository {
    async fn create(&self, input: CreateTenant) -> GateResult<Tenant> {
        let mut tables = self.db.write().await;
        let id = TenantId(tables.next_id());
        let now = Utc::now();
        let tenant = Tenant {
            id,
            name: input.name,
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        tables.tenants.insert(id, tenant.clone());
        Ok(tenant)
    }

    async fn get_by_id(&self, id: TenantId) -> GateResult<Tenant> {
        let tables = self.db.read().await;
        tables.tenants.get(&id).cloned().ok_or_else(|| {
            StoreError::NotFound {
                entity: "tenant".into(),
                id: id.to_string(),
            }
            .into()
        })
    }
}
