//! Tenant-scoped resource rows and the atomic count-and-insert used to
//! close the quota check-then-create race.

use chrono::{DateTime, Utc};
use schoolgate_core::error::GateResult;
use schoolgate_core::models::limit::{Limit, ResourceKind};
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::repository::ResourceCounter;
use serde::Serialize;
use tracing::debug;

use crate::db::{MemoryDb, Tables};
use crate::error::StoreError;

/// A stored tenant-scoped resource (student, teacher, bus, ...). The
/// engine only cares about its tenant and kind.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceRecord {
    pub id: i64,
    pub tenant_id: TenantId,
    pub kind: ResourceKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

fn count_in(tables: &Tables, tenant_id: TenantId, kind: ResourceKind) -> u64 {
    tables
        .resources
        .iter()
        .filter(|r| r.tenant_id == tenant_id && r.kind == kind)
        .count() as u64
}

#[derive(Clone)]
pub struct MemoryResourceRepository {
    db: MemoryDb,
}

impl MemoryResourceRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Count and insert under one write lock: the row is created only if
    /// the live count is still below `limit`. Concurrent callers can never
    /// push the tenant past its quota.
    pub async fn insert_within_limit(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: String,
        limit: Limit,
    ) -> Result<ResourceRecord, StoreError> {
        let mut tables = self.db.write().await;
        let current = count_in(&tables, tenant_id, kind);

        if let Limit::Finite(max) = limit {
            if current >= max {
                return Err(StoreError::LimitReached {
                    resource: kind,
                    current,
                    max,
                });
            }
        }

        let record = ResourceRecord {
            id: tables.next_id(),
            tenant_id,
            kind,
            name,
            created_at: Utc::now(),
        };
        tables.resources.push(record.clone());
        debug!(tenant_id = %tenant_id, resource = %kind, count = current + 1, "Resource inserted");
        Ok(record)
    }

    pub async fn list(&self, tenant_id: TenantId, kind: ResourceKind) -> Vec<ResourceRecord> {
        self.db
            .read()
            .await
            .resources
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.kind == kind)
            .cloned()
            .collect()
    }
}

impl ResourceCounter for MemoryResourceRepository {
    async fn count(&self, tenant_id: TenantId, kind: ResourceKind) -> GateResult<u64> {
        Ok(count_in(&*self.db.read().await, tenant_id, kind))
    }
}
