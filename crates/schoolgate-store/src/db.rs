//! Shared in-memory database handle.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use schoolgate_core::models::plan::Plan;
use schoolgate_core::models::principal::{Principal, PrincipalId};
use schoolgate_core::models::subscription::Subscription;
use schoolgate_core::models::tenant::{Tenant, TenantId};
use schoolgate_core::module::ModuleKey;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::repository::resource::ResourceRecord;

#[derive(Debug, Default)]
pub(crate) struct Tables {
    next_id: i64,
    pub tenants: BTreeMap<TenantId, Tenant>,
    pub principals: BTreeMap<PrincipalId, Principal>,
    pub subscriptions: HashMap<TenantId, Subscription>,
    pub plans: HashMap<i64, Plan>,
    pub active_modules: HashMap<TenantId, BTreeSet<ModuleKey>>,
    pub resources: Vec<ResourceRecord>,
}

impl Tables {
    pub fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Cheaply cloneable handle; every repository built from the same handle
/// sees the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
