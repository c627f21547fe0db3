//! Integration tests for resource counting and the atomic
//! count-and-insert.

use std::collections::BTreeSet;

use schoolgate_core::models::limit::{Limit, LimitMap, ResourceKind};
use schoolgate_core::models::plan::Plan;
use schoolgate_core::models::subscription::{Subscription, SubscriptionStatus};
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::module::ModuleKey;
use schoolgate_core::repository::{EntitlementRepository, ResourceCounter};
use schoolgate_store::repository::{MemoryEntitlementRepository, MemoryResourceRepository};
use schoolgate_store::{MemoryDb, StoreError};

#[tokio::test]
async fn counts_are_tenant_and_kind_scoped() {
    let repo = MemoryResourceRepository::new(MemoryDb::new());
    let (a, b) = (TenantId(1), TenantId(2));

    for name in ["Amal", "Bilal"] {
        repo.insert_within_limit(a, ResourceKind::Students, name.into(), Limit::Unlimited)
            .await
            .unwrap();
    }
    repo.insert_within_limit(b, ResourceKind::Students, "Chadi".into(), Limit::Unlimited)
        .await
        .unwrap();
    repo.insert_within_limit(a, ResourceKind::Buses, "Bus 1".into(), Limit::Unlimited)
        .await
        .unwrap();

    assert_eq!(repo.count(a, ResourceKind::Students).await.unwrap(), 2);
    assert_eq!(repo.count(b, ResourceKind::Students).await.unwrap(), 1);
    assert_eq!(repo.count(a, ResourceKind::Buses).await.unwrap(), 1);
    assert_eq!(repo.count(b, ResourceKind::Buses).await.unwrap(), 0);
    assert_eq!(repo.list(a, ResourceKind::Students).await.len(), 2);
}

#[tokio::test]
async fn insert_stops_at_limit() {
    let repo = MemoryResourceRepository::new(MemoryDb::new());
    let t = TenantId(1);

    repo.insert_within_limit(t, ResourceKind::Buses, "Bus 1".into(), Limit::Finite(2))
        .await
        .unwrap();
    repo.insert_within_limit(t, ResourceKind::Buses, "Bus 2".into(), Limit::Finite(2))
        .await
        .unwrap();
    let err = repo
        .insert_within_limit(t, ResourceKind::Buses, "Bus 3".into(), Limit::Finite(2))
        .await
        .unwrap_err();

    match err {
        StoreError::LimitReached { current, max, .. } => {
            assert_eq!(current, 2);
            assert_eq!(max, 2);
        }
        other => panic!("expected LimitReached, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_never_exceed_limit() {
    let repo = MemoryResourceRepository::new(MemoryDb::new());
    let t = TenantId(9);

    let mut handles = Vec::new();
    for i in 0..32 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.insert_within_limit(
                t,
                ResourceKind::Students,
                format!("student-{i}"),
                Limit::Finite(10),
            )
            .await
            .is_ok()
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 10);
    assert_eq!(repo.count(t, ResourceKind::Students).await.unwrap(), 10);
}

#[tokio::test]
async fn entitlement_records_default_to_none() {
    let repo = MemoryEntitlementRepository::new(MemoryDb::new());
    assert!(repo.get_subscription(TenantId(1)).await.unwrap().is_none());
    assert!(repo.get_plan(1).await.unwrap().is_none());
    assert!(repo.active_modules(TenantId(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn entitlement_records_roundtrip() {
    let repo = MemoryEntitlementRepository::new(MemoryDb::new());
    let t = TenantId(3);

    repo.put_plan(Plan {
        id: 1,
        name: "Basic".into(),
        limits: LimitMap::from([(ResourceKind::Students, Limit::Finite(50))]),
    })
    .await;
    repo.put_subscription(Subscription {
        tenant_id: t,
        status: SubscriptionStatus::Active,
        trial_expired: false,
        plan_id: Some(1),
        override_limits: LimitMap::new(),
        provisioned_modules: BTreeSet::from([ModuleKey::Finance]),
    })
    .await;
    repo.set_active_modules(t, Some(BTreeSet::from([ModuleKey::Core])))
        .await;

    let sub = repo.get_subscription(t).await.unwrap().unwrap();
    assert_eq!(sub.plan_id, Some(1));
    assert_eq!(
        repo.get_plan(1).await.unwrap().unwrap().limits[&ResourceKind::Students],
        Limit::Finite(50)
    );
    assert_eq!(
        repo.active_modules(t).await.unwrap(),
        Some(BTreeSet::from([ModuleKey::Core]))
    );

    repo.set_active_modules(t, None).await;
    assert!(repo.active_modules(t).await.unwrap().is_none());
    repo.remove_subscription(t).await;
    assert!(repo.get_subscription(t).await.unwrap().is_none());
}
