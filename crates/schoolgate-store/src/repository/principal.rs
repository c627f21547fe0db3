//! In-memory implementation of [`PrincipalRepository`].
//!
//! Password hashing uses Argon2id with OWASP-recommended parameters
//! (memory: 19 MiB, iterations: 2, parallelism: 1). Salt is randomly
//! generated per hash. An optional pepper (server-side secret) can be
//! provided at construction time.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use schoolgate_core::error::{GateError, GateResult};
use schoolgate_core::models::principal::{
    CreatePrincipal, Principal, PrincipalId, PrincipalStatus, UpdateRole,
};
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::repository::PrincipalRepository;
use schoolgate_core::role::{self, PlatformOperator};

use crate::db::{MemoryDb, Tables};
use crate::error::StoreError;

/// Hash a password with Argon2id using OWASP-recommended parameters.
fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, StoreError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| StoreError::Hashing(format!("argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    argon2
        .hash_password(input, &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

fn not_found(id: PrincipalId) -> StoreError {
    StoreError::NotFound {
        entity: "principal".into(),
        id: id.to_string(),
    }
}

/// Tenant-bound roles need a tenant. The staff sub-role takes part since a
/// driver label turns any role into a driver.
fn check_tenant_binding(
    raw_role: &str,
    staff_sub_role: Option<&str>,
    tenant_id: Option<TenantId>,
) -> GateResult<()> {
    let kind = role::normalize(raw_role, staff_sub_role).kind;
    if kind.requires_tenant() && tenant_id.is_none() {
        return Err(GateError::Validation {
            message: format!("role {kind} must belong to a tenant"),
        });
    }
    Ok(())
}

fn principal_mut(tables: &mut Tables, id: PrincipalId) -> Result<&mut Principal, StoreError> {
    tables.principals.get_mut(&id).ok_or_else(|| not_found(id))
}

#[derive(Clone)]
pub struct MemoryPrincipalRepository {
    db: MemoryDb,
    /// Optional server-side pepper for password hashing.
    pepper: Option<String>,
}

impl MemoryPrincipalRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db, pepper: None }
    }

    pub fn with_pepper(db: MemoryDb, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    /// Enable or disable an account. Disabling also bumps the version
    /// counter.
    pub async fn set_status(&self, id: PrincipalId, status: PrincipalStatus) -> GateResult<Principal> {
        let mut tables = self.db.write().await;
        let principal = principal_mut(&mut tables, id)?;
        if status != principal.status && status == PrincipalStatus::Disabled {
            principal.token_version += 1;
        }
        principal.status = status;
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }
}

impl PrincipalRepository for MemoryPrincipalRepository {
    async fn create(&self, input: CreatePrincipal) -> GateResult<Principal> {
        check_tenant_binding(
            &input.role,
            input.staff_sub_role.as_deref(),
            input.tenant_id,
        )?;
        let permission_overrides =
            PlatformOperator::stored_permissions(&input.role, input.permission_overrides);

        let password_hash = hash_password(&input.password, self.pepper.as_deref())?;
        let email = input.email.trim().to_lowercase();

        let mut tables = self.db.write().await;
        if tables.principals.values().any(|p| p.email == email) {
            return Err(StoreError::Duplicate {
                entity: "principal".into(),
                key: email,
            }
            .into());
        }

        let id = PrincipalId(tables.next_id());
        let now = Utc::now();
        let principal = Principal {
            id,
            email,
            password_hash,
            role: input.role,
            tenant_id: input.tenant_id,
            staff_sub_role: input.staff_sub_role,
            permission_overrides,
            token_version: 0,
            status: PrincipalStatus::Active,
            mfa_enabled: false,
            mfa_secret: None,
            created_at: now,
            updated_at: now,
        };
        tables.principals.insert(id, principal.clone());
        Ok(principal)
    }

    async fn get_by_id(&self, id: PrincipalId) -> GateResult<Principal> {
        let tables = self.db.read().await;
        Ok(tables
            .principals
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))?)
    }

    async fn get_by_email(&self, email: &str) -> GateResult<Principal> {
        let email = email.trim().to_lowercase();
        let tables = self.db.read().await;
        Ok(tables
            .principals
            .values()
            .find(|p| p.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "principal".into(),
                id: format!("email={email}"),
            })?)
    }

    async fn bump_token_version(&self, id: PrincipalId) -> GateResult<u64> {
        let mut tables = self.db.write().await;
        let principal = principal_mut(&mut tables, id)?;
        principal.token_version += 1;
        principal.updated_at = Utc::now();
        Ok(principal.token_version)
    }

    async fn update_role(&self, id: PrincipalId, input: UpdateRole) -> GateResult<Principal> {
        let mut tables = self.db.write().await;
        let principal = principal_mut(&mut tables, id)?;

        let role_changed = input.role.as_ref().is_some_and(|r| *r != principal.role);
        let role = input.role.unwrap_or_else(|| principal.role.clone());
        let staff_sub_role = input
            .staff_sub_role
            .unwrap_or_else(|| principal.staff_sub_role.clone());
        check_tenant_binding(&role, staff_sub_role.as_deref(), principal.tenant_id)?;

        // A new operator sub-kind starts from its own preset unless a list
        // comes with the change.
        let requested = match input.permission_overrides {
            Some(overrides) => overrides,
            None if role_changed => None,
            None => principal.permission_overrides.clone(),
        };
        principal.permission_overrides = PlatformOperator::stored_permissions(&role, requested);
        principal.role = role;
        principal.staff_sub_role = staff_sub_role;
        principal.token_version += 1;
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }

    async fn set_mfa(
        &self,
        id: PrincipalId,
        enabled: bool,
        secret: Option<Option<String>>,
    ) -> GateResult<Principal> {
        let mut tables = self.db.write().await;
        let principal = principal_mut(&mut tables, id)?;
        principal.mfa_enabled = enabled;
        if let Some(secret) = secret {
            principal.mfa_secret = secret;
        }
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }
}
