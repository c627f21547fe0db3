//! Principal (user account) domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tenant::TenantId;
use crate::capability::CapabilitySet;
use crate::role::{self, NormalizedRole};

/// Numeric principal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PrincipalId)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub password_hash: String,
    /// Raw stored role string; see [`role::normalize`].
    pub role: String,
    /// `None` only for platform-level roles.
    pub tenant_id: Option<TenantId>,
    /// Free-form staff sub-role label, meaningful only for staff.
    pub staff_sub_role: Option<String>,
    /// Explicit permission list for platform operators. Ignored for every
    /// other role kind.
    pub permission_overrides: Option<CapabilitySet>,
    /// Bumped to invalidate every credential issued so far.
    pub token_version: u64,
    pub status: PrincipalStatus,
    pub mfa_enabled: bool,
    /// AES-256-GCM encrypted TOTP secret (if MFA is enrolled).
    pub mfa_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn normalized_role(&self) -> NormalizedRole {
        role::normalize(&self.role, self.staff_sub_role.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub role: String,
    pub tenant_id: Option<TenantId>,
    pub staff_sub_role: Option<String>,
    pub permission_overrides: Option<CapabilitySet>,
}

/// Role reassignment. Applying it bumps the principal's token version.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub role: Option<String>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub staff_sub_role: Option<Option<String>>,
    pub permission_overrides: Option<Option<CapabilitySet>>,
}
