//! Role normalization.
//!
//! Stored role strings are free text. Everything downstream works on
//! [`RoleKind`], which this module derives from the raw role plus the
//! optional staff sub-role label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};

/// The fixed set of role kinds. `Unknown` resolves to zero capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    PlatformAdmin,
    TenantAdmin,
    Staff,
    Teacher,
    Parent,
    Driver,
    Unknown,
}

impl RoleKind {
    /// Case-insensitive exact match against the known role strings.
    pub fn parse(raw: &str) -> RoleKind {
        match raw.trim().to_lowercase().as_str() {
            "super_admin"
            | "superadmin"
            | "super_admin_financial"
            | "super_admin_technical"
            | "super_admin_supervisor" => RoleKind::PlatformAdmin,
            "admin" | "school_admin" => RoleKind::TenantAdmin,
            "staff" => RoleKind::Staff,
            "teacher" => RoleKind::Teacher,
            "parent" => RoleKind::Parent,
            "driver" => RoleKind::Driver,
            _ => RoleKind::Unknown,
        }
    }

    pub fn is_platform_admin(self) -> bool {
        self == RoleKind::PlatformAdmin
    }

    /// Platform operators act across tenants; every other kind must be
    /// bound to exactly one tenant.
    pub fn requires_tenant(self) -> bool {
        !matches!(self, RoleKind::PlatformAdmin | RoleKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoleKind::PlatformAdmin => "platform-admin",
            RoleKind::TenantAdmin => "tenant-admin",
            RoleKind::Staff => "staff",
            RoleKind::Teacher => "teacher",
            RoleKind::Parent => "parent",
            RoleKind::Driver => "driver",
            RoleKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized staff sub-roles. Labels are stored in Arabic by the school
/// screens; English aliases are accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaffSubRole {
    Administrator,
    Driver,
    Registrar,
    Accountant,
    AcademicSupervisor,
    TransportCoordinator,
    Librarian,
    Secretary,
}

impl StaffSubRole {
    pub fn parse(label: &str) -> Option<StaffSubRole> {
        let label = label.trim().to_lowercase();
        let sub_role = match label.as_str() {
            "مدير" | "administrator" => StaffSubRole::Administrator,
            "سائق" | "driver" => StaffSubRole::Driver,
            "مسؤول تسجيل" | "registrar" => StaffSubRole::Registrar,
            "محاسب" | "accountant" => StaffSubRole::Accountant,
            "مشرف" | "supervisor" => StaffSubRole::AcademicSupervisor,
            "منسق نقل" | "transport coordinator" => StaffSubRole::TransportCoordinator,
            "أمين مكتبة" | "librarian" => StaffSubRole::Librarian,
            "سكرتير" | "secretary" => StaffSubRole::Secretary,
            _ => return None,
        };
        Some(sub_role)
    }
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRole {
    /// Kind used for routing and tenant binding.
    pub kind: RoleKind,
    /// Parsed sub-role; only ever set for staff.
    pub sub_role: Option<StaffSubRole>,
    /// Operator sub-kind; only ever set for platform admins.
    pub operator: Option<PlatformOperator>,
}

impl NormalizedRole {
    /// Kind used for permission derivation. A staff member with the
    /// administrator sub-role derives permissions as a tenant admin but
    /// keeps routing as staff.
    pub fn permission_kind(&self) -> RoleKind {
        match (self.kind, self.sub_role) {
            (RoleKind::Staff, Some(StaffSubRole::Administrator)) => RoleKind::TenantAdmin,
            (kind, _) => kind,
        }
    }
}

/// Canonicalize a stored role string plus optional staff sub-role.
///
/// The driver sub-role label forces [`RoleKind::Driver`] regardless of the
/// raw role string.
pub fn normalize(raw_role: &str, staff_sub_role: Option<&str>) -> NormalizedRole {
    let parsed = staff_sub_role.and_then(StaffSubRole::parse);

    if parsed == Some(StaffSubRole::Driver) {
        return NormalizedRole {
            kind: RoleKind::Driver,
            sub_role: None,
            operator: None,
        };
    }

    let kind = RoleKind::parse(raw_role);
    NormalizedRole {
        kind,
        sub_role: parsed.filter(|_| kind == RoleKind::Staff),
        operator: PlatformOperator::parse(raw_role),
    }
}

/// Platform operator sub-kinds. Every sub-kind except the owner holds a
/// narrower preset list, stored on the account when it is provisioned
/// without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformOperator {
    Owner,
    Financial,
    Technical,
    Supervisor,
}

impl PlatformOperator {
    pub fn parse(raw_role: &str) -> Option<PlatformOperator> {
        match raw_role.trim().to_lowercase().as_str() {
            "super_admin" | "superadmin" => Some(PlatformOperator::Owner),
            "super_admin_financial" => Some(PlatformOperator::Financial),
            "super_admin_technical" => Some(PlatformOperator::Technical),
            "super_admin_supervisor" => Some(PlatformOperator::Supervisor),
            _ => None,
        }
    }

    /// Permissions the sub-kind holds when no explicit list is stored.
    /// Only the owner holds the full catalog.
    pub fn preset_permissions(self) -> CapabilitySet {
        match self {
            PlatformOperator::Owner => CapabilitySet::full(),
            PlatformOperator::Financial => CapabilitySet::from([
                Capability::ManageSubscriptions,
                Capability::ManagePlans,
                Capability::ManageFinance,
                Capability::ViewPlatformAnalytics,
            ]),
            PlatformOperator::Technical => CapabilitySet::from([
                Capability::ManageSchools,
                Capability::ManageSettings,
                Capability::ManagePlatformSupport,
            ]),
            PlatformOperator::Supervisor => CapabilitySet::from([
                Capability::ViewDashboard,
                Capability::ViewReports,
                Capability::ViewPlatformAnalytics,
            ]),
        }
    }

    /// Permission list to store on an operator account. The owner keeps
    /// whatever was requested; every other sub-kind falls back to its
    /// preset. `None` for principals that are not platform operators.
    pub fn stored_permissions(
        raw_role: &str,
        requested: Option<CapabilitySet>,
    ) -> Option<CapabilitySet> {
        match PlatformOperator::parse(raw_role)? {
            PlatformOperator::Owner => requested,
            operator => Some(requested.unwrap_or_else(|| operator.preset_permissions())),
        }
    }
}
