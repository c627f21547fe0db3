//! Permission derivation.
//!
//! [`derive_capabilities`] is a pure, total function of the normalized
//! role. [`effective_capabilities`] then applies the explicit grant (for
//! platform operators) and the tenant's module ceiling.

use schoolgate_core::capability::{Capability, CapabilitySet, PermissionGrant};
use schoolgate_core::role::{NormalizedRole, PlatformOperator, RoleKind, StaffSubRole};
use tracing::warn;

/// Capabilities a role holds before any module restriction.
///
/// Precedence: platform-admin, tenant-admin (including staff with the
/// administrator sub-role), driver, staff table, then identity-scoped
/// roles which hold nothing. A platform admin holds its operator preset;
/// only the owner holds the full catalog.
pub fn derive_capabilities(role: NormalizedRole) -> CapabilitySet {
    match role.permission_kind() {
        RoleKind::PlatformAdmin => role
            .operator
            .map(PlatformOperator::preset_permissions)
            .unwrap_or_else(CapabilitySet::empty),
        RoleKind::TenantAdmin => CapabilitySet::tenant_catalog(),
        RoleKind::Driver => CapabilitySet::empty(),
        RoleKind::Staff => staff_capabilities(role.sub_role),
        RoleKind::Teacher | RoleKind::Parent | RoleKind::Unknown => CapabilitySet::empty(),
    }
}

fn staff_capabilities(sub_role: Option<StaffSubRole>) -> CapabilitySet {
    use Capability::*;

    match sub_role {
        Some(StaffSubRole::Administrator) => CapabilitySet::tenant_catalog(),
        Some(StaffSubRole::Driver) => CapabilitySet::empty(),
        Some(StaffSubRole::Registrar) => CapabilitySet::from([
            ViewDashboard,
            ManageStudents,
            ManageParents,
            ManageAttendance,
        ]),
        Some(StaffSubRole::Accountant) => {
            CapabilitySet::from([ViewDashboard, ManageFinance, ViewReports])
        }
        Some(StaffSubRole::AcademicSupervisor) => CapabilitySet::from([
            ViewDashboard,
            ManageClasses,
            ManageSchedule,
            ManageAttendance,
            ManageGrades,
            ManageExams,
            ViewReports,
        ]),
        Some(StaffSubRole::TransportCoordinator) => {
            CapabilitySet::from([ViewDashboard, ManageTransport])
        }
        Some(StaffSubRole::Librarian) => CapabilitySet::from([ViewDashboard, ManageLibrary]),
        Some(StaffSubRole::Secretary) => CapabilitySet::from([
            ViewDashboard,
            ManageStudents,
            ManageParents,
            ManageCommunication,
        ]),
        None => CapabilitySet::from([ViewDashboard]),
    }
}

/// Role capabilities with the explicit grant applied. An override list is
/// honored for platform operators only.
pub fn granted_capabilities(role: NormalizedRole, grant: &PermissionGrant) -> CapabilitySet {
    match grant {
        PermissionGrant::ExplicitOverride(list) if role.kind.is_platform_admin() => list.clone(),
        PermissionGrant::ExplicitOverride(_) => {
            warn!(role = %role.kind, "Ignoring explicit permission list for non-platform role");
            derive_capabilities(role)
        }
        PermissionGrant::DerivedFromRole => derive_capabilities(role),
    }
}

/// Whether the role is exempt from the tenant's module ceiling.
pub fn bypasses_modules(role: NormalizedRole) -> bool {
    matches!(
        role.permission_kind(),
        RoleKind::PlatformAdmin | RoleKind::TenantAdmin
    )
}

/// What the principal may actually do inside a tenant whose active
/// modules unlock `module_capabilities`.
pub fn effective_capabilities(
    role: NormalizedRole,
    grant: &PermissionGrant,
    module_capabilities: &CapabilitySet,
) -> CapabilitySet {
    let granted = granted_capabilities(role, grant);
    if bypasses_modules(role) {
        granted
    } else {
        granted.intersection(module_capabilities)
    }
}
