//! The closed capability catalog.
//!
//! Capabilities are compile-time variants rather than free-form strings
//! so that a misspelled token fails at parse time instead of silently
//! granting or denying nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named permission unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    // Tenant-scoped capabilities.
    ViewDashboard,
    ManageStudents,
    ManageTeachers,
    ManageParents,
    ManageStaff,
    ManageClasses,
    ManageSchedule,
    ManageAttendance,
    ManageGrades,
    ManageExams,
    ManageFinance,
    ManageTransport,
    ManageLibrary,
    ManageCommunication,
    ViewReports,
    ManageSettings,

    // Platform-level capabilities.
    ManageSchools,
    ManageSubscriptions,
    ManagePlans,
    ViewPlatformAnalytics,
    ManagePlatformSupport,
}

impl Capability {
    /// Every capability a tenant administrator can hold.
    pub const TENANT: [Capability; 16] = [
        Capability::ViewDashboard,
        Capability::ManageStudents,
        Capability::ManageTeachers,
        Capability::ManageParents,
        Capability::ManageStaff,
        Capability::ManageClasses,
        Capability::ManageSchedule,
        Capability::ManageAttendance,
        Capability::ManageGrades,
        Capability::ManageExams,
        Capability::ManageFinance,
        Capability::ManageTransport,
        Capability::ManageLibrary,
        Capability::ManageCommunication,
        Capability::ViewReports,
        Capability::ManageSettings,
    ];

    /// Capabilities that only platform operators can hold.
    pub const PLATFORM: [Capability; 5] = [
        Capability::ManageSchools,
        Capability::ManageSubscriptions,
        Capability::ManagePlans,
        Capability::ViewPlatformAnalytics,
        Capability::ManagePlatformSupport,
    ];

    /// Iterate over the whole catalog, tenant capabilities first.
    pub fn all() -> impl Iterator<Item = Capability> {
        Self::TENANT.into_iter().chain(Self::PLATFORM)
    }

    /// The wire token for this capability (e.g. `manage-students`).
    pub fn token(self) -> &'static str {
        match self {
            Capability::ViewDashboard => "view-dashboard",
            Capability::ManageStudents => "manage-students",
            Capability::ManageTeachers => "manage-teachers",
            Capability::ManageParents => "manage-parents",
            Capability::ManageStaff => "manage-staff",
            Capability::ManageClasses => "manage-classes",
            Capability::ManageSchedule => "manage-schedule",
            Capability::ManageAttendance => "manage-attendance",
            Capability::ManageGrades => "manage-grades",
            Capability::ManageExams => "manage-exams",
            Capability::ManageFinance => "manage-finance",
            Capability::ManageTransport => "manage-transport",
            Capability::ManageLibrary => "manage-library",
            Capability::ManageCommunication => "manage-communication",
            Capability::ViewReports => "view-reports",
            Capability::ManageSettings => "manage-settings",
            Capability::ManageSchools => "manage-schools",
            Capability::ManageSubscriptions => "manage-subscriptions",
            Capability::ManagePlans => "manage-plans",
            Capability::ViewPlatformAnalytics => "view-platform-analytics",
            Capability::ManagePlatformSupport => "manage-platform-support",
        }
    }

    pub fn is_platform(self) -> bool {
        Self::PLATFORM.contains(&self)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown capability token: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|c| c.token() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// An order-irrelevant set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full catalog, platform capabilities included.
    pub fn full() -> Self {
        Capability::all().collect()
    }

    /// Every tenant-scoped capability.
    pub fn tenant_catalog() -> Self {
        Capability::TENANT.into_iter().collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn insert(&mut self, capability: Capability) -> bool {
        self.0.insert(capability)
    }

    pub fn intersection(&self, other: &CapabilitySet) -> CapabilitySet {
        self.0.intersection(&other.0).copied().collect()
    }

    pub fn union(&self, other: &CapabilitySet) -> CapabilitySet {
        self.0.union(&other.0).copied().collect()
    }

    pub fn is_subset(&self, other: &CapabilitySet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(caps: [Capability; N]) -> Self {
        caps.into_iter().collect()
    }
}

/// Where a principal's permissions come from.
///
/// Only platform operators carry an explicit list; for every other role
/// kind the grant is always derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionGrant {
    DerivedFromRole,
    ExplicitOverride(CapabilitySet),
}
