//! Feature module catalog.
//!
//! Each module unlocks a fixed set of capabilities. The table is the only
//! place a module's reach is defined.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, CapabilitySet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKey {
    Core,
    Academics,
    Attendance,
    Finance,
    Transport,
    Library,
    Communication,
    Reports,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 8] = [
        ModuleKey::Core,
        ModuleKey::Academics,
        ModuleKey::Attendance,
        ModuleKey::Finance,
        ModuleKey::Transport,
        ModuleKey::Library,
        ModuleKey::Communication,
        ModuleKey::Reports,
    ];

    /// Capabilities this module unlocks.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            ModuleKey::Core => &[
                Capability::ViewDashboard,
                Capability::ManageStudents,
                Capability::ManageTeachers,
                Capability::ManageParents,
                Capability::ManageStaff,
                Capability::ManageClasses,
                Capability::ManageSettings,
            ],
            ModuleKey::Academics => &[
                Capability::ManageSchedule,
                Capability::ManageGrades,
                Capability::ManageExams,
            ],
            ModuleKey::Attendance => &[Capability::ManageAttendance],
            ModuleKey::Finance => &[Capability::ManageFinance],
            ModuleKey::Transport => &[Capability::ManageTransport],
            ModuleKey::Library => &[Capability::ManageLibrary],
            ModuleKey::Communication => &[Capability::ManageCommunication],
            ModuleKey::Reports => &[Capability::ViewReports],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKey::Core => "core",
            ModuleKey::Academics => "academics",
            ModuleKey::Attendance => "attendance",
            ModuleKey::Finance => "finance",
            ModuleKey::Transport => "transport",
            ModuleKey::Library => "library",
            ModuleKey::Communication => "communication",
            ModuleKey::Reports => "reports",
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The conservative built-in module set used when a tenant has no
/// active-module data.
pub fn core_modules() -> BTreeSet<ModuleKey> {
    BTreeSet::from([ModuleKey::Core])
}

pub fn all_modules() -> BTreeSet<ModuleKey> {
    ModuleKey::ALL.into_iter().collect()
}

/// Union of capabilities unlocked by `modules`.
pub fn capabilities_for<'a>(modules: impl IntoIterator<Item = &'a ModuleKey>) -> CapabilitySet {
    modules
        .into_iter()
        .flat_map(|m| m.capabilities().iter().copied())
        .collect()
}
