//! schoolgate core — shared domain types for the authorization and
//! subscription-entitlement engine.
//!
//! This crate provides:
//! - the error type ([`GateError`])
//! - domain models read from storage ([`models`])
//! - the role normalizer ([`role::normalize`])
//! - the capability and module catalogs ([`capability`], [`module`])
//! - repository traits the engine consumes ([`repository`])

pub mod capability;
pub mod error;
pub mod models;
pub mod module;
pub mod repository;
pub mod role;

pub use capability::{Capability, CapabilitySet, PermissionGrant};
pub use error::{GateError, GateResult};
pub use role::{NormalizedRole, RoleKind, StaffSubRole};
