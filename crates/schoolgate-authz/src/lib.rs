//! schoolgate authz — everything between a validated credential and a
//! handler: permission derivation, entitlement resolution, the quota
//! guard, and the request authorizer that chains them.

pub mod config;
pub mod entitlement;
pub mod error;
pub mod middleware;
pub mod permission;
pub mod quota;

pub use config::EntitlementConfig;
pub use entitlement::{EffectivePolicy, EntitlementResolver, QuotaSource, QuotaTable, ResolvedLimit};
pub use error::AuthzError;
pub use middleware::{AccessGrant, Authorizer, RouteRequirement, bearer_token};
pub use permission::{derive_capabilities, effective_capabilities, granted_capabilities};
pub use quota::QuotaDecision;
