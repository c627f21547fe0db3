pub mod entitlement;
pub mod principal;
pub mod resource;
pub mod tenant;

pub use entitlement::MemoryEntitlementRepository;
pub use principal::MemoryPrincipalRepository;
pub use resource::{MemoryResourceRepository, ResourceRecord};
pub use tenant::MemoryTenantRepository;
