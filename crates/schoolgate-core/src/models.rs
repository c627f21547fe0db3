//! Domain models consumed by the authorization engine.
//!
//! Storage owns these records; the engine only reads them.

pub mod limit;
pub mod plan;
pub mod principal;
pub mod subscription;
pub mod tenant;
