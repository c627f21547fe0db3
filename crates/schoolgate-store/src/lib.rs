//! schoolgate store — in-memory implementations of the repository traits
//! the engine consumes.
//!
//! This crate provides:
//! - a shared in-memory database handle ([`MemoryDb`])
//! - repository implementations ([`repository`])
//! - an atomic count-and-insert for quota-bounded resources
//!   ([`repository::MemoryResourceRepository::insert_within_limit`])
//! - error types ([`StoreError`])
//!
//! Every read is served from the single authoritative copy, so principal
//! lookups are strongly consistent as credential validation requires.

mod db;
mod error;
pub mod repository;

pub use db::MemoryDb;
pub use error::StoreError;
