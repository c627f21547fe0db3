//! Subscription plan domain model.

use serde::{Deserialize, Serialize};

use super::limit::LimitMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    /// Default limits for every tenant on this plan. Shared and read-only
    /// at request time.
    pub limits: LimitMap,
}
