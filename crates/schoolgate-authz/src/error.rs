//! Authorization decision errors.

use schoolgate_core::capability::Capability;
use schoolgate_core::error::GateError;
use thiserror::Error;

use crate::quota::QuotaDecision;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    /// Denied for a tenant-scope reason or a missing capability. Only the
    /// capability is ever shown to the caller.
    #[error("forbidden: {reason}")]
    Forbidden {
        reason: String,
        capability: Option<Capability>,
    },

    #[error("{} limit reached ({}/{})", .0.resource, .0.current, .0.max)]
    LimitExceeded(QuotaDecision),

    #[error("subscription lapsed")]
    SubscriptionLapsed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
            capability: None,
        }
    }

    pub fn missing_capability(capability: Capability) -> Self {
        Self::Forbidden {
            reason: format!("missing capability {capability}"),
            capability: Some(capability),
        }
    }

    /// HTTP status code for this outcome.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthzError::Unauthenticated(_) => 401,
            AuthzError::Forbidden { .. } | AuthzError::LimitExceeded(_) => 403,
            AuthzError::SubscriptionLapsed => 402,
            AuthzError::Internal(_) => 500,
        }
    }

    /// Machine-readable code for response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthzError::Unauthenticated(_) => "UNAUTHENTICATED",
            AuthzError::Forbidden { .. } => "FORBIDDEN",
            AuthzError::LimitExceeded(_) => "LIMIT_EXCEEDED",
            AuthzError::SubscriptionLapsed => "SUBSCRIPTION_LAPSED",
            AuthzError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<GateError> for AuthzError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::AuthenticationFailed { reason } => AuthzError::Unauthenticated(reason),
            GateError::AuthorizationDenied { reason } => AuthzError::forbidden(reason),
            other => AuthzError::Internal(other.to_string()),
        }
    }
}
