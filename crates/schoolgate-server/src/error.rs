//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schoolgate_authz::AuthzError;
use schoolgate_core::error::GateError;
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Validation { message } => ApiError::BadRequest(message),
            other => ApiError::Authz(other.into()),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authz(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Authz(AuthzError::Unauthenticated(reason)) => {
                json!({ "code": "UNAUTHENTICATED", "message": reason })
            }
            ApiError::Authz(AuthzError::Forbidden {
                capability: Some(capability),
                ..
            }) => json!({ "code": "FORBIDDEN", "capability": capability }),
            ApiError::Authz(AuthzError::LimitExceeded(decision)) => json!({
                "code": "LIMIT_EXCEEDED",
                "resource": decision.resource,
                "current": decision.current,
                "max": decision.max,
                "source": decision.source,
            }),
            // Internal details stay in the logs.
            ApiError::Authz(err) => json!({ "code": err.code() }),
            ApiError::BadRequest(message) => json!({ "code": "BAD_REQUEST", "message": message }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Authz(AuthzError::Internal(message)) = &self {
            tracing::error!(error = %message, "Request failed");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolgate_authz::{QuotaDecision, QuotaSource};
    use schoolgate_core::capability::Capability;
    use schoolgate_core::models::limit::{Limit, ResourceKind};

    #[test]
    fn forbidden_names_capability_only() {
        let err = ApiError::from(AuthzError::missing_capability(Capability::ManageStudents));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            err.body(),
            json!({ "code": "FORBIDDEN", "capability": "manage-students" })
        );

        let err = ApiError::from(AuthzError::forbidden("tenant 8 is outside the credential's tenant"));
        assert_eq!(err.body(), json!({ "code": "FORBIDDEN" }));
    }

    #[test]
    fn limit_body_carries_decision() {
        let err = ApiError::from(AuthzError::LimitExceeded(QuotaDecision {
            allowed: false,
            resource: ResourceKind::Students,
            current: 50,
            max: Limit::Finite(50),
            source: QuotaSource::Plan,
        }));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            err.body(),
            json!({
                "code": "LIMIT_EXCEEDED",
                "resource": "students",
                "current": 50,
                "max": 50,
                "source": "plan",
            })
        );
    }

    #[test]
    fn lapsed_is_payment_required() {
        let err = ApiError::from(AuthzError::SubscriptionLapsed);
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.body(), json!({ "code": "SUBSCRIPTION_LAPSED" }));
    }

    #[test]
    fn gate_errors_map_to_status() {
        let err = ApiError::from(GateError::AuthenticationFailed {
            reason: "invalid credentials".into(),
        });
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = ApiError::from(GateError::Validation {
            message: "name is required".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(GateError::Storage("lock poisoned".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), json!({ "code": "INTERNAL_ERROR" }));
    }
}
