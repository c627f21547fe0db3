//! Authentication error types.

use schoolgate_core::error::GateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately generic: never says whether the email or the password
    /// was wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("MFA is not enrolled for this account")]
    MfaNotEnrolled,

    #[error("invalid MFA code")]
    MfaInvalidCode,

    #[error("MFA challenge is invalid or already used")]
    MfaChallengeInvalid,

    #[error("MFA challenge has expired")]
    MfaChallengeExpired,

    #[error("token has expired")]
    TokenExpired,

    #[error("token has been revoked")]
    TokenRevoked,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for GateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => GateError::Crypto(msg),
            other => GateError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
