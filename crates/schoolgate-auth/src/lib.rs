//! schoolgate auth — the session manager: password login, EdDSA bearer
//! credentials with version-counter revocation, and TOTP step-up for
//! platform operators.

pub mod challenge;
pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;
pub mod totp;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{
    AuthenticatedPrincipal, LoginInput, LoginOutcome, MfaEnrollment, MfaVerifyInput,
    RefreshOutput, SessionManager, TokenPair,
};
pub use token::{CredentialClaims, TokenUse};
