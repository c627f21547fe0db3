//! Session manager — login, step-up, credential validation, refresh and
//! revocation.
//!
//! Per login attempt the flow is a small state machine:
//!
//! ```text
//! Unauthenticated --password ok, no step-up--> Authenticated
//! Unauthenticated --password ok, step-up-----> PendingMfa
//! PendingMfa      --correct code in time-----> Authenticated
//! PendingMfa      --wrong code---------------> PendingMfa
//! ```
//!
//! There is no server-side session store. A credential is revoked by
//! bumping the principal's version counter.

use chrono::{Duration, Utc};
use schoolgate_core::capability::PermissionGrant;
use schoolgate_core::error::{GateError, GateResult};
use schoolgate_core::models::principal::{Principal, PrincipalId, UpdateRole};
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::repository::PrincipalRepository;
use schoolgate_core::role::NormalizedRole;
use tracing::{debug, info};

use crate::challenge::{ChallengeStore, MfaChallenge};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token::{self, CredentialClaims, TokenUse};
use crate::totp;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Access + refresh credential pair.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access credential lifetime in seconds.
    pub expires_in: u64,
}

/// Result of a successful password check.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(TokenPair),
    /// Step-up required; present `challenge_token` with a TOTP code.
    MfaRequired {
        challenge_token: String,
        expires_in: u64,
    },
}

/// Input for completing a pending MFA challenge.
#[derive(Debug)]
pub struct MfaVerifyInput {
    pub challenge_token: String,
    pub code: String,
}

#[derive(Debug)]
pub struct RefreshOutput {
    pub access_token: String,
    pub expires_in: u64,
}

/// Secret material returned once at enrollment.
#[derive(Debug)]
pub struct MfaEnrollment {
    pub base32_secret: String,
    pub otpauth_uri: String,
}

/// A principal whose access credential passed every check, including the
/// version counter.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal {
    pub principal_id: PrincipalId,
    pub role: NormalizedRole,
    pub tenant_id: Option<TenantId>,
    pub token_version: u64,
    pub grant: PermissionGrant,
}

/// Session manager.
///
/// Generic over the principal repository so that the auth layer has no
/// dependency on any storage crate.
pub struct SessionManager<P: PrincipalRepository> {
    principals: P,
    challenges: ChallengeStore,
    config: AuthConfig,
}

impl<P: PrincipalRepository> SessionManager<P> {
    pub fn new(principals: P, config: AuthConfig) -> Self {
        Self {
            principals,
            challenges: ChallengeStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn principals(&self) -> &P {
        &self.principals
    }

    /// Verify email + password. Issues credentials directly, or a pending
    /// MFA challenge when the principal's role requires step-up.
    pub async fn login(&self, input: LoginInput) -> GateResult<LoginOutcome> {
        // 1. Look up principal; a missing account still costs one hash check.
        let principal = match self.principals.get_by_email(&input.email).await {
            Ok(p) => Some(p),
            Err(GateError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let valid = password::verify_login_password(
            &input.password,
            principal.as_ref().map(|p| p.password_hash.as_str()),
            self.config.pepper.as_deref(),
        )?;

        // 2. Unknown email, wrong password, disabled account: one answer.
        let principal = match principal {
            Some(p) if valid && p.is_active() => p,
            _ => {
                info!("Login rejected: invalid credentials");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        // 3. Step-up for platform operators.
        if self.requires_step_up(&principal) {
            if !principal.mfa_enabled || principal.mfa_secret.is_none() {
                info!(principal_id = %principal.id, "Login rejected: step-up required but MFA not enrolled");
                return Err(AuthError::MfaNotEnrolled.into());
            }

            let raw = token::generate_opaque_token();
            let expires_at =
                Utc::now() + Duration::seconds(self.config.mfa_challenge_lifetime_secs as i64);
            self.challenges
                .insert(
                    token::hash_opaque_token(&raw),
                    MfaChallenge {
                        principal_id: principal.id,
                        expires_at,
                    },
                )
                .await;

            debug!(principal_id = %principal.id, "MFA challenge issued");
            return Ok(LoginOutcome::MfaRequired {
                challenge_token: raw,
                expires_in: self.config.mfa_challenge_lifetime_secs,
            });
        }

        // 4. Mint credentials.
        let pair = self.issue_pair(&principal)?;
        info!(principal_id = %principal.id, "Login succeeded");
        Ok(LoginOutcome::Authenticated(pair))
    }

    /// Complete a pending MFA challenge with a TOTP code.
    ///
    /// A wrong code leaves the challenge pending; retry limits belong to
    /// the surrounding rate limiter.
    pub async fn verify_mfa(&self, input: MfaVerifyInput) -> GateResult<TokenPair> {
        let token_hash = token::hash_opaque_token(&input.challenge_token);
        let challenge = self.challenges.pending(&token_hash).await?;

        let principal = self.principals.get_by_id(challenge.principal_id).await?;
        if !principal.is_active() {
            return Err(AuthError::InvalidCredentials.into());
        }

        let step = self.match_code(&principal, &input.code)?.ok_or_else(|| {
            info!(principal_id = %principal.id, "MFA rejected: wrong code");
            AuthError::MfaInvalidCode
        })?;

        self.challenges.complete(&token_hash, step).await?;

        info!(principal_id = %principal.id, "MFA verified, login succeeded");
        Ok(self.issue_pair(&principal)?)
    }

    /// Validate an access credential: signature, expiry, issuer, form,
    /// and the version counter.
    ///
    /// Performs one uncached principal read. A version mismatch is treated
    /// exactly like an invalid credential, however valid the signature.
    pub async fn validate_access(&self, raw: &str) -> GateResult<AuthenticatedPrincipal> {
        let claims = token::decode_credential(raw, TokenUse::Access, &self.config)?;
        let principal = self.current_principal(&claims).await?;

        Ok(AuthenticatedPrincipal {
            principal_id: principal.id,
            role: token_role(&claims, &principal),
            tenant_id: claims.tenant_id,
            token_version: claims.token_version,
            grant: claims.permission_grant(),
        })
    }

    /// Mint a new access credential from a refresh credential without
    /// re-presenting primary factors. The version counter still applies.
    pub async fn refresh(&self, raw_refresh: &str) -> GateResult<RefreshOutput> {
        let claims = token::decode_credential(raw_refresh, TokenUse::Refresh, &self.config)?;
        let principal = self.current_principal(&claims).await?;

        let access_token = token::issue_credential(&principal, TokenUse::Access, &self.config)?;
        debug!(principal_id = %principal.id, "Access credential refreshed");
        Ok(RefreshOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }

    /// Invalidate every credential issued to `principal_id` so far
    /// (logout everywhere, forced security reset).
    pub async fn revoke_all(&self, principal_id: PrincipalId) -> GateResult<u64> {
        let version = self.principals.bump_token_version(principal_id).await?;
        info!(principal_id = %principal_id, version, "All credentials revoked");
        Ok(version)
    }

    /// Reassign a principal's role. The repository bumps the version
    /// counter in the same write, so existing credentials stop working.
    pub async fn reassign_role(
        &self,
        principal_id: PrincipalId,
        input: UpdateRole,
    ) -> GateResult<Principal> {
        let principal = self.principals.update_role(principal_id, input).await?;
        info!(
            principal_id = %principal_id,
            role = %principal.role,
            version = principal.token_version,
            "Role reassigned"
        );
        Ok(principal)
    }

    /// Generate and store (encrypted) a new TOTP secret. MFA stays
    /// disabled until [`confirm_mfa`](Self::confirm_mfa) succeeds.
    pub async fn enroll_mfa(&self, principal_id: PrincipalId) -> GateResult<MfaEnrollment> {
        let key = self.mfa_key()?;
        let principal = self.principals.get_by_id(principal_id).await?;

        let enrollment = totp::generate_enrollment(&self.config.totp_issuer, &principal.email)?;
        let encrypted = totp::encrypt_secret(key, &enrollment.secret_bytes)?;
        self.principals
            .set_mfa(principal_id, false, Some(Some(encrypted)))
            .await?;

        info!(principal_id = %principal_id, "MFA enrollment started");
        Ok(MfaEnrollment {
            base32_secret: enrollment.base32_secret,
            otpauth_uri: enrollment.otpauth_uri,
        })
    }

    /// Enable MFA once the principal proves possession of the secret.
    pub async fn confirm_mfa(&self, principal_id: PrincipalId, code: &str) -> GateResult<()> {
        let principal = self.principals.get_by_id(principal_id).await?;
        let step = self
            .match_code(&principal, code)?
            .ok_or(AuthError::MfaInvalidCode)?;
        if !self.challenges.use_step(principal_id, step).await {
            return Err(AuthError::MfaInvalidCode.into());
        }

        self.principals.set_mfa(principal_id, true, None).await?;
        info!(principal_id = %principal_id, "MFA enabled");
        Ok(())
    }

    fn requires_step_up(&self, principal: &Principal) -> bool {
        self.config.require_step_up && principal.normalized_role().kind.is_platform_admin()
    }

    fn mfa_key(&self) -> Result<&[u8; 32], AuthError> {
        self.config
            .mfa_encryption_key
            .as_ref()
            .ok_or_else(|| AuthError::Crypto("MFA encryption key not configured".into()))
    }

    fn match_code(&self, principal: &Principal, code: &str) -> Result<Option<u64>, AuthError> {
        let encrypted = principal
            .mfa_secret
            .as_deref()
            .ok_or(AuthError::MfaNotEnrolled)?;
        let secret = totp::decrypt_secret(self.mfa_key()?, encrypted)?;
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        totp::matching_step(
            &secret,
            code.trim(),
            now,
            &self.config.totp_issuer,
            &principal.email,
        )
    }

    fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: token::issue_credential(principal, TokenUse::Access, &self.config)?,
            refresh_token: token::issue_credential(principal, TokenUse::Refresh, &self.config)?,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }

    /// Load the principal named by `claims` and enforce the version
    /// counter and account status.
    async fn current_principal(&self, claims: &CredentialClaims) -> GateResult<Principal> {
        let principal_id = claims.principal_id()?;
        let principal = self
            .principals
            .get_by_id(principal_id)
            .await
            .map_err(|e| match e {
                GateError::NotFound { .. } => {
                    GateError::from(AuthError::TokenInvalid("unknown principal".into()))
                }
                other => other,
            })?;

        if claims.token_version != principal.token_version {
            info!(
                principal_id = %principal_id,
                token_version = claims.token_version,
                current_version = principal.token_version,
                "Credential rejected: version counter mismatch"
            );
            return Err(AuthError::TokenRevoked.into());
        }
        if !principal.is_active() {
            return Err(AuthError::TokenRevoked.into());
        }
        Ok(principal)
    }
}

/// Role as minted into the credential, with the staff sub-role read from
/// the current record. Any role change bumps the version counter, so the
/// two cannot disagree once the version check has passed.
fn token_role(claims: &CredentialClaims, principal: &Principal) -> NormalizedRole {
    schoolgate_core::role::normalize(&claims.role, principal.staff_sub_role.as_deref())
}
