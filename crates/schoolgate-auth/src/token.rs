//! Bearer credential issuance/verification and opaque challenge token
//! generation.
//!
//! Credentials are EdDSA (Ed25519) JWTs. They are never stored; the only
//! revocation mechanism is the `tokenVersion` claim, compared against the
//! principal's current counter at validation time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use schoolgate_core::capability::{CapabilitySet, PermissionGrant};
use schoolgate_core::models::principal::{Principal, PrincipalId};
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::role::RoleKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Which of the two credential forms a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claims embedded in every credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialClaims {
    /// Subject — principal ID.
    pub sub: String,
    /// Raw stored role string at mint time.
    pub role: String,
    pub tenant_id: Option<TenantId>,
    /// Principal's version counter at mint time.
    pub token_version: u64,
    /// Explicit permission list; only ever present for platform operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<CapabilitySet>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    #[serde(rename = "use")]
    pub token_use: TokenUse,
}

impl CredentialClaims {
    pub fn principal_id(&self) -> Result<PrincipalId, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::TokenInvalid("malformed subject".into()))
    }

    pub fn role_kind(&self) -> RoleKind {
        RoleKind::parse(&self.role)
    }

    /// Interpret the `permissions` claim. It is an override only for
    /// platform operators; for any other role it is ignored.
    pub fn permission_grant(&self) -> PermissionGrant {
        match (&self.permissions, self.role_kind()) {
            (Some(list), RoleKind::PlatformAdmin) => PermissionGrant::ExplicitOverride(list.clone()),
            (Some(_), kind) => {
                warn!(
                    principal_id = %self.sub,
                    role = %kind,
                    "Ignoring permissions claim on non-platform credential"
                );
                PermissionGrant::DerivedFromRole
            }
            (None, _) => PermissionGrant::DerivedFromRole,
        }
    }
}

/// Issue a signed credential for `principal`.
///
/// The permission list is embedded only when the principal is a platform
/// operator with an explicit override list.
pub fn issue_credential(
    principal: &Principal,
    token_use: TokenUse,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let lifetime = match token_use {
        TokenUse::Access => config.access_token_lifetime_secs,
        TokenUse::Refresh => config.refresh_token_lifetime_secs,
    };
    let permissions = if principal.normalized_role().kind.is_platform_admin() {
        principal.permission_overrides.clone()
    } else {
        None
    };

    let claims = CredentialClaims {
        sub: principal.id.to_string(),
        role: principal.role.clone(),
        tenant_id: principal.tenant_id,
        token_version: principal.token_version,
        permissions,
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + lifetime as i64,
        jti: Uuid::new_v4().to_string(),
        token_use,
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    let header = Header::new(Algorithm::EdDSA);
    jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify a credential's signature, expiry, issuer and form.
///
/// This does not check the version counter; see
/// [`SessionManager::validate_access`](crate::service::SessionManager::validate_access).
pub fn decode_credential(
    token: &str,
    expected_use: TokenUse,
    config: &AuthConfig,
) -> Result<CredentialClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    let claims = jsonwebtoken::decode::<CredentialClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })?;

    if claims.token_use != expected_use {
        return Err(AuthError::TokenInvalid("wrong credential form".into()));
    }
    Ok(claims)
}

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding). Used for MFA challenges.
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of an opaque token, hex-encoded. Only the hash is kept
/// server-side.
pub fn hash_opaque_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
