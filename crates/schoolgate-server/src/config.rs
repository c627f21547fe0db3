//! Server configuration, read from `SCHOOLGATE_*` environment variables.

use schoolgate_auth::AuthConfig;
use schoolgate_authz::EntitlementConfig;
use thiserror::Error;

pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: String,
    pub auth: AuthConfig,
    pub entitlements: EntitlementConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        let mut auth = AuthConfig {
            jwt_private_key_pem: required("SCHOOLGATE_JWT_PRIVATE_KEY_PEM")?,
            jwt_public_key_pem: required("SCHOOLGATE_JWT_PUBLIC_KEY_PEM")?,
            pepper: lookup("SCHOOLGATE_PASSWORD_PEPPER"),
            ..AuthConfig::default()
        };
        if let Some(raw) = lookup("SCHOOLGATE_REQUIRE_STEP_UP") {
            auth.require_step_up = parse_bool("SCHOOLGATE_REQUIRE_STEP_UP", &raw)?;
        }
        if let Some(raw) = lookup("SCHOOLGATE_ACCESS_TTL_SECS") {
            auth.access_token_lifetime_secs = parse_secs("SCHOOLGATE_ACCESS_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SCHOOLGATE_REFRESH_TTL_SECS") {
            auth.refresh_token_lifetime_secs = parse_secs("SCHOOLGATE_REFRESH_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("SCHOOLGATE_MFA_KEY") {
            auth.mfa_encryption_key = Some(parse_key("SCHOOLGATE_MFA_KEY", &raw)?);
        }

        let mut entitlements = EntitlementConfig::default();
        if let Some(raw) = lookup("SCHOOLGATE_ALL_MODULES_FALLBACK") {
            entitlements.all_modules_fallback = parse_bool("SCHOOLGATE_ALL_MODULES_FALLBACK", &raw)?;
        }

        Ok(Self {
            http_addr: lookup("SCHOOLGATE_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.into()),
            auth,
            entitlements,
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            message: "lifetime must be positive".into(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::Invalid {
            var,
            message: e.to_string(),
        }),
    }
}

fn parse_key(var: &'static str, raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(raw.trim()).map_err(|e| ConfigError::Invalid {
        var,
        message: e.to_string(),
    })?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| ConfigError::Invalid {
        var,
        message: format!("expected 32 bytes, got {}", bytes.len()),
    })
}
