//! TOTP generation, verification, and AES-256-GCM secret encryption.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AuthError;

/// RFC 6238 time step.
pub const STEP_SECS: u64 = 30;
/// Accepted clock drift, in steps, on either side of now.
const SKEW_STEPS: u64 = 1;

/// Encrypt a TOTP secret with AES-256-GCM.
///
/// Returns `base64(nonce || ciphertext || tag)`.
pub fn encrypt_secret(key: &[u8; 32], plaintext: &[u8]) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

/// Decrypt an AES-256-GCM encrypted TOTP secret.
pub fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() < 13 {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
}

fn build(secret_bytes: &[u8], issuer: &str, account: &str) -> Result<TOTP, AuthError> {
    TOTP::new(
        Algorithm::SHA1,
        6,
        0,
        STEP_SECS,
        secret_bytes.to_vec(),
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))
}

/// A freshly generated TOTP secret.
#[derive(Debug, Clone)]
pub struct Enrollment {
    pub secret_bytes: Vec<u8>,
    pub base32_secret: String,
    pub otpauth_uri: String,
}

/// Generate a TOTP enrollment: raw secret, base32 form, otpauth URI.
pub fn generate_enrollment(issuer: &str, account: &str) -> Result<Enrollment, AuthError> {
    let secret = Secret::generate_secret();
    let secret_bytes = secret
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret bytes: {e}")))?;

    let totp = build(&secret_bytes, issuer, account)?;

    Ok(Enrollment {
        base32_secret: secret.to_encoded().to_string(),
        otpauth_uri: totp.get_url(),
        secret_bytes,
    })
}

/// Find the time step `code` was generated for, within the allowed skew
/// around `now_unix`. `None` means the code is wrong.
///
/// Callers compare the returned step with the last step the principal
/// used to reject replays.
pub fn matching_step(
    secret_bytes: &[u8],
    code: &str,
    now_unix: u64,
    issuer: &str,
    account: &str,
) -> Result<Option<u64>, AuthError> {
    let totp = build(secret_bytes, issuer, account)?;
    let current = now_unix / STEP_SECS;
    let first = current.saturating_sub(SKEW_STEPS);

    Ok((first..=current + SKEW_STEPS).find(|step| totp.check(code, step * STEP_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_760_000_000;

    fn secret() -> Vec<u8> {
        Secret::generate_secret().to_bytes().unwrap()
    }

    fn code_at(secret_bytes: &[u8], unix: u64) -> String {
        build(secret_bytes, "Schoolgate", "ops@platform.test")
            .unwrap()
            .generate(unix)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = [42u8; 32];
        let encrypted = encrypt_secret(&key, b"totp-secret-bytes").unwrap();
        assert_eq!(decrypt_secret(&key, &encrypted).unwrap(), b"totp-secret-bytes");
    }

    #[test]
    fn wrong_key_fails_decrypt() {
        let encrypted = encrypt_secret(&[42u8; 32], b"secret").unwrap();
        assert!(decrypt_secret(&[99u8; 32], &encrypted).is_err());
    }

    #[test]
    fn enrollment_produces_valid_uri() {
        let enrollment = generate_enrollment("Schoolgate", "ops@platform.test").unwrap();
        assert!(!enrollment.base32_secret.is_empty());
        assert!(enrollment.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(enrollment.otpauth_uri.contains("Schoolgate"));
    }

    #[test]
    fn current_code_matches_current_step() {
        let s = secret();
        let code = code_at(&s, NOW);
        let step = matching_step(&s, &code, NOW, "Schoolgate", "ops@platform.test").unwrap();
        assert_eq!(step, Some(NOW / STEP_SECS));
    }

    #[test]
    fn previous_step_is_within_skew() {
        let s = secret();
        let code = code_at(&s, NOW - STEP_SECS);
        let step = matching_step(&s, &code, NOW, "Schoolgate", "ops@platform.test").unwrap();
        assert_eq!(step, Some(NOW / STEP_SECS - 1));
    }

    #[test]
    fn stale_code_is_rejected() {
        let s = secret();
        let code = code_at(&s, NOW - 5 * STEP_SECS);
        let step = matching_step(&s, &code, NOW, "Schoolgate", "ops@platform.test").unwrap();
        assert_eq!(step, None);
    }

    #[test]
    fn wrong_code_is_rejected() {
        let s = secret();
        let wrong = if code_at(&s, NOW) == "000000" { "111111" } else { "000000" };
        assert_eq!(
            matching_step(&s, wrong, NOW, "Schoolgate", "ops@platform.test").unwrap(),
            None
        );
    }
}
