//! Ephemeral MFA challenge state.
//!
//! A challenge is created after password verification for principals that
//! need step-up, and consumed by the first correct one-time code. Entries
//! are keyed by the SHA-256 hash of the challenge token; the raw token only
//! ever exists on the client.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schoolgate_core::models::principal::PrincipalId;
use tokio::sync::Mutex;

use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct MfaChallenge {
    pub principal_id: PrincipalId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    challenges: HashMap<String, MfaChallenge>,
    /// Highest TOTP step each principal has successfully used.
    last_steps: HashMap<PrincipalId, u64>,
}

/// In-process store for pending MFA challenges.
#[derive(Debug, Default)]
pub struct ChallengeStore {
    state: Mutex<State>,
}

impl ChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending challenge. Expired entries are purged on the
    /// way in.
    pub async fn insert(&self, token_hash: String, challenge: MfaChallenge) {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        state.challenges.retain(|_, c| c.expires_at > now);
        state.challenges.insert(token_hash, challenge);
    }

    /// Look up a pending challenge without consuming it. An expired
    /// challenge is removed and reported as such.
    pub async fn pending(&self, token_hash: &str) -> Result<MfaChallenge, AuthError> {
        let mut state = self.state.lock().await;
        let challenge = state
            .challenges
            .get(token_hash)
            .cloned()
            .ok_or(AuthError::MfaChallengeInvalid)?;

        if challenge.expires_at <= Utc::now() {
            state.challenges.remove(token_hash);
            return Err(AuthError::MfaChallengeExpired);
        }
        Ok(challenge)
    }

    /// Consume a challenge after a correct code for `step`.
    ///
    /// Fails if the challenge was consumed concurrently, or if the
    /// principal already used this step (or a later one).
    pub async fn complete(&self, token_hash: &str, step: u64) -> Result<PrincipalId, AuthError> {
        let mut state = self.state.lock().await;
        let challenge = state
            .challenges
            .get(token_hash)
            .cloned()
            .ok_or(AuthError::MfaChallengeInvalid)?;

        if challenge.expires_at <= Utc::now() {
            state.challenges.remove(token_hash);
            return Err(AuthError::MfaChallengeExpired);
        }
        if !Self::step_is_fresh(&state, challenge.principal_id, step) {
            return Err(AuthError::MfaInvalidCode);
        }

        state.challenges.remove(token_hash);
        state.last_steps.insert(challenge.principal_id, step);
        Ok(challenge.principal_id)
    }

    /// Record a step used outside a login challenge (enrollment
    /// confirmation). Returns `false` if the step was already used.
    pub async fn use_step(&self, principal_id: PrincipalId, step: u64) -> bool {
        let mut state = self.state.lock().await;
        if !Self::step_is_fresh(&state, principal_id, step) {
            return false;
        }
        state.last_steps.insert(principal_id, step);
        true
    }

    fn step_is_fresh(state: &State, principal_id: PrincipalId, step: u64) -> bool {
        state
            .last_steps
            .get(&principal_id)
            .is_none_or(|last| step > *last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn challenge(secs: i64) -> MfaChallenge {
        MfaChallenge {
            principal_id: PrincipalId(1),
            expires_at: Utc::now() + Duration::seconds(secs),
        }
    }

    #[tokio::test]
    async fn challenge_is_single_use() {
        let store = ChallengeStore::new();
        store.insert("h".into(), challenge(60)).await;

        assert_eq!(store.complete("h", 10).await.unwrap(), PrincipalId(1));
        assert!(matches!(
            store.complete("h", 11).await,
            Err(AuthError::MfaChallengeInvalid)
        ));
    }

    #[tokio::test]
    async fn expired_challenge_is_removed() {
        let store = ChallengeStore::new();
        store.insert("h".into(), challenge(-1)).await;

        assert!(matches!(
            store.pending("h").await,
            Err(AuthError::MfaChallengeExpired)
        ));
        assert!(matches!(
            store.pending("h").await,
            Err(AuthError::MfaChallengeInvalid)
        ));
    }

    #[tokio::test]
    async fn reused_step_is_rejected_across_challenges() {
        let store = ChallengeStore::new();
        store.insert("a".into(), challenge(60)).await;
        store.insert("b".into(), challenge(60)).await;

        store.complete("a", 10).await.unwrap();
        assert!(matches!(
            store.complete("b", 10).await,
            Err(AuthError::MfaInvalidCode)
        ));
        // The challenge survives a rejected code.
        assert!(store.pending("b").await.is_ok());
        assert!(store.complete("b", 11).await.is_ok());
    }

    #[tokio::test]
    async fn use_step_is_monotonic() {
        let store = ChallengeStore::new();
        assert!(store.use_step(PrincipalId(1), 5).await);
        assert!(!store.use_step(PrincipalId(1), 5).await);
        assert!(!store.use_step(PrincipalId(1), 4).await);
        assert!(store.use_step(PrincipalId(2), 5).await);
    }
}
