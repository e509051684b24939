//! # In-Memory Store
//!
//! `MemStore` is the reference implementation of the store contracts, used
//! by the integration tests and the demo server. All mutations take a
//! single write guard, which is what makes `try_consume` and lazy issuer-key
//! creation atomic: two concurrent redemptions of the same code serialize on
//! the guard and only the first observes `used = false`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::entity::{
    AuthorizationCode, Challenge, IssuanceSession, IssuedCredential, IssuerKey, SessionStatus,
    VerificationSession, VerificationStatus, VerifiedCredential,
};
use crate::provider::{
    AuthorizationCodeStore, ChallengeStore, IssuanceSessionStore, IssuedCredentialStore,
    IssuerKeyStore, Policy, VerificationSessionStore, VerifiedCredentialStore,
};

#[derive(Default)]
struct Inner {
    challenges: HashMap<String, Challenge>,
    codes: HashMap<String, AuthorizationCode>,
    sessions: HashMap<String, IssuanceSession>,
    issued: Vec<IssuedCredential>,
    keys: Vec<IssuerKey>,
    verifications: HashMap<String, VerificationSession>,
    verified: Vec<VerifiedCredential>,
}

/// In-memory artifact store.
#[derive(Clone, Default)]
pub struct MemStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChallengeStore for MemStore {
    async fn create_challenge(&self, challenge: Challenge) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.challenges.insert(challenge.value.clone(), challenge);
        Ok(())
    }

    async fn get_valid_challenge(&self, value: &str) -> Result<Option<Challenge>> {
        let inner = self.inner.read().await;
        Ok(inner
            .challenges
            .get(value)
            .filter(|c| !c.used && c.expires_at > Utc::now())
            .cloned())
    }

    async fn try_consume_challenge(&self, value: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(challenge) = inner.challenges.get_mut(value) else {
            return Ok(false);
        };
        if challenge.used || challenge.expires_at <= Utc::now() {
            return Ok(false);
        }
        challenge.used = true;
        Ok(true)
    }

    async fn delete_expired_challenges(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        inner.challenges.retain(|_, c| c.expires_at > now);
        Ok(())
    }
}

impl AuthorizationCodeStore for MemStore {
    async fn create_code(&self, code: AuthorizationCode) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.codes.insert(code.code.clone(), code);
        Ok(())
    }

    async fn get_valid_code(&self, code: &str) -> Result<Option<AuthorizationCode>> {
        let inner = self.inner.read().await;
        Ok(inner.codes.get(code).filter(|c| !c.used && c.expires_at > Utc::now()).cloned())
    }

    async fn try_consume_code(&self, code: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.codes.get_mut(code) else {
            return Ok(false);
        };
        if row.used || row.expires_at <= Utc::now() {
            return Ok(false);
        }
        row.used = true;
        Ok(true)
    }
}

impl IssuanceSessionStore for MemStore {
    async fn create_session(&self, session: IssuanceSession) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_session_by_token(&self, access_token: &str) -> Result<Option<IssuanceSession>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .find(|s| {
                s.access_token == access_token
                    && matches!(
                        s.status,
                        SessionStatus::Authorized | SessionStatus::CredentialIssued
                    )
            })
            .cloned())
    }

    async fn update_session(
        &self, id: &str, status: SessionStatus, c_nonce: Option<String>,
        c_nonce_expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.sessions.get_mut(id) {
            session.status = status;
            if c_nonce.is_some() {
                session.c_nonce = c_nonce;
                session.c_nonce_expires_at = c_nonce_expires_at;
            }
        }
        Ok(())
    }
}

impl IssuedCredentialStore for MemStore {
    async fn create_issued(&self, credential: IssuedCredential) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.issued.push(credential);
        Ok(())
    }
}

impl IssuerKeyStore for MemStore {
    async fn create_key(&self, key: IssuerKey) -> Result<IssuerKey> {
        let mut inner = self.inner.write().await;
        // first writer wins: a concurrent lazy-provisioning race resolves to
        // the key that reached the store first
        if let Some(active) = inner.keys.iter().find(|k| k.is_active) {
            return Ok(active.clone());
        }
        inner.keys.push(key.clone());
        Ok(key)
    }

    async fn get_active_key(&self) -> Result<Option<IssuerKey>> {
        let inner = self.inner.read().await;
        Ok(inner
            .keys
            .iter()
            .filter(|k| k.is_active)
            .max_by_key(|k| k.created_at)
            .cloned())
    }

    async fn get_key_by_key_id(&self, key_id: &str) -> Result<Option<IssuerKey>> {
        let inner = self.inner.read().await;
        Ok(inner.keys.iter().find(|k| k.key_id == key_id).cloned())
    }

    async fn get_key_by_issuer_did(&self, did: &str) -> Result<Option<IssuerKey>> {
        let inner = self.inner.read().await;
        Ok(inner.keys.iter().find(|k| k.issuer_did == did).cloned())
    }
}

impl VerificationSessionStore for MemStore {
    async fn create_verification(&self, session: VerificationSession) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.verifications.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get_verification(&self, id: &str) -> Result<Option<VerificationSession>> {
        let inner = self.inner.read().await;
        Ok(inner.verifications.get(id).cloned())
    }

    async fn get_verification_by_challenge(
        &self, challenge_id: &str,
    ) -> Result<Option<VerificationSession>> {
        let inner = self.inner.read().await;
        Ok(inner.verifications.values().find(|s| s.challenge_id == challenge_id).cloned())
    }

    async fn update_verification(
        &self, id: &str, status: VerificationStatus, data: Option<Value>, error: Option<String>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.verifications.get_mut(id) {
            // a session transitions out of Pending exactly once
            if session.status != VerificationStatus::Pending {
                return Ok(());
            }
            session.status = status;
            if data.is_some() {
                session.presentation_data = data;
            }
            session.error = error;
            if status == VerificationStatus::Verified {
                session.verified_at = Some(Utc::now());
            }
            session.updated_at = Utc::now();
        }
        Ok(())
    }
}

impl VerifiedCredentialStore for MemStore {
    async fn create_verified(&self, credential: VerifiedCredential) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.verified.push(credential);
        Ok(())
    }

    async fn get_verified_by_id(&self, id: &str) -> Result<Option<VerifiedCredential>> {
        let inner = self.inner.read().await;
        Ok(inner.verified.iter().find(|v| v.id == id).cloned())
    }

    async fn get_verified_by_session(&self, session_id: &str) -> Result<Vec<VerifiedCredential>> {
        let inner = self.inner.read().await;
        Ok(inner.verified.iter().filter(|v| v.session_id == session_id).cloned().collect())
    }
}

impl Policy for MemStore {
    // demo/test provider: accept presentations from issuers without a
    // registered key (a warning is logged at the verification layer)
    fn allow_unknown_issuer(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn challenge(value: &str, ttl_secs: i64) -> Challenge {
        Challenge {
            id: uuid::Uuid::new_v4().to_string(),
            value: value.to_string(),
            expires_at: Utc::now() + TimeDelta::try_seconds(ttl_secs).unwrap_or_default(),
            created_at: Utc::now(),
            used: false,
        }
    }

    // A consumed challenge must never validate again, even before expiry.
    #[tokio::test]
    async fn challenge_single_use() {
        let store = MemStore::new();
        store.create_challenge(challenge("abc", 300)).await.unwrap();

        assert!(store.get_valid_challenge("abc").await.unwrap().is_some());
        assert!(store.try_consume_challenge("abc").await.unwrap());
        assert!(!store.try_consume_challenge("abc").await.unwrap());
        assert!(store.get_valid_challenge("abc").await.unwrap().is_none());
    }

    // An expired challenge is invisible to both lookup and consumption.
    #[tokio::test]
    async fn challenge_expiry() {
        let store = MemStore::new();
        store.create_challenge(challenge("stale", -1)).await.unwrap();

        assert!(store.get_valid_challenge("stale").await.unwrap().is_none());
        assert!(!store.try_consume_challenge("stale").await.unwrap());

        store.delete_expired_challenges().await.unwrap();
        assert!(store.inner.read().await.challenges.is_empty());
    }

    #[tokio::test]
    async fn code_single_redemption() {
        let store = MemStore::new();
        let code = AuthorizationCode {
            id: "id1".to_string(),
            code: "code1".to_string(),
            client_id: None,
            scope: Some("eu.europa.ec.eudi.pid.1".to_string()),
            code_challenge: None,
            code_challenge_method: None,
            redirect_uri: None,
            tx_code: Some("1234".to_string()),
            user_data: None,
            expires_at: Utc::now() + TimeDelta::try_minutes(10).unwrap_or_default(),
            used: false,
        };
        store.create_code(code).await.unwrap();

        assert!(store.try_consume_code("code1").await.unwrap());
        assert!(!store.try_consume_code("code1").await.unwrap());
        assert!(store.get_valid_code("code1").await.unwrap().is_none());
    }

    // The first key to reach the store wins a lazy-provisioning race.
    #[tokio::test]
    async fn active_key_idempotent() {
        let store = MemStore::new();
        let key = |key_id: &str| IssuerKey {
            id: uuid::Uuid::new_v4().to_string(),
            key_id: key_id.to_string(),
            issuer_did: "did:web:localhost".to_string(),
            key_type: "EC".to_string(),
            algorithm: "ES256".to_string(),
            public_jwk: String::new(),
            private_jwk: String::new(),
            is_active: true,
            created_at: Utc::now(),
        };

        let first = store.create_key(key("issuer-key-1")).await.unwrap();
        let second = store.create_key(key("issuer-key-2")).await.unwrap();
        assert_eq!(first.key_id, second.key_id);

        let active = store.get_active_key().await.unwrap().expect("active key");
        assert_eq!(active.key_id, "issuer-key-1");
    }

    // A verification session only leaves Pending once.
    #[tokio::test]
    async fn verification_terminal_once() {
        let store = MemStore::new();
        let session = VerificationSession {
            id: "s1".to_string(),
            challenge_id: "c1".to_string(),
            status: VerificationStatus::Pending,
            presentation_data: None,
            error: None,
            verified_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.create_verification(session).await.unwrap();

        store
            .update_verification("s1", VerificationStatus::Failed, None, Some("bad".to_string()))
            .await
            .unwrap();
        store
            .update_verification("s1", VerificationStatus::Verified, None, None)
            .await
            .unwrap();

        let session = store.get_verification("s1").await.unwrap().expect("session");
        assert_eq!(session.status, VerificationStatus::Failed);
        assert_eq!(session.error.as_deref(), Some("bad"));
    }
}
