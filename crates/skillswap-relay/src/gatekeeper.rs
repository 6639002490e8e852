//! Connection admission.
//!
//! Runs once per new connection before the WebSocket upgrade completes.
//! The check order is fixed: credential presence, revocation, cryptographic
//! validity, identity existence, blocked flag.  A rejection is terminal for
//! the attempt; the client must reconnect with a fresh credential.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use skillswap_shared::{Identity, UserId};

/// Why a connection attempt was turned away.
///
/// The variant name doubles as the structured reason string surfaced to the
/// client before the transport is closed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdmitError {
    #[error("No credential supplied")]
    NoCredential,

    #[error("Credential has been revoked")]
    CredentialRevoked,

    #[error("Credential is invalid or expired")]
    CredentialInvalid,

    #[error("No account matches this credential")]
    IdentityNotFound,

    #[error("Account is blocked by an administrator")]
    IdentityBlocked,
}

impl AdmitError {
    /// Stable machine-readable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmitError::NoCredential => "NoCredential",
            AdmitError::CredentialRevoked => "CredentialRevoked",
            AdmitError::CredentialInvalid => "CredentialInvalid",
            AdmitError::IdentityNotFound => "IdentityNotFound",
            AdmitError::IdentityBlocked => "IdentityBlocked",
        }
    }
}

/// Bearer token claims.  The subject is the user identifier.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

// ---------------------------------------------------------------------------
// Identity collaborators
// ---------------------------------------------------------------------------

/// In-process view of the user store.
///
/// The relay does not own user records; the surrounding domain logic feeds
/// this directory (and flips blocked flags) as accounts change.  Lookups
/// during admission only see what has been pushed here.
#[derive(Clone, Default)]
pub struct UserDirectory {
    users: Arc<RwLock<HashMap<UserId, Identity>>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, identity: Identity) {
        self.users.write().await.insert(identity.id.clone(), identity);
    }

    pub async fn remove(&self, id: &UserId) {
        self.users.write().await.remove(id);
    }

    pub async fn set_blocked(&self, id: &UserId, blocked: bool) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(id) {
            Some(identity) => {
                identity.blocked = blocked;
                true
            }
            None => false,
        }
    }

    pub async fn find(&self, id: &UserId) -> Option<Identity> {
        self.users.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

/// Revoked bearer credentials, with their original expiry so the set can be
/// purged once tokens would have lapsed anyway.
#[derive(Clone, Default)]
pub struct RevocationList {
    revoked: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl RevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revoke a raw credential string (logout, forced sign-out).
    pub async fn revoke(&self, credential: impl Into<String>, expires_at: DateTime<Utc>) {
        self.revoked.write().await.insert(credential.into(), expires_at);
    }

    pub async fn is_revoked(&self, credential: &str) -> bool {
        self.revoked.read().await.contains_key(credential)
    }

    /// Drop entries whose token lifetime has elapsed.
    pub async fn purge_expired(&self) {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        let now = Utc::now();
        revoked.retain(|_, expires_at| *expires_at > now);
        let removed = before - revoked.len();
        if removed > 0 {
            debug!(removed, "Purged expired revocation entries");
        }
    }
}

// ---------------------------------------------------------------------------
// Gatekeeper
// ---------------------------------------------------------------------------

/// Validates bearer credentials and resolves them to identities.
#[derive(Clone)]
pub struct Gatekeeper {
    decoding_key: DecodingKey,
    validation: Validation,
    directory: UserDirectory,
    revocations: RevocationList,
}

impl Gatekeeper {
    pub fn new(secret: &str, directory: UserDirectory, revocations: RevocationList) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            directory,
            revocations,
        }
    }

    /// Run the full admission sequence for one connection attempt.
    ///
    /// Returns the resolved identity to attach to the connection, or the
    /// first rejection reason hit.
    pub async fn admit(&self, credential: Option<&str>) -> Result<Identity, AdmitError> {
        let Some(token) = credential.filter(|t| !t.is_empty()) else {
            return Err(AdmitError::NoCredential);
        };

        if self.revocations.is_revoked(token).await {
            debug!("admission refused: revoked credential");
            return Err(AdmitError::CredentialRevoked);
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "admission refused: credential failed validation");
                AdmitError::CredentialInvalid
            })?
            .claims;

        let user_id = UserId::new(claims.sub);
        let identity = self
            .directory
            .find(&user_id)
            .await
            .ok_or(AdmitError::IdentityNotFound)?;

        if identity.blocked {
            info!(user = %identity.id.short(), "admission refused: blocked account");
            return Err(AdmitError::IdentityBlocked);
        }

        Ok(identity)
    }
}
