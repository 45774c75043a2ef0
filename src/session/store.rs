use std::time::Duration;

use derive_more::{From, Into};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::version4::V4;
use pasetors::{Local, local};
use sha2::{Digest, Sha256};

use super::SessionArtifact;
use crate::error::Error;

const TOKEN_PREFIX: &str = "v4.local.";
const SESSION_CLAIM: &str = "session";
const KEY_CONTEXT: &[u8] = b"finmon session key v1\0";
/// Binds tokens to this purpose; a v4.local token minted elsewhere with the
/// same key still fails to open.
const IMPLICIT_ASSERTION: &[u8] = b"finmon.session";

/// Default artifact lifetime, matching the session cookie.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Sealed, tamper-evident session token as handed to the browser.
#[derive(Clone, PartialEq, Eq, From, Into)]
pub struct SealedSession(String);

impl SealedSession {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SealedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedSession(<redacted>)")
    }
}

/// Why a raw artifact was rejected. Every variant means "not trusted at all".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionInvalid {
    #[error("malformed session token")]
    Malformed,
    #[error("session token failed verification")]
    Unverified,
    #[error("session payload missing or unreadable")]
    Payload,
    #[error("session subject does not match payload")]
    SubjectMismatch,
}

/// Stateless session store: seals artifacts with a key derived from the
/// session-signing secret and opens them on every request.
pub struct SessionStore {
    key: SymmetricKey<V4>,
    ttl: Duration,
}

impl SessionStore {
    /// Derive the sealing key from the shared secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the secret is empty.
    pub fn from_secret(secret: &str) -> Result<Self, Error> {
        if secret.is_empty() {
            return Err(Error::Session("session secret must not be empty".into()));
        }
        let digest = Sha256::new()
            .chain_update(KEY_CONTEXT)
            .chain_update(secret.as_bytes())
            .finalize();
        let key = SymmetricKey::<V4>::from(digest.as_slice())
            .map_err(|e| Error::Session(e.to_string()))?;
        Ok(Self {
            key,
            ttl: DEFAULT_SESSION_TTL,
        })
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Seal a fresh artifact after a successful identity exchange.
    ///
    /// When `previous` belongs to the same subject, identity fields and the
    /// refresh token the fresh exchange did not supply are carried over.
    /// The result replaces whatever artifact the browser held before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the claims cannot be built or sealed.
    pub fn mint(
        &self,
        mut artifact: SessionArtifact,
        previous: Option<&SessionArtifact>,
    ) -> Result<SealedSession, Error> {
        if let Some(previous) = previous {
            if previous.identity.sub == artifact.identity.sub {
                artifact.identity.fold_from(&previous.identity);
                if artifact.tokens.refresh_token.is_none() {
                    artifact
                        .tokens
                        .refresh_token
                        .clone_from(&previous.tokens.refresh_token);
                }
            }
        }

        let payload =
            serde_json::to_value(&artifact).map_err(|e| Error::Session(e.to_string()))?;

        let mut claims =
            Claims::new_expires_in(&self.ttl).map_err(|e| Error::Session(e.to_string()))?;
        claims
            .subject(artifact.identity.sub.as_str())
            .map_err(|e| Error::Session(e.to_string()))?;
        claims
            .add_additional(SESSION_CLAIM, payload)
            .map_err(|e| Error::Session(e.to_string()))?;

        let token = local::encrypt(&self.key, &claims, None, Some(IMPLICIT_ASSERTION))
            .map_err(|e| Error::Session(e.to_string()))?;
        Ok(SealedSession(token))
    }

    /// Open and verify a raw artifact.
    ///
    /// Fails closed: any parse, signature, expiry or payload problem is
    /// [`SessionInvalid`], never a partially trusted artifact.
    ///
    /// # Errors
    ///
    /// See [`SessionInvalid`].
    pub fn read(&self, raw: &str) -> Result<SessionArtifact, SessionInvalid> {
        if !raw.starts_with(TOKEN_PREFIX) {
            return Err(SessionInvalid::Malformed);
        }

        let untrusted =
            UntrustedToken::<Local, V4>::try_from(raw).map_err(|_| SessionInvalid::Malformed)?;

        // ClaimsValidationRules validates exp, nbf, iat by default
        let rules = ClaimsValidationRules::new();
        let trusted = local::decrypt(&self.key, &untrusted, &rules, None, Some(IMPLICIT_ASSERTION))
            .map_err(|_| SessionInvalid::Unverified)?;

        let claims = trusted.payload_claims().ok_or(SessionInvalid::Payload)?;
        let payload = claims
            .get_claim(SESSION_CLAIM)
            .cloned()
            .ok_or(SessionInvalid::Payload)?;
        let artifact: SessionArtifact =
            serde_json::from_value(payload).map_err(|_| SessionInvalid::Payload)?;

        let sub = claims
            .get_claim("sub")
            .and_then(|v| v.as_str())
            .ok_or(SessionInvalid::Payload)?;
        if sub != artifact.identity.sub.as_str() {
            return Err(SessionInvalid::SubjectMismatch);
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::session::{IdentityClaims, TokenPair};

    fn store() -> SessionStore {
        SessionStore::from_secret("correct horse battery staple").unwrap()
    }

    fn artifact(sub: &str, access: &str, refresh: Option<&str>) -> SessionArtifact {
        let mut identity = IdentityClaims::new(sub);
        identity.name = Some("Asha".into());
        identity.provider_user_id = Some(sub.to_owned());
        SessionArtifact::new(
            identity,
            TokenPair::new(access, refresh.map(str::to_owned), 1_900_000_000),
        )
    }

    #[test]
    fn mint_then_read_round_trips() {
        let store = store();
        let original = artifact("1089", "ya29.access", Some("1//refresh"));
        let sealed = store.mint(original.clone(), None).unwrap();

        assert!(sealed.as_str().starts_with(TOKEN_PREFIX));
        assert!(!sealed.as_str().contains("ya29.access"));
        assert_eq!(store.read(sealed.as_str()).unwrap(), original);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let store = store();
        let sealed = store.mint(artifact("1089", "at", None), None).unwrap();
        let raw = sealed.as_str();

        // Flip one payload character.
        let idx = TOKEN_PREFIX.len() + 10;
        let replacement = if &raw[idx..=idx] == "A" { "B" } else { "A" };
        let tampered = format!("{}{}{}", &raw[..idx], replacement, &raw[idx + 1..]);
        assert_eq!(store.read(&tampered), Err(SessionInvalid::Unverified));

        let truncated = &raw[..raw.len() - 4];
        assert!(store.read(truncated).is_err());
    }

    #[test]
    fn other_secret_cannot_open() {
        let sealed = store().mint(artifact("1089", "at", None), None).unwrap();
        let other = SessionStore::from_secret("another secret").unwrap();
        assert_eq!(other.read(sealed.as_str()), Err(SessionInvalid::Unverified));
    }

    #[test]
    fn garbage_is_malformed() {
        let store = store();
        assert_eq!(store.read(""), Err(SessionInvalid::Malformed));
        assert_eq!(store.read("v4.public.abc"), Err(SessionInvalid::Malformed));
        assert!(store.read("v4.local.not-base64!!").is_err());
    }

    #[test]
    fn expired_artifact_is_rejected() {
        let store = store().with_ttl(Duration::from_secs(1));
        let sealed = store.mint(artifact("1089", "at", None), None).unwrap();
        std::thread::sleep(Duration::from_millis(2100));
        assert_eq!(store.read(sealed.as_str()), Err(SessionInvalid::Unverified));
    }

    #[test]
    fn mint_folds_missing_fields_for_same_subject() {
        let store = store();
        let mut previous = artifact("1089", "old-at", Some("old-rt"));
        previous.identity.email = Some("asha@example.com".into());

        let mut fresh = artifact("1089", "new-at", None);
        fresh.identity.name = None;

        let sealed = store.mint(fresh, Some(&previous)).unwrap();
        let read = store.read(sealed.as_str()).unwrap();

        assert_eq!(read.tokens.access_token(), "new-at");
        assert_eq!(read.tokens.refresh_token(), Some("old-rt"));
        assert_eq!(read.identity.name.as_deref(), Some("Asha"));
        assert_eq!(read.identity.email.as_deref(), Some("asha@example.com"));
    }

    #[test]
    fn mint_does_not_fold_across_subjects() {
        let store = store();
        let previous = artifact("someone-else", "old-at", Some("old-rt"));
        let mut fresh = artifact("1089", "new-at", None);
        fresh.identity.name = None;

        let sealed = store.mint(fresh, Some(&previous)).unwrap();
        let read = store.read(sealed.as_str()).unwrap();

        assert_eq!(read.tokens.refresh_token(), None);
        assert_eq!(read.identity.name, None);
        assert_eq!(read.identity.sub.as_str(), "1089");
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(SessionStore::from_secret("").is_err());
    }

    #[test]
    fn sealed_debug_is_redacted() {
        let sealed = store().mint(artifact("1089", "at", None), None).unwrap();
        assert_eq!(format!("{sealed:?}"), "SealedSession(<redacted>)");
    }
}
