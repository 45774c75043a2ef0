//! Session artifact: identity claims plus the provider token pair, sealed
//! into a stateless token with a server-held secret.
//!
//! The artifact only changes at two points: [`SessionStore::mint`] after a
//! successful identity exchange, and sign-out (the client discards it).

mod accessor;
mod store;

use serde::{Deserialize, Serialize};

use crate::types::Subject;

pub use accessor::{SessionAccessor, SessionInvalidator, SessionState};
pub use store::{DEFAULT_SESSION_TTL, SealedSession, SessionInvalid, SessionStore};

/// Identity claims produced by the identity exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    /// Provider subject. Trust anchor, stable for the account.
    pub sub: Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Provider-specific account id, when the exchange supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_user_id: Option<String>,
}

impl IdentityClaims {
    #[must_use]
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: Subject(sub.into()),
            name: None,
            email: None,
            provider_user_id: None,
        }
    }

    /// Id used to identify the user in the UI and API calls.
    ///
    /// Prefers the provider user id over `sub`. Never used for trust decisions.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.provider_user_id
            .as_deref()
            .unwrap_or_else(|| self.sub.as_str())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("User")
    }

    /// Fill fields the fresh exchange left empty from an earlier sign-in of
    /// the same subject.
    pub(crate) fn fold_from(&mut self, previous: &IdentityClaims) {
        if self.sub != previous.sub {
            return;
        }
        if self.name.is_none() {
            self.name.clone_from(&previous.name);
        }
        if self.email.is_none() {
            self.email.clone_from(&previous.email);
        }
        if self.provider_user_id.is_none() {
            self.provider_user_id.clone_from(&previous.provider_user_id);
        }
    }
}

/// Provider access/refresh token pair.
///
/// `Debug` never prints token material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Provider access token expiry, epoch seconds.
    expires_at: i64,
}

impl TokenPair {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    #[must_use]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Whether the provider token is past its expiry at `now`.
    ///
    /// Informational only: expiry is acted on when the spending API answers 401.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &redact(&self.access_token))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<empty>" } else { "<redacted>" }
}

/// The unit sealed into the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionArtifact {
    pub identity: IdentityClaims,
    pub tokens: TokenPair,
}

impl SessionArtifact {
    #[must_use]
    pub fn new(identity: IdentityClaims, tokens: TokenPair) -> Self {
        Self { identity, tokens }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        self.tokens.access_token()
    }
}
