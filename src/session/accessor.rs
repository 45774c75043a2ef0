use std::sync::Arc;

use super::{IdentityClaims, SessionArtifact, SessionStore};

/// What a caller may do with the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Verification still in flight; hold rendering and API calls.
    Loading,
    /// No valid artifact; show sign-in, never call the spending API.
    Unauthenticated,
    /// Verified artifact without an access token; offer re-authentication
    /// instead of retrying.
    AuthenticatedWithoutToken(IdentityClaims),
    /// Verified artifact with an access token.
    Authenticated(SessionArtifact),
}

impl SessionState {
    /// Classify a verified artifact.
    #[must_use]
    pub fn from_artifact(artifact: SessionArtifact) -> Self {
        if artifact.tokens.has_access_token() {
            Self::Authenticated(artifact)
        } else {
            Self::AuthenticatedWithoutToken(artifact.identity)
        }
    }

    /// Access token, only when fully authenticated.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Authenticated(artifact) => Some(artifact.access_token()),
            _ => None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&IdentityClaims> {
        match self {
            Self::Authenticated(artifact) => Some(&artifact.identity),
            Self::AuthenticatedWithoutToken(identity) => Some(identity),
            Self::Loading | Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Single entry point for obtaining the current session.
///
/// Handed to every component that needs auth; nobody opens raw artifacts
/// themselves.
#[derive(Clone)]
pub struct SessionAccessor {
    store: Arc<SessionStore>,
}

impl SessionAccessor {
    #[must_use]
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Resolve the raw artifact (if the client sent one) to a state.
    #[must_use]
    pub fn resolve(&self, raw: Option<&str>) -> SessionState {
        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            return SessionState::Unauthenticated;
        };
        match self.store.read(raw) {
            Ok(artifact) => SessionState::from_artifact(artifact),
            Err(reason) => {
                tracing::debug!(%reason, "Session artifact rejected");
                SessionState::Unauthenticated
            }
        }
    }
}

/// Tells the client to discard its session artifact.
///
/// Invoked on explicit sign-out and when the spending API answers 401.
pub trait SessionInvalidator {
    fn invalidate(&self);
}
