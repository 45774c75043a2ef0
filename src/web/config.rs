use std::net::SocketAddr;
use std::time::Duration;

use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use url::Url;

use super::error::AuthError;
use crate::oauth::{AuthClient, OAuthConfig};
use crate::session::{DEFAULT_SESSION_TTL, SessionStore};
use crate::spending::SpendingClient;

/// Sign-in landing page; failed sign-ins come back here with `?error=`.
pub const SIGN_IN_PAGE: &str = "/auth/signin";

const DEFAULT_AUTH_PATH: &str = "/api/auth";
const COOKIE_KEY_CONTEXT: &[u8] = b"finmon cookie key v1\0";

/// Settings shared by config and runtime state.
#[derive(Clone)]
pub(crate) struct WebSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
}

impl WebSettings {
    fn defaults(cookie_key: Key) -> Self {
        Self {
            cookie_key,
            session_cookie_name: "finmon.session-token".into(),
            session_ttl: DEFAULT_SESSION_TTL,
            secure_cookies: true,
            auth_path: DEFAULT_AUTH_PATH.into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
        }
    }
}

/// Everything the server needs.
///
/// The provider client, the spending client and the session secret are
/// required constructor parameters; the rest has defaults with `with_*`
/// overrides. [`from_env()`](WebConfig::from_env) covers the usual setup.
pub struct WebConfig {
    pub(super) client: AuthClient,
    pub(super) spending: SpendingClient,
    pub(super) sessions: SessionStore,
    pub(super) settings: WebSettings,
    pub(super) bind_addr: SocketAddr,
}

impl WebConfig {
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the session secret is empty.
    pub fn new(
        client: AuthClient,
        spending: SpendingClient,
        session_secret: &str,
    ) -> Result<Self, AuthError> {
        let sessions = SessionStore::from_secret(session_secret)
            .map_err(|e| AuthError::Config(e.to_string()))?;
        Ok(Self {
            client,
            spending,
            sessions,
            settings: WebSettings::defaults(derive_cookie_key(session_secret)),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        })
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`: provider credentials
    /// - `SESSION_SECRET` (or `NEXTAUTH_SECRET`): session-signing secret
    /// - `API_BASE_URL` (or `NEXT_PUBLIC_API_BASE_URL`): spending API root
    ///
    /// # Optional env vars
    /// - `PUBLIC_URL`: externally visible origin (default `http://localhost:3000`)
    /// - `BIND_ADDR`: listen address (default `0.0.0.0:3000`)
    /// - `OAUTH_AUTH_URL`, `OAUTH_TOKEN_URL`, `OAUTH_USERINFO_URL`: provider endpoint overrides
    /// - `DEV_AUTH`: `"1"` or `"true"` drops the `Secure` cookie flag for plain-HTTP development
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if a required var is missing or a URL is invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AuthError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| var(name))
                .ok_or_else(|| AuthError::Config(format!("{} is required", names[0])))
        };
        let url = |name: &str, value: &str| {
            Url::parse(value).map_err(|e| AuthError::Config(format!("{name}: {e}")))
        };

        let client_id = required(&["GOOGLE_CLIENT_ID"])?;
        let client_secret = required(&["GOOGLE_CLIENT_SECRET"])?;
        let session_secret = required(&["SESSION_SECRET", "NEXTAUTH_SECRET"])?;
        let api_base = required(&["API_BASE_URL", "NEXT_PUBLIC_API_BASE_URL"])?;
        let api_base = url("API_BASE_URL", &api_base)?;

        let public_url = var("PUBLIC_URL").unwrap_or_else(|| "http://localhost:3000".into());
        let public_url = url("PUBLIC_URL", &public_url)?;

        let redirect_uri = public_url
            .join(&format!("{DEFAULT_AUTH_PATH}/callback/google"))
            .map_err(|e| AuthError::Config(format!("PUBLIC_URL: {e}")))?;

        let mut oauth = OAuthConfig::new(client_id, client_secret, redirect_uri);
        if let Some(v) = var("OAUTH_AUTH_URL") {
            oauth = oauth.with_auth_url(url("OAUTH_AUTH_URL", &v)?);
        }
        if let Some(v) = var("OAUTH_TOKEN_URL") {
            oauth = oauth.with_token_url(url("OAUTH_TOKEN_URL", &v)?);
        }
        if let Some(v) = var("OAUTH_USERINFO_URL") {
            oauth = oauth.with_userinfo_url(url("OAUTH_USERINFO_URL", &v)?);
        }

        let bind_addr = match var("BIND_ADDR") {
            Some(v) => v
                .parse()
                .map_err(|e| AuthError::Config(format!("BIND_ADDR: {e}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let dev_auth = matches!(var("DEV_AUTH").as_deref(), Some("1") | Some("true"));

        Ok(Self::new(
            AuthClient::new(oauth),
            SpendingClient::new(api_base),
            &session_secret,
        )?
        .with_secure_cookies(!dev_auth)
        .with_bind_addr(bind_addr))
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    /// Lifetime of both the sealed artifact and its cookie.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_ttl = ttl;
        self.sessions = self.sessions.with_ttl(ttl);
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }
}

/// Private-cookie key derived from the session secret, so one secret
/// configures the whole deployment.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::new()
        .chain_update(COOKIE_KEY_CONTEXT)
        .chain_update(secret.as_bytes())
        .finalize();
    Key::from(digest.as_slice())
}
