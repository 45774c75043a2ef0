use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{WebConfig, WebSettings};
use crate::oauth::AuthClient;
use crate::session::SessionAccessor;
use crate::spending::SpendingClient;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub(super) client: Arc<AuthClient>,
    pub(super) spending: Arc<SpendingClient>,
    pub(super) sessions: SessionAccessor,
    pub(super) settings: Arc<WebSettings>,
}

impl AppState {
    #[must_use]
    pub fn new(config: WebConfig) -> Self {
        Self {
            client: Arc::new(config.client),
            spending: Arc::new(config.spending),
            sessions: SessionAccessor::new(Arc::new(config.sessions)),
            settings: Arc::new(config.settings),
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionAccessor {
        &self.sessions
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.settings.cookie_key.clone()
    }
}
