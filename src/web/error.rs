use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use super::config::SIGN_IN_PAGE;

/// Errors surfaced by the web layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable session for an action that needs one.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Sign-in failed; the payload is the short code shown on the sign-in page.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Session could not be sealed.
    #[error("Session error: {0}")]
    Session(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => Redirect::to(SIGN_IN_PAGE).into_response(),
            Self::OAuth(ref code) => {
                let encoded = urlencoding::encode(code);
                Redirect::to(&format!("{SIGN_IN_PAGE}?error={encoded}")).into_response()
            }
            Self::Session(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Session(msg) => Self::Session(msg),
            other => Self::OAuth(other.to_string()),
        }
    }
}
