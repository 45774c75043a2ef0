//! Axum surface for the dashboard.
//!
//! Redirect-based sign-in against the identity provider, the sealed session
//! cookie, the session JSON endpoint, and the server-rendered dashboard.
//!
//! ```rust,ignore
//! use finmon::web::{WebConfig, app};
//!
//! let config = WebConfig::from_env()?;
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! axum::serve(listener, app(config)).await?;
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod render;
mod routes;
mod state;

pub use config::{SIGN_IN_PAGE, WebConfig};
pub use error::AuthError;
pub use extractor::CurrentSession;
pub use routes::app;
pub use state::AppState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
