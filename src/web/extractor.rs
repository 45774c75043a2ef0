use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use super::cookies;
use super::state::AppState;
use crate::session::SessionState;

/// Session state of the current request, resolved through the
/// [`SessionAccessor`](crate::session::SessionAccessor).
///
/// Never rejects: a missing or unverifiable cookie is
/// [`SessionState::Unauthenticated`].
///
/// ```rust,ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     match session.access_token() {
///         Some(_) => "signed in",
///         None => "signed out",
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionState);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let raw = cookies::get_session(&jar, &state.settings.session_cookie_name);
        Ok(Self(state.sessions.resolve(raw.as_deref())))
    }
}
