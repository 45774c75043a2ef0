use std::time::Duration as StdDuration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use time::Duration;

use crate::session::SealedSession;

const PKCE_COOKIE_NAME: &str = "finmon.pkce";
const STATE_COOKIE_NAME: &str = "finmon.state";

/// Private PKCE verifier + state cookies for the authorization round trip.
pub(super) fn pkce_cookies(
    code_verifier: &str,
    state: &str,
    secure: bool,
    auth_path: &str,
) -> [Cookie<'static>; 2] {
    [
        (PKCE_COOKIE_NAME, code_verifier),
        (STATE_COOKIE_NAME, state),
    ]
    .map(|(name, value)| {
        Cookie::build((name, value.to_string()))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path(auth_path.to_string())
            .max_age(Duration::minutes(5))
            .build()
    })
}

/// Drop the PKCE verifier + state, whatever the callback outcome.
pub(super) fn clear_pkce_cookies(jar: PrivateCookieJar, auth_path: &str) -> PrivateCookieJar {
    [PKCE_COOKIE_NAME, STATE_COOKIE_NAME]
        .into_iter()
        .fold(jar, |jar, name| {
            jar.remove(Cookie::build(name).path(auth_path.to_string()))
        })
}

pub(super) fn get_pkce_verifier(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(PKCE_COOKIE_NAME).map(|c| c.value().to_string())
}

pub(super) fn get_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Session cookie carrying the sealed artifact.
pub(super) fn session_cookie(
    name: &str,
    sealed: SealedSession,
    ttl: StdDuration,
    secure: bool,
) -> Cookie<'static> {
    let max_age = Duration::try_from(ttl).unwrap_or(Duration::days(30));
    Cookie::build((name.to_string(), String::from(sealed)))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Tell the browser to discard the session artifact.
pub(super) fn clear_session_cookie(jar: CookieJar, name: &str) -> CookieJar {
    jar.remove(Cookie::build(name.to_string()).path("/"))
}

pub(super) fn get_session(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|c| c.value().to_string())
}
