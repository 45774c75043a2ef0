use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Json;
use axum_extra::extract::{CookieJar, PrivateCookieJar};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::config::{SIGN_IN_PAGE, WebConfig};
use super::cookies;
use super::error::AuthError;
use super::extractor::CurrentSession;
use super::render;
use super::state::AppState;
use crate::dashboard::Dashboard;
use crate::oauth::SignIn;
use crate::session::{SessionArtifact, SessionInvalidator, SessionState};
use crate::types::FilterTab;

/// Build the full application router.
pub fn app(config: WebConfig) -> Router {
    router(AppState::new(config))
}

fn router(state: AppState) -> Router {
    let auth_path = state.settings.auth_path.clone();

    Router::new()
        .route("/", get(dashboard))
        .route("/refresh", post(refresh))
        .route(SIGN_IN_PAGE, get(sign_in_page))
        .route(&format!("{auth_path}/signin/google"), get(login))
        .route(&format!("{auth_path}/callback/google"), get(callback))
        .route(
            &format!("{auth_path}/signout"),
            get(sign_out).post(sign_out),
        )
        .route(&format!("{auth_path}/session"), get(session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Sign-in ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SignInPageParams {
    error: Option<String>,
}

async fn sign_in_page(
    State(state): State<AppState>,
    Query(params): Query<SignInPageParams>,
) -> Html<String> {
    Html(render::sign_in(
        &state.settings.auth_path,
        params.error.as_deref(),
    ))
}

async fn login(State(state): State<AppState>, jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    let auth_req = state.client.authorization_url();

    let [pkce_cookie, state_cookie] = cookies::pkce_cookies(
        &auth_req.code_verifier,
        &auth_req.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    (jar.add(pkce_cookie).add(state_cookie), Redirect::to(&auth_req.url))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    session_jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let outcome = exchange(&state, &jar, params).await;
    let jar = cookies::clear_pkce_cookies(jar, &state.settings.auth_path);

    let sign_in = match outcome {
        Ok(sign_in) => sign_in,
        Err(e) => return (jar, e).into_response(),
    };

    // Fold from the artifact this browser already holds, if it still verifies.
    let previous: Option<SessionArtifact> =
        cookies::get_session(&session_jar, &state.settings.session_cookie_name)
            .and_then(|raw| state.sessions.store().read(&raw).ok());

    let artifact = SessionArtifact::new(sign_in.identity, sign_in.tokens);
    let sealed = match state.sessions.store().mint(artifact, previous.as_ref()) {
        Ok(sealed) => sealed,
        Err(e) => {
            tracing::error!(error = %e, "Session minting failed");
            return (jar, AuthError::OAuth("session_failed".into())).into_response();
        }
    };

    let session_cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        sealed,
        state.settings.session_ttl,
        state.settings.secure_cookies,
    );

    tracing::info!("OAuth2 sign-in successful");

    (
        jar,
        session_jar.add(session_cookie),
        Redirect::to(&state.settings.login_redirect),
    )
        .into_response()
}

/// Validate the callback and run the identity exchange.
async fn exchange(
    state: &AppState,
    jar: &PrivateCookieJar,
    params: CallbackParams,
) -> Result<SignIn, AuthError> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
        return Err(AuthError::OAuth(error.clone()));
    }

    let code = params
        .code
        .ok_or_else(|| AuthError::OAuth("missing_code".into()))?;

    let received_state = params
        .state
        .ok_or_else(|| AuthError::OAuth("state_mismatch".into()))?;
    let stored_state =
        cookies::get_state(jar).ok_or_else(|| AuthError::OAuth("state_mismatch".into()))?;
    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err(AuthError::OAuth("state_mismatch".into()));
    }

    let code_verifier = cookies::get_pkce_verifier(jar)
        .ok_or_else(|| AuthError::OAuth("missing_verifier".into()))?;

    let token_response = state
        .client
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            AuthError::OAuth("token_exchange_failed".into())
        })?;

    let user_info = state
        .client
        .get_user_info(&token_response.access_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Userinfo request failed");
            AuthError::OAuth("userinfo_failed".into())
        })?;

    Ok(SignIn {
        identity: user_info.into_claims(),
        tokens: token_response.into_token_pair(now()),
    })
}

fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// ── Sign-out ───────────────────────────────────────────────────────

async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    invalidate(&state, jar)
}

/// Discard the session artifact and send the browser back to the root.
fn invalidate(state: &AppState, jar: CookieJar) -> (CookieJar, Redirect) {
    (
        cookies::clear_session_cookie(jar, &state.settings.session_cookie_name),
        Redirect::to(&state.settings.logout_redirect),
    )
}

/// Records an invalidation request from the dashboard so the handler can
/// answer with a sign-out response.
#[derive(Default)]
struct InvalidationFlag(AtomicBool);

impl SessionInvalidator for InvalidationFlag {
    fn invalidate(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl InvalidationFlag {
    fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Session JSON ───────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionUser<'a> {
    id: &'a str,
    name: Option<&'a str>,
    email: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    user: SessionUser<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

async fn session(CurrentSession(session): CurrentSession) -> Response {
    let Some(identity) = session.identity() else {
        return Json(serde_json::json!({})).into_response();
    };
    let tokens = match &session {
        SessionState::Authenticated(artifact) => Some(&artifact.tokens),
        _ => None,
    };
    let body = SessionBody {
        user: SessionUser {
            id: identity.user_id(),
            name: identity.name.as_deref(),
            email: identity.email.as_deref(),
        },
        access_token: tokens.map(|t| t.access_token()),
        refresh_token: tokens.and_then(|t| t.refresh_token()),
        expires_at: tokens.map(|t| t.expires_at()),
    };
    Json(body).into_response()
}

// ── Dashboard ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TabParams {
    tab: Option<String>,
}

impl TabParams {
    fn tab(&self) -> FilterTab {
        self.tab
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }
}

async fn dashboard(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
    Query(params): Query<TabParams>,
) -> Response {
    let tab = params.tab();
    let mut dash = Dashboard::new().with_session(session);
    let flag = InvalidationFlag::default();

    dash.show_tab(tab, state.spending.as_ref(), &flag).await;

    if flag.is_set() {
        tracing::info!("Spending API rejected the session; signing out");
        return invalidate(&state, jar).into_response();
    }
    Html(render::dashboard(&dash.view(), tab, &state.settings.auth_path)).into_response()
}

async fn refresh(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
    Query(params): Query<TabParams>,
) -> Result<Response, AuthError> {
    if !session.is_authenticated() {
        return Err(AuthError::Unauthenticated);
    }

    let tab = params.tab();
    let mut dash = Dashboard::new().with_session(session).with_tab(tab);
    let flag = InvalidationFlag::default();

    dash.refresh(state.spending.as_ref(), &flag).await;

    if flag.is_set() {
        tracing::info!("Spending API rejected the session; signing out");
        return Ok(invalidate(&state, jar).into_response());
    }
    Ok(Html(render::dashboard(&dash.view(), tab, &state.settings.auth_path)).into_response())
}
