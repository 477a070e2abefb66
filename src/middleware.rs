//! Session-gating middleware.
//!
//! Runs ahead of every handler on the gated route set (`/todos*`,
//! `/login`, `/register`). Session presence is derived per request from
//! the Supabase session cookies: the access token is checked against the
//! auth provider, and an expired token is refreshed with the refresh
//! token, with the rewritten cookie pair propagated onto whichever
//! response leaves. No session state is held locally.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth;
use crate::error::AppError;
use crate::model::{AuthSession, CurrentUser};
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

// The gate redirects unauthenticated requests before the /todos
// handlers run; a missing identity past that point still answers 401
// rather than a 500 from a failed extension lookup.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Outcome of the gating decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    PassThrough,
    RedirectToLogin,
    RedirectToTodos,
}

/// The route set the gate applies to; everything else is not invoked.
fn is_gated(path: &str) -> bool {
    path == "/todos" || path.starts_with("/todos/") || path == "/login" || path == "/register"
}

/// Decision table: unauthenticated `/todos*` goes to `/login`;
/// authenticated `/login` and `/register` go to `/todos`.
pub fn gate_decision(path: &str, has_session: bool) -> GateAction {
    if (path == "/todos" || path.starts_with("/todos/")) && !has_session {
        return GateAction::RedirectToLogin;
    }
    if (path == "/login" || path == "/register") && has_session {
        return GateAction::RedirectToTodos;
    }
    GateAction::PassThrough
}

pub async fn mw_session_gate<B>(
    State(data): State<Arc<AppState>>,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let path = request.uri().path().to_string();
    if !is_gated(&path) {
        return next.run(request).await;
    }

    let access_token = cookie_value(request.headers(), ACCESS_TOKEN_COOKIE);
    let refresh_token = cookie_value(request.headers(), REFRESH_TOKEN_COOKIE);

    let mut current: Option<CurrentUser> = None;
    let mut refreshed: Option<AuthSession> = None;

    if let Some(token) = access_token.as_deref() {
        match auth::get_current_user(&data.supabase, Some(token)).await {
            Ok(Some(user)) => {
                current = Some(CurrentUser {
                    id: user.id,
                    email: user.email,
                    access_token: token.to_string(),
                });
            }
            Ok(None) => {}
            // A backend outage must not lock users into a redirect loop
            // on /login, so an errored lookup counts as no session.
            Err(err) => tracing::warn!("session lookup failed: {err}"),
        }
    }

    // Stale access token but a refresh token on hand: rotate the session
    // and carry the new cookie pair out on the response.
    if current.is_none() {
        if let Some(token) = refresh_token.as_deref() {
            match auth::refresh_session(&data.supabase, token).await {
                Ok(session) => {
                    current = Some(CurrentUser {
                        id: session.user.id.clone(),
                        email: session.user.email.clone(),
                        access_token: session.access_token.clone(),
                    });
                    refreshed = Some(session);
                }
                Err(err) => tracing::debug!("session refresh failed: {err}"),
            }
        }
    }

    let has_session = current.is_some();
    if let Some(user) = current {
        request.extensions_mut().insert(user);
    }

    let mut response = match gate_decision(&path, has_session) {
        GateAction::RedirectToLogin => Redirect::temporary("/login").into_response(),
        GateAction::RedirectToTodos => Redirect::temporary("/todos").into_response(),
        GateAction::PassThrough => next.run(request).await,
    };

    if let Some(session) = refreshed {
        append_set_cookie(
            &mut response,
            &session_cookie(ACCESS_TOKEN_COOKIE, &session.access_token),
        );
        append_set_cookie(
            &mut response,
            &session_cookie(REFRESH_TOKEN_COOKIE, &session.refresh_token),
        );
    }

    response
}

/// Read a cookie by name from the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(header::COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Format a session cookie. HttpOnly keeps tokens away from page
/// scripts; SameSite=Lax still sends them on top-level navigations.
pub fn session_cookie(name: &str, value: &str) -> String {
    format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax")
}

/// Format a cookie that clears the named session cookie.
pub fn expired_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn append_set_cookie(response: &mut Response, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(err) => tracing::warn!("dropping unrepresentable cookie: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_decision_table() {
        // /todos* without a session redirects to /login.
        assert_eq!(gate_decision("/todos", false), GateAction::RedirectToLogin);
        assert_eq!(
            gate_decision("/todos/some-id", false),
            GateAction::RedirectToLogin
        );
        // /todos* with a session passes through.
        assert_eq!(gate_decision("/todos", true), GateAction::PassThrough);
        assert_eq!(gate_decision("/todos/x/toggle", true), GateAction::PassThrough);
        // /login and /register with a session redirect to /todos.
        assert_eq!(gate_decision("/login", true), GateAction::RedirectToTodos);
        assert_eq!(gate_decision("/register", true), GateAction::RedirectToTodos);
        // ...and pass through without one.
        assert_eq!(gate_decision("/login", false), GateAction::PassThrough);
        assert_eq!(gate_decision("/register", false), GateAction::PassThrough);
    }

    #[test]
    fn exact_match_for_auth_pages() {
        // Prefix matches only apply to /todos; the auth pages match
        // exactly.
        assert_eq!(gate_decision("/login/extra", true), GateAction::PassThrough);
        assert_eq!(gate_decision("/registering", true), GateAction::PassThrough);
        assert!(is_gated("/todos/abc"));
        assert!(!is_gated("/login/extra"));
        assert!(!is_gated("/"));
        assert!(!is_gated("/logout"));
    }

    #[test]
    fn cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("sb-access-token=abc; sb-refresh-token=def; theme=dark"),
        );
        assert_eq!(
            cookie_value(&headers, ACCESS_TOKEN_COOKIE).as_deref(),
            Some("abc")
        );
        assert_eq!(
            cookie_value(&headers, REFRESH_TOKEN_COOKIE).as_deref(),
            Some("def")
        );
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_parsing_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("sb-access-token=abc"),
        );
        assert_eq!(
            cookie_value(&headers, ACCESS_TOKEN_COOKIE).as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn cookie_formatting() {
        let cookie = session_cookie(ACCESS_TOKEN_COOKIE, "abc");
        assert!(cookie.starts_with("sb-access-token=abc"));
        assert!(cookie.contains("HttpOnly"));
        let cleared = expired_cookie(ACCESS_TOKEN_COOKIE);
        assert!(cleared.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn missing_identity_rejects_with_unauthorized() {
        let request = Request::builder().uri("/todos").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let err = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn present_identity_is_extracted() {
        let mut request = Request::builder().uri("/todos").body(()).unwrap();
        request.extensions_mut().insert(CurrentUser {
            id: "123e4567-e89b-12d3-a456-426614174000".to_string(),
            email: "user@example.com".to_string(),
            access_token: "live-token".to_string(),
        });
        let (mut parts, _) = request.into_parts();
        let user = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.email, "user@example.com");
    }
}

#[cfg(test)]
mod gate_http_tests {
    use super::*;
    use crate::config::Config;
    use crate::route::create_router;
    use crate::supabase::SupabaseClient;
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn router_for(server: &MockServer) -> axum::Router {
        let config = Config {
            supabase_url: server.uri(),
            supabase_anon_key: "test-anon-key-long-enough".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origin: "http://localhost:3000".to_string(),
        };
        let supabase = SupabaseClient::new(&config).unwrap();
        create_router(Arc::new(AppState { supabase }))
    }

    fn user_body() -> serde_json::Value {
        serde_json::json!({
            "id": USER_ID,
            "email": "user@example.com",
            "role": "authenticated"
        })
    }

    #[tokio::test]
    async fn todos_without_session_redirects_to_login() {
        let server = MockServer::start().await;
        // No cookies at all: the gate must redirect without consulting
        // the provider.
        let response = router_for(&server)
            .oneshot(Request::builder().uri("/todos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/login"
        );
    }

    #[tokio::test]
    async fn login_with_session_redirects_to_todos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_is("Authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(&server)
            .await;

        let request = Request::builder()
            .uri("/login")
            .header(header::COOKIE, "sb-access-token=live-token")
            .body(Body::empty())
            .unwrap();
        let response = router_for(&server).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/todos"
        );
    }

    #[tokio::test]
    async fn stale_access_token_is_refreshed_and_cookies_rotated() {
        let server = MockServer::start().await;
        // The stale access token is rejected by the provider...
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_is("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "invalid JWT"
            })))
            .mount(&server)
            .await;
        // ...the refresh token buys a new session...
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new-access",
                "refresh_token": "new-refresh",
                "token_type": "bearer",
                "user": user_body()
            })))
            .mount(&server)
            .await;
        // ...and the handler runs with the refreshed token.
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(header_is("Authorization", "Bearer new-access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let request = Request::builder()
            .uri("/todos")
            .header(
                header::COOKIE,
                "sb-access-token=stale; sb-refresh-token=old-refresh",
            )
            .body(Body::empty())
            .unwrap();
        let response = router_for(&server).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect();
        assert!(
            cookies
                .iter()
                .any(|c| c.starts_with("sb-access-token=new-access")),
            "{cookies:?}"
        );
        assert!(
            cookies
                .iter()
                .any(|c| c.starts_with("sb-refresh-token=new-refresh")),
            "{cookies:?}"
        );
    }

    #[tokio::test]
    async fn todos_with_live_session_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_is("Authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(header_is("Authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let request = Request::builder()
            .uri("/todos")
            .header(header::COOKIE, "sb-access-token=live-token")
            .body(Body::empty())
            .unwrap();
        let response = router_for(&server).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        // A live session leaves the cookie pair untouched.
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}
