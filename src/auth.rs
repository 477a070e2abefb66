//! Auth provider wrappers.
//!
//! Thin functions over the GoTrue endpoints. Provider-reported errors
//! propagate verbatim as [`AppError::Provider`]; an absent or invalid
//! session is not an error, it is `Ok(None)`.

use reqwest::Method;
use serde_json::json;

use crate::error::AppError;
use crate::model::{AuthSession, User};
use crate::supabase::{is_unauthenticated, provider_error, SupabaseClient};

/// Register a new user. Returns the provider's response payload, which
/// is a bare user object when email confirmation is pending.
pub async fn sign_up(
    sb: &SupabaseClient,
    email: &str,
    password: &str,
) -> Result<serde_json::Value, AppError> {
    let resp = sb
        .request(Method::POST, &sb.auth_url("signup"), None)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(provider_error(resp).await);
    }
    Ok(resp.json().await?)
}

/// Exchange email+password for a session.
pub async fn sign_in(
    sb: &SupabaseClient,
    email: &str,
    password: &str,
) -> Result<AuthSession, AppError> {
    let url = format!("{}?grant_type=password", sb.auth_url("token"));
    let resp = sb
        .request(Method::POST, &url, None)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(provider_error(resp).await);
    }
    Ok(resp.json().await?)
}

/// Exchange a refresh token for a fresh session.
pub async fn refresh_session(
    sb: &SupabaseClient,
    refresh_token: &str,
) -> Result<AuthSession, AppError> {
    let url = format!("{}?grant_type=refresh_token", sb.auth_url("token"));
    let resp = sb
        .request(Method::POST, &url, None)
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(provider_error(resp).await);
    }
    Ok(resp.json().await?)
}

/// Revoke the session behind an access token.
pub async fn sign_out(sb: &SupabaseClient, access_token: &str) -> Result<(), AppError> {
    let resp = sb
        .request(Method::POST, &sb.auth_url("logout"), Some(access_token))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(provider_error(resp).await);
    }
    Ok(())
}

/// Resolve the user behind an access token. `None` token and rejected
/// tokens both resolve to `Ok(None)`; only transport or unexpected
/// provider failures are errors.
pub async fn get_current_user(
    sb: &SupabaseClient,
    access_token: Option<&str>,
) -> Result<Option<User>, AppError> {
    let Some(token) = access_token else {
        return Ok(None);
    };
    let resp = sb
        .request(Method::GET, &sb.auth_url("user"), Some(token))
        .send()
        .await?;
    if is_unauthenticated(resp.status()) {
        return Ok(None);
    }
    if !resp.status().is_success() {
        return Err(provider_error(resp).await);
    }
    Ok(Some(resp.json().await?))
}
