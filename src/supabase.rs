//! Supabase HTTP client.
//!
//! Thin `reqwest` wrapper over the two Supabase planes this app uses:
//! PostgREST (`/rest/v1`) for the `todos` table and GoTrue (`/auth/v1`)
//! for email+password authentication. The client is constructed once
//! from validated configuration and passed explicitly through
//! application state; no module reaches for a global instance.

use reqwest::{Method, RequestBuilder, StatusCode};

use crate::config::Config;
use crate::error::AppError;

pub struct SupabaseClient {
    url: String,
    anon_key: String,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        // Timeout behavior is left to the reqwest defaults.
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            http,
        })
    }

    /// PostgREST URL for a table.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }

    /// GoTrue URL for an auth endpoint.
    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    /// Start a request with the Supabase auth headers applied. A bearer
    /// token of `None` authenticates as the anon role; `Some` carries a
    /// user's access token.
    pub fn request(&self, method: Method, url: &str, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.anon_key);
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {token}"))
    }
}

/// Turn a non-success auth-provider response into an error carrying the
/// provider's own message verbatim. GoTrue spells its message as
/// `error_description`, `msg`, or `message` depending on the endpoint.
pub async fn provider_error(resp: reqwest::Response) -> AppError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|key| value.get(key)?.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("auth provider returned {status}")
            } else {
                body
            }
        });
    AppError::Provider(message)
}

/// True for statuses GoTrue uses to mean "no valid session".
pub fn is_unauthenticated(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}
