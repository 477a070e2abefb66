use serde::{Deserialize, Serialize};

/// A row in the Supabase `todos` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub completed: bool,
    /// Server-assigned creation timestamp, treated as opaque.
    pub created_at: String,
}

/// The authenticated user as reported by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

/// Token pair plus user, as returned by a password or refresh grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Request-scoped identity inserted by the session-gating middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub access_token: String,
}
