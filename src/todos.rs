//! Todo data access.
//!
//! CRUD against the Supabase `todos` table. Every operation shape-checks
//! its identifiers before any network call, and every query is scoped by
//! the owning user's id in addition to the row id, so a caller holding a
//! foreign row id matches zero rows. Requests authenticate with the
//! acting user's access token, so the backend's row-level policies
//! enforce the same ownership rule; the scoping here is kept as
//! defense-in-depth, not as the only guard.

use reqwest::Method;
use serde_json::json;

use crate::error::AppError;
use crate::model::Todo;
use crate::supabase::SupabaseClient;
use crate::validation::{is_valid_uuid, sanitize_todo_title, validate_todo_title, ValidationError};

/// Partial update for a todo. Built fresh per request; never mutated in
/// place.
#[derive(Debug, Clone, Default)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TodoChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}

fn check_user_id(user_id: &str) -> Result<(), ValidationError> {
    if !is_valid_uuid(user_id) {
        return Err(ValidationError("Invalid user ID format".to_string()));
    }
    Ok(())
}

fn check_ids(user_id: &str, id: &str) -> Result<(), ValidationError> {
    if !is_valid_uuid(user_id) || !is_valid_uuid(id) {
        return Err(ValidationError("Invalid ID format".to_string()));
    }
    Ok(())
}

/// Fetch the user's todos, most recently created first. Zero todos is an
/// empty vec, not an error.
pub async fn get_todos(
    sb: &SupabaseClient,
    user_id: &str,
    access_token: &str,
) -> Result<Vec<Todo>, AppError> {
    check_user_id(user_id)?;

    let url = format!(
        "{}?select=*&user_id=eq.{}&order=created_at.desc",
        sb.rest_url("todos"),
        user_id
    );
    let resp = sb
        .request(Method::GET, &url, Some(access_token))
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json().await?)
}

/// Create a todo from a validated, sanitized title. New todos start
/// uncompleted.
pub async fn create_todo(
    sb: &SupabaseClient,
    user_id: &str,
    title: &str,
    access_token: &str,
) -> Result<Todo, AppError> {
    check_user_id(user_id)?;
    validate_todo_title(title)?;
    let sanitized = sanitize_todo_title(title);

    let url = format!("{}?select=*", sb.rest_url("todos"));
    let rows: Vec<Todo> = sb
        .request(Method::POST, &url, Some(access_token))
        .header("Prefer", "return=representation")
        .json(&json!({
            "user_id": user_id,
            "title": sanitized,
            "completed": false,
        }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::Internal("insert returned no row".to_string()))
}

/// Apply a partial update to a todo the user owns. A title change is
/// validated and sanitized; an update touching a foreign or absent row
/// matches nothing and reports the backend's no-row condition.
pub async fn update_todo(
    sb: &SupabaseClient,
    user_id: &str,
    id: &str,
    changes: &TodoChanges,
    access_token: &str,
) -> Result<Todo, AppError> {
    check_ids(user_id, id)?;
    if changes.is_empty() {
        return Err(ValidationError("No fields to update".to_string()).into());
    }

    let mut payload = serde_json::Map::new();
    if let Some(title) = &changes.title {
        validate_todo_title(title)?;
        payload.insert("title".to_string(), json!(sanitize_todo_title(title)));
    }
    if let Some(completed) = changes.completed {
        payload.insert("completed".to_string(), json!(completed));
    }

    let url = format!(
        "{}?select=*&id=eq.{}&user_id=eq.{}",
        sb.rest_url("todos"),
        id,
        user_id
    );
    let rows: Vec<Todo> = sb
        .request(Method::PATCH, &url, Some(access_token))
        .header("Prefer", "return=representation")
        .json(&payload)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    rows.into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound("Todo not found".to_string()))
}

/// Delete a todo the user owns. Deleting an absent or foreign row is a
/// no-op and still succeeds.
pub async fn delete_todo(
    sb: &SupabaseClient,
    user_id: &str,
    id: &str,
    access_token: &str,
) -> Result<(), AppError> {
    check_ids(user_id, id)?;

    let url = format!(
        "{}?id=eq.{}&user_id=eq.{}",
        sb.rest_url("todos"),
        id,
        user_id
    );
    sb.request(Method::DELETE, &url, Some(access_token))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

/// Flip a todo's completed flag. Purely `update_todo` with only the
/// completed field set.
pub async fn toggle_todo(
    sb: &SupabaseClient,
    user_id: &str,
    id: &str,
    completed: bool,
    access_token: &str,
) -> Result<Todo, AppError> {
    update_todo(
        sb,
        user_id,
        id,
        &TodoChanges {
            title: None,
            completed: Some(completed),
        },
        access_token,
    )
    .await
}
