use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::{
    auth,
    error::AppError,
    middleware::{
        append_set_cookie, cookie_value, expired_cookie, session_cookie, ACCESS_TOKEN_COOKIE,
        REFRESH_TOKEN_COOKIE,
    },
    model::CurrentUser,
    schema::{CreateTodoSchema, LoginSchema, SignupSchema, ToggleTodoSchema, UpdateTodoSchema},
    todos::{self, TodoChanges},
    validation::{validate_email, validate_password},
    AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    const MESSAGE: &str = "Todo web app with Rust, Axum, and Supabase";

    let json_response = serde_json::json!({
        "status": "success",
        "message": MESSAGE
    });

    Json(json_response)
}

// Placeholder for the login page; the middleware redirects signed-in
// visitors away before this runs.
pub async fn login_page() -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Sign in with POST /login"
    }))
}

// Placeholder for the registration page.
pub async fn register_page() -> impl IntoResponse {
    Json(json!({
        "status": "success",
        "message": "Register with POST /register"
    }))
}

// Handler for registering a new user
pub async fn signup(
    State(data): State<Arc<AppState>>,
    Json(body): Json<SignupSchema>,
) -> Result<impl IntoResponse, AppError> {
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let outcome = auth::sign_up(&data.supabase, &body.email, &body.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": outcome })),
    ))
}

// Handler for signing in; a successful sign-in sets the session cookies
pub async fn login(
    State(data): State<Arc<AppState>>,
    Json(body): Json<LoginSchema>,
) -> Result<Response, AppError> {
    let session = auth::sign_in(&data.supabase, &body.email, &body.password).await?;

    let mut response = (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "data": { "user": session.user }
        })),
    )
        .into_response();

    set_session_cookies(&mut response, &session.access_token, &session.refresh_token)?;
    Ok(response)
}

// Handler for signing out; clears the session cookies even if the
// provider-side revocation fails
pub async fn logout(
    State(data): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = cookie_value(&headers, ACCESS_TOKEN_COOKIE) {
        if let Err(err) = auth::sign_out(&data.supabase, &token).await {
            tracing::warn!("provider sign-out failed: {err}");
        }
    }

    let mut response = (
        StatusCode::OK,
        Json(json!({ "status": "success", "message": "Signed out" })),
    )
        .into_response();

    append_set_cookie(&mut response, &expired_cookie(ACCESS_TOKEN_COOKIE));
    append_set_cookie(&mut response, &expired_cookie(REFRESH_TOKEN_COOKIE));
    Ok(response)
}

// Handler for getting the current user's Todo items
pub async fn get_todos(
    State(data): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let todos = todos::get_todos(&data.supabase, &user.id, &user.access_token).await?;

    let json_response = serde_json::json!({
        "status": "success",
        "results": todos.len(),
        "todos": todos
    });
    Ok((StatusCode::OK, Json(json_response)))
}

// Handler for creating a new Todo
pub async fn create_todo(
    State(data): State<Arc<AppState>>,
    user: CurrentUser,
    Json(body): Json<CreateTodoSchema>,
) -> Result<impl IntoResponse, AppError> {
    let todo =
        todos::create_todo(&data.supabase, &user.id, &body.title, &user.access_token).await?;

    let todo_response = json!({ "status": "success", "data": json!({
        "todo": todo
    })});
    Ok((StatusCode::CREATED, Json(todo_response)))
}

// Handler for partially updating a Todo by ID
pub async fn update_todo(
    State(data): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateTodoSchema>,
) -> Result<impl IntoResponse, AppError> {
    let changes = TodoChanges {
        title: body.title,
        completed: body.completed,
    };
    let todo =
        todos::update_todo(&data.supabase, &user.id, &id, &changes, &user.access_token).await?;

    let todo_response = serde_json::json!({ "status": "success", "data": serde_json::json!({
        "todo": todo
    })});
    Ok((StatusCode::OK, Json(todo_response)))
}

// Handler for toggling a Todo's completed flag
pub async fn toggle_todo(
    State(data): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ToggleTodoSchema>,
) -> Result<impl IntoResponse, AppError> {
    let todo = todos::toggle_todo(
        &data.supabase,
        &user.id,
        &id,
        body.completed,
        &user.access_token,
    )
    .await?;

    let todo_response = serde_json::json!({ "status": "success", "data": serde_json::json!({
        "todo": todo
    })});
    Ok((StatusCode::OK, Json(todo_response)))
}

// Handler for deleting a Todo by ID; deleting an absent or foreign row
// is a successful no-op
pub async fn delete_todo(
    State(data): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    todos::delete_todo(&data.supabase, &user.id, &id, &user.access_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn set_session_cookies(
    response: &mut Response,
    access_token: &str,
    refresh_token: &str,
) -> Result<(), AppError> {
    // Tokens come from the provider and should always be representable;
    // a failure here means the response would lack a session.
    for cookie in [
        session_cookie(ACCESS_TOKEN_COOKIE, access_token),
        session_cookie(REFRESH_TOKEN_COOKIE, refresh_token),
    ] {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|err| AppError::Internal(format!("invalid session cookie: {err}")))?;
        response
            .headers_mut()
            .append(axum::http::header::SET_COOKIE, value);
    }
    Ok(())
}
