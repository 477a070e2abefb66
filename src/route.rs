use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};

use crate::{handler::*, middleware::mw_session_gate, AppState};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // The session gate wraps every route; it only acts on the gated
    // path set (/todos*, /login, /register) and passes the rest through.
    Router::new()
        .route("/todos", get(get_todos).post(create_todo))
        .route("/todos/:id", patch(update_todo).delete(delete_todo))
        .route("/todos/:id/toggle", patch(toggle_todo))
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(signup))
        .route("/logout", post(logout))
        .route("/", get(health_checker_handler))
        .layer(from_fn_with_state(app_state.clone(), mw_session_gate))
        .with_state(app_state)
}
