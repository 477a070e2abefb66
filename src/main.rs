mod auth;
mod config;
mod error;
mod handler;
mod middleware;
mod model;
mod route;
mod schema;
mod supabase;
mod todos;
mod validation;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Server,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::supabase::SupabaseClient;

// Struct representing the application state
pub struct AppState {
    pub supabase: SupabaseClient,
}

// Entry point of the application
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,axum_todo_supabase=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail at startup on missing or malformed Supabase configuration.
    let config = Config::from_env()?;

    // One client for the whole process, passed through application
    // state rather than reached for globally.
    let supabase = SupabaseClient::new(&config)?;
    let app_state = Arc::new(AppState { supabase });

    // Configure CORS settings for the browser frontend
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let app = route::create_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("listening on {addr}");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
