//! Environment-driven configuration.
//!
//! Loaded once in `main` and passed down explicitly; nothing else in the
//! codebase reads the environment. `SUPABASE_URL` and `SUPABASE_ANON_KEY`
//! are required and checked up front so a misconfigured deployment fails
//! at startup, not on the first request.

use anyhow::Result;
use std::env;

use crate::validation::{get_env_var, validate_supabase_key, validate_supabase_url};

#[derive(Debug, Clone)]
pub struct Config {
    /// Supabase project URL, e.g. `https://xxxx.supabase.co`.
    pub supabase_url: String,
    /// Supabase anon (public) API key.
    pub supabase_anon_key: String,
    /// Server bind host (default: 127.0.0.1).
    pub host: String,
    /// Server port (default: 8080).
    pub port: u16,
    /// Origin allowed by the CORS layer (default: http://localhost:3000).
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // .env is optional; real deployments set the environment directly.
        dotenv::dotenv().ok();

        let supabase_url = get_env_var("SUPABASE_URL")?;
        validate_supabase_url(&supabase_url)?;

        let supabase_anon_key = get_env_var("SUPABASE_ANON_KEY")?;
        validate_supabase_key(&supabase_anon_key)?;

        Ok(Config {
            // Trailing slashes would double up when joining API paths.
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
