//! Single-shot token refresher, meant to run from a scheduler (cron or
//! similar): refresh the Spotify access token once, persist it, exit.
//!
//! Environment (loaded from `.env` via dotenvy, or the process environment):
//! - SPOTIFY_CLIENT_ID
//! - SPOTIFY_CLIENT_SECRET
//! - SPOTIFY_REFRESH_TOKEN
//! - SPOTIFY_ENV_FILE (optional, store file path, default `.env`)
//!
//! Exit codes let a scheduler or monitor tell the failure classes apart:
//! 0 success, 2 configuration missing, 3 exchange failed, 4 persist failed.

use std::process::ExitCode;

use spotify_token_rs::{Credentials, EnvStore, TokenClient};
use tracing::{error, info};

/// Store key that receives the refreshed token.
const ACCESS_TOKEN_KEY: &str = "SPOTIFY_ACCESS_TOKEN";

const EXIT_CONFIG_MISSING: u8 = 2;
const EXIT_EXCHANGE_FAILED: u8 = 3;
const EXIT_PERSIST_FAILED: u8 = 4;

fn required_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
        required_var("SPOTIFY_CLIENT_ID"),
        required_var("SPOTIFY_CLIENT_SECRET"),
        required_var("SPOTIFY_REFRESH_TOKEN"),
    ) else {
        error!(
            "SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET and SPOTIFY_REFRESH_TOKEN \
             must be set (in the environment or the .env file)"
        );
        return ExitCode::from(EXIT_CONFIG_MISSING);
    };

    let creds = Credentials {
        client_id,
        client_secret,
        refresh_token,
    };

    info!("Refreshing Spotify access token...");
    let token = match TokenClient::default().refresh_access_token(&creds).await {
        Ok(token) => token,
        Err(e) => {
            error!("token refresh failed: {e}");
            return ExitCode::from(EXIT_EXCHANGE_FAILED);
        }
    };
    info!("New access token received (redacted): len={}", token.len());

    let store_path =
        std::env::var("SPOTIFY_ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    if let Err(e) = EnvStore::new(&store_path).upsert(ACCESS_TOKEN_KEY, &token) {
        error!("failed to persist token to {store_path}: {e}");
        return ExitCode::from(EXIT_PERSIST_FAILED);
    }

    info!("{store_path} updated with new {ACCESS_TOKEN_KEY}");
    ExitCode::SUCCESS
}
