#![doc = r#"
spotify-token-rs

Refresh a Spotify OAuth2 access token with the refresh-token grant, then
persist the new token into a dotenv-style store file.

Two independent pieces, composed only by the caller:
- token: `TokenClient` performs one refresh-token exchange.
- env_store: `EnvStore` upserts one `KEY="value"` line in the store file.

Quick usage:

```ignore
use spotify_token_rs::{Credentials, EnvStore, TokenClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let creds = Credentials {
        client_id: std::env::var("SPOTIFY_CLIENT_ID")?,
        client_secret: std::env::var("SPOTIFY_CLIENT_SECRET")?,
        refresh_token: std::env::var("SPOTIFY_REFRESH_TOKEN")?,
    };

    let token = TokenClient::default().refresh_access_token(&creds).await?;
    EnvStore::new(".env").upsert("SPOTIFY_ACCESS_TOKEN", &token)?;
    println!("access_token received (redacted): len={}", token.len());

    Ok(())
}
```
"#]

pub mod env_store;
pub mod token;

pub use env_store::{upsert_assignment, EnvStore, MissingStorePolicy, StoreError};
pub use token::*;
