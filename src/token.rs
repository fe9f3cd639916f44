//! OAuth2 refresh-token grant client.
//!
//! Exchanges a long-lived refresh token for a fresh short-lived access token
//! at the authorization server's token endpoint.
//!
//! Design:
//! - `Credentials` carries the three values the grant needs; build it once at
//!   startup and pass it by parameter (no process-global credential state).
//! - `TokenClient` handles HTTP and basic error mapping; persisting the
//!   returned token is the job of the `env_store` module.
//! - Errors are unified via `Error`.
//!
//! Endpoint:
//! - POST https://accounts.spotify.com/api/token
//!   body (application/x-www-form-urlencoded):
//!   grant_type=refresh_token, refresh_token, client_id, client_secret
//!
//! Note: the Refresh Token Flow needs only refresh_token, client_id and
//! client_secret; no redirect_uri and no user interaction.
//!
//! Example (pseudo usage):
//! ```ignore
//! use spotify_token_rs::{Credentials, TokenClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TokenClient::default();
//!     let creds = Credentials {
//!         client_id: "your_client_id".into(),
//!         client_secret: "your_client_secret".into(),
//!         refresh_token: "your_refresh_token".into(),
//!     };
//!     let token = client.refresh_access_token(&creds).await?;
//!     println!("access_token received (redacted): len={}", token.len());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Default token endpoint (Spotify accounts service).
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Request timeout applied by `TokenClient::default()`.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum response body length kept in diagnostic errors.
const MAX_DIAG_BODY_BYTES: usize = 2048;

/// Credentials for the refresh-token grant.
///
/// All three fields must be non-empty before an exchange is attempted;
/// `validate` enforces this without touching the network.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// OAuth2 client identifier
    pub client_id: String,
    /// OAuth2 client secret (do not log)
    pub client_secret: String,
    /// Long-lived refresh token (do not log)
    pub refresh_token: String,
}

impl Credentials {
    /// Check that every field is non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::MissingCredential("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(Error::MissingCredential("client_secret"));
        }
        if self.refresh_token.is_empty() {
            return Err(Error::MissingCredential("refresh_token"));
        }
        Ok(())
    }
}

/// Token endpoint success response.
///
/// Only `access_token` matters here; extra fields such as `token_type`,
/// `expires_in` and `scope` are accepted and ignored by serde.
#[derive(Clone, Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Unified error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing credential: {0} is empty")]
    MissingCredential(&'static str),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("no access_token in response (status {status}): {body}")]
    MissingAccessToken { status: u16, body: String },

    #[error("unexpected token response (status {status}): {error}; body: {body}")]
    MalformedResponse {
        status: u16,
        error: String,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the refresh-token grant
///
/// - Wraps `reqwest::Client`
/// - Single-shot: one request per call, no caching, no retries
/// - The endpoint can be overridden for non-default authorization servers
///   (and for tests against a local mock server)
#[derive(Clone, Debug)]
pub struct TokenClient {
    http: reqwest::Client,
    endpoint: String,
}

impl Default for TokenClient {
    fn default() -> Self {
        let http = reqwest::Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest::Client build must succeed");
        Self {
            http,
            endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }
}

impl TokenClient {
    /// Use a custom `reqwest::Client`
    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }

    /// Override the token endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Execute one refresh-token grant and return the new access token.
    ///
    /// - Validates `creds` first; nothing goes on the wire if a field is empty.
    /// - Buffers the full response body, then decodes it as JSON.
    /// - The returned token is opaque: no trimming, no format checks.
    #[instrument(level = "debug", skip(self, creds))]
    pub async fn refresh_access_token(&self, creds: &Credentials) -> Result<String> {
        creds.validate()?;

        let url =
            Url::parse(&self.endpoint).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        // Safe logging (no secrets); counted in chars so multibyte ids
        // never split inside a UTF-8 sequence
        let client_id_hint = {
            let id = creds.client_id.as_str();
            let n = id.chars().count();
            if n <= 4 {
                format!("{}***", id)
            } else {
                let head: String = id.chars().take(2).collect();
                let tail: String = id.chars().skip(n - 2).collect();
                format!("{head}***{tail}")
            }
        };
        debug!(
            "Requesting access_token via refresh_token grant (no secrets), client_id hint: {}",
            client_id_hint
        );

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", creds.refresh_token.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
        ];

        let resp = self.http.post(url).form(&params).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<TokenResponse>(&bytes) {
            Ok(TokenResponse {
                access_token: Some(token),
                ..
            }) if !token.is_empty() => Ok(token),
            Ok(_) => {
                // Decodable JSON without a usable token: typically an
                // authorization-server error object such as
                // {"error":"invalid_grant"} for an expired/revoked refresh token.
                Err(Error::MissingAccessToken {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).to_string(),
                })
            }
            Err(de_err) => {
                let mut body = String::from_utf8_lossy(&bytes).to_string();
                if body.len() > MAX_DIAG_BODY_BYTES {
                    body.truncate(MAX_DIAG_BODY_BYTES);
                    body.push_str("...");
                }
                Err(Error::MalformedResponse {
                    status: status.as_u16(),
                    error: de_err.to_string(),
                    body,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{routing::post, Router};

    fn creds() -> Credentials {
        Credentials {
            client_id: "test_client_id".into(),
            client_secret: "test_client_secret".into(),
            refresh_token: "test_refresh_token".into(),
        }
    }

    /// Serve a fixed body on POST /api/token and count hits.
    async fn mock_endpoint(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/token",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    body
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock endpoint");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock endpoint");
        });
        (format!("http://{addr}/api/token"), hits)
    }

    #[tokio::test]
    async fn exchange_success_returns_token() {
        let (url, hits) = mock_endpoint(r#"{"access_token":"abc123"}"#).await;
        let client = TokenClient::default().with_endpoint(url);
        let token = client.refresh_access_token(&creds()).await.expect("exchange");
        assert_eq!(token, "abc123");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn error_object_maps_to_missing_access_token() {
        let (url, _) = mock_endpoint(r#"{"error":"invalid_grant"}"#).await;
        let client = TokenClient::default().with_endpoint(url);
        let err = client
            .refresh_access_token(&creds())
            .await
            .expect_err("must fail");
        match err {
            Error::MissingAccessToken { body, .. } => {
                assert_eq!(body, r#"{"error":"invalid_grant"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn multibyte_client_id_exchanges_without_panicking() {
        let (url, _) = mock_endpoint(r#"{"access_token":"abc123"}"#).await;
        let client = TokenClient::default().with_endpoint(url);
        let creds = Credentials {
            client_id: "日本語クライアント".into(),
            ..creds()
        };
        let token = client.refresh_access_token(&creds).await.expect("exchange");
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_http_error() {
        // Port 1 is never listening on loopback for an unprivileged test run.
        let client = TokenClient::default().with_endpoint("http://127.0.0.1:1/api/token");
        let err = client
            .refresh_access_token(&creds())
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn empty_access_token_maps_to_missing_access_token() {
        let (url, _) = mock_endpoint(r#"{"access_token":""}"#).await;
        let client = TokenClient::default().with_endpoint(url);
        let err = client
            .refresh_access_token(&creds())
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::MissingAccessToken { .. }));
    }

    #[tokio::test]
    async fn non_json_body_maps_to_malformed_response() {
        let (url, _) = mock_endpoint("not json").await;
        let client = TokenClient::default().with_endpoint(url);
        let err = client
            .refresh_access_token(&creds())
            .await
            .expect_err("must fail");
        match err {
            Error::MalformedResponse { body, .. } => assert_eq!(body, "not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_credential_fails_before_any_request() {
        let (url, hits) = mock_endpoint(r#"{"access_token":"abc123"}"#).await;
        let client = TokenClient::default().with_endpoint(url);

        for (broken, field) in [
            (
                Credentials {
                    client_id: String::new(),
                    ..creds()
                },
                "client_id",
            ),
            (
                Credentials {
                    client_secret: String::new(),
                    ..creds()
                },
                "client_secret",
            ),
            (
                Credentials {
                    refresh_token: String::new(),
                    ..creds()
                },
                "refresh_token",
            ),
        ] {
            let err = client
                .refresh_access_token(&broken)
                .await
                .expect_err("must fail");
            match err {
                Error::MissingCredential(name) => assert_eq!(name, field),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0, "no request may be sent");
    }
}
