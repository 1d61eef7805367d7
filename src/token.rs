//! Bearer-token acquisition and caching for the analysis services.
//!
//! A [`TokenManager`] owns the only cached credential of the process. Callers
//! share it through an `Arc` and ask for a token before every authenticated
//! request; the identity endpoint is contacted only when the cached token is
//! missing or stale.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::Credentials;
use crate::error::AuthError;

/// Tokens are treated as expired this many seconds before the issuer says they are.
const REFRESH_MARGIN_SECS: i64 = 60;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(10);

/// A cached bearer credential; replaced as a whole, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Client-credentials token source with a single cached token.
#[derive(Debug)]
pub struct TokenManager {
    http: reqwest::Client,
    token_url: Url,
    credentials: Credentials,
    cache: RwLock<Option<Token>>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, token_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            token_url,
            credentials,
            cache: RwLock::new(None),
        }
    }

    /// Return a valid bearer token, fetching a new one only when needed.
    ///
    /// Concurrent callers that find the cache stale may each fetch a token; the
    /// last one stored wins, and every stored token is freshly issued.
    ///
    /// # Errors
    ///
    /// [`AuthError`] when the identity endpoint is unreachable, answers with a
    /// non-success status, or returns a body without `access_token`/`expires_in`.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        if let Some(token) = self.cache.read().await.as_ref() {
            if token.is_fresh(Utc::now()) {
                debug!(expires_at = %token.expires_at, "Reusing cached token");
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *self.cache.write().await = Some(token);
        Ok(value)
    }

    /// Expiry of the currently cached token, if any.
    #[cfg(test)]
    pub async fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.cache.read().await.as_ref().map(|t| t.expires_at)
    }

    #[instrument(level = "info", skip_all, fields(endpoint = %self.token_url))]
    async fn request_token(&self) -> Result<Token, AuthError> {
        let t0 = Instant::now();
        let endpoint = self.token_url.to_string();
        let body = TokenRequest {
            client_id: &self.credentials.client_id,
            client_secret: &self.credentials.client_secret,
            audience: &self.credentials.audience,
            grant_type: "client_credentials",
        };

        let response = self
            .http
            .post(self.token_url.clone())
            .json(&body)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .map_err(|source| AuthError::Unreachable {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Identity endpoint rejected token request");
            return Err(AuthError::Rejected {
                endpoint,
                status: status.as_u16(),
            });
        }

        let issued: TokenResponse = response
            .json()
            .await
            .map_err(|source| AuthError::Decode {
                endpoint: endpoint.clone(),
                source,
            })?;

        let expires_at = TimeDelta::try_seconds(issued.expires_in.saturating_sub(REFRESH_MARGIN_SECS))
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or(AuthError::InvalidExpiry {
                endpoint,
                expires_in: issued.expires_in,
            })?;
        info!(
            %expires_at,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Obtained new access token"
        );
        Ok(Token {
            value: issued.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> TokenManager {
        TokenManager::new(
            reqwest::Client::new(),
            Url::parse(&format!("{}/oauth/token", server.uri())).unwrap(),
            Credentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                audience: "https://api.example".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn second_call_within_lifetime_uses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_json(json!({
                "client_id": "client",
                "client_secret": "secret",
                "audience": "https://api.example",
                "grant_type": "client_credentials"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok-1", "expires_in": 86400 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tokens = manager(&server);
        let first = tokens.get_token().await.unwrap();
        let second = tokens.get_token().await.unwrap();

        assert_eq!(first, "tok-1");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expiry_is_brought_forward_by_a_minute() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok", "expires_in": 3600 })),
            )
            .mount(&server)
            .await;

        let tokens = manager(&server);
        let before = Utc::now();
        tokens.get_token().await.unwrap();
        let expiry = tokens.cached_expiry().await.unwrap();

        assert!(expiry >= before + TimeDelta::seconds(3540));
        assert!(expiry <= Utc::now() + TimeDelta::seconds(3540));
    }

    #[tokio::test]
    async fn stale_token_is_replaced_with_one_request() {
        let server = MockServer::start().await;
        // Lives exactly as long as the refresh margin, so it is stale on arrival.
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok-old", "expires_in": 60 })),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access_token": "tok-new", "expires_in": 3600 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tokens = manager(&server);
        assert_eq!(tokens.get_token().await.unwrap(), "tok-old");
        let old_expiry = tokens.cached_expiry().await.unwrap();

        assert_eq!(tokens.get_token().await.unwrap(), "tok-new");
        let new_expiry = tokens.cached_expiry().await.unwrap();
        assert!(new_expiry > old_expiry);
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = manager(&server).get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn out_of_range_lifetime_is_rejected_without_caching() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "access_token": "tok", "expires_in": i64::MAX }),
            ))
            .mount(&server)
            .await;

        let tokens = manager(&server);
        let err = tokens.get_token().await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::InvalidExpiry {
                expires_in: i64::MAX,
                ..
            }
        ));
        assert_eq!(tokens.cached_expiry().await, None);
    }

    #[tokio::test]
    async fn hugely_negative_lifetime_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "access_token": "tok", "expires_in": i64::MIN }),
            ))
            .mount(&server)
            .await;

        let err = manager(&server).get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidExpiry { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_as_auth_error() {
        let tokens = TokenManager::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/oauth/token").unwrap(),
            Credentials {
                client_id: "c".to_string(),
                client_secret: "s".to_string(),
                audience: "a".to_string(),
            },
        );

        let err = tokens.get_token().await.unwrap_err();
        assert!(matches!(err, AuthError::Unreachable { .. }));
    }
}
