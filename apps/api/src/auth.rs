//! Bearer-token guard for privileged routes.
//!
//! `AuthenticatedUser` is an Axum extractor: handlers that take it only run once
//! a token has been verified. Verification sits behind `TokenVerifier` so the
//! router can be exercised without an identity provider.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::AuthSettings;
use crate::errors::failure_response;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is expected")]
    MissingHeader,

    #[error("Authorization header must be a Bearer token")]
    MalformedHeader,

    #[error("Unable to find appropriate key")]
    KeyNotFound,

    #[error("Token is invalid: {0}")]
    InvalidToken(String),

    #[error("Unable to fetch signing keys: {0}")]
    Jwks(String),

    #[error("Authentication is not configured")]
    NotConfigured,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        warn!("Auth rejected: {self}");
        failure_response(StatusCode::UNAUTHORIZED, &self.to_string())
    }
}

/// Claims this service reads from a verified access token.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
}

/// Verifies a raw bearer token and returns its claims.
///
/// Carried in `AppState` as `Option<Arc<dyn TokenVerifier>>`.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

// ────────────────────────────────────────────────────────────────────────────
// JWKS / RS256 verifier
// ────────────────────────────────────────────────────────────────────────────

/// Shortest gap between two JWKS fetches triggered by unknown `kid`s.
const JWKS_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

/// RS256 verifier backed by the identity provider's published JWKS.
///
/// The key set is fetched lazily and cached. An unknown `kid` triggers a
/// refetch so key rotation does not need a restart, but at most once per
/// `refetch_interval`.
pub struct JwksVerifier {
    http: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    refetch_interval: Duration,
    cache: RwLock<KeyCache>,
}

#[derive(Default)]
struct KeyCache {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn key(&self, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        self.keys
            .as_ref()
            .and_then(|set| set.find(kid))
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn fetched_within(&self, interval: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < interval)
    }
}

impl JwksVerifier {
    pub fn new(domain: &str, audience: &str) -> Self {
        Self::with_endpoints(
            format!("https://{domain}/.well-known/jwks.json"),
            format!("https://{domain}/"),
            audience,
        )
    }

    pub fn with_endpoints(
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            refetch_interval: JWKS_REFETCH_INTERVAL,
            cache: RwLock::new(KeyCache::default()),
        }
    }

    /// `None` unless both domain and audience are configured.
    pub fn from_settings(settings: &AuthSettings) -> Option<Self> {
        match (&settings.domain, &settings.audience) {
            (Some(domain), Some(audience)) => Some(Self::new(domain, audience)),
            _ => None,
        }
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        debug!("Fetching JWKS from {}", self.jwks_url);
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Jwks(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::Jwks(e.to_string()))
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let cached = self.cache.read().await.key(kid)?;
        if let Some(key) = cached {
            return Ok(key);
        }

        // One fetch at a time; a concurrent request may already have refreshed
        let mut cache = self.cache.write().await;
        if let Some(key) = cache.key(kid)? {
            return Ok(key);
        }
        if cache.fetched_within(self.refetch_interval) {
            debug!(kid, "Unknown kid and JWKS is fresh, not refetching");
            return Err(AuthError::KeyNotFound);
        }

        cache.fetched_at = Some(Instant::now());
        cache.keys = Some(self.fetch_keys().await?);
        cache.key(kid)?.ok_or(AuthError::KeyNotFound)
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header.kid.ok_or(AuthError::KeyNotFound)?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

/// A request whose bearer token has been verified.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let verifier = state.auth.as_deref().ok_or(AuthError::NotConfigured)?;
        let token = bearer_token(&parts.headers)?;
        let claims = verifier.verify(token).await?;
        Ok(AuthenticatedUser(claims))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderValue, routing::get, Json, Router};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PRIVATE_KEY: &[u8] = include_bytes!("../testdata/jwt_rsa.pem");
    const JWKS: &str = include_str!("../testdata/jwks.json");
    const ISSUER: &str = "https://tenant.example.com/";
    const AUDIENCE: &str = "https://jobify.example.com/api";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        aud: &'a str,
        iss: &'a str,
        exp: i64,
    }

    fn sign(kid: &str, aud: &str, exp_offset_secs: i64) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let claims = TestClaims {
            sub: "auth0|tester",
            aud,
            iss: ISSUER,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(&header, &claims, &EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap()).unwrap()
    }

    /// Verifier against a local JWKS server, plus that server's hit count.
    async fn verifier() -> (JwksVerifier, Arc<AtomicUsize>) {
        let jwks: serde_json::Value = serde_json::from_str(JWKS).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/.well-known/jwks.json",
            get(move || {
                let jwks = jwks.clone();
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(jwks)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let verifier = JwksVerifier::with_endpoints(
            format!("http://{addr}/.well-known/jwks.json"),
            ISSUER,
            AUDIENCE,
        );
        (verifier, hits)
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_is_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(bearer_token(&headers("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_missing_or_malformed_header_is_rejected() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingHeader)));
        assert!(matches!(bearer_token(&headers("Bearer")), Err(AuthError::MalformedHeader)));
        assert!(matches!(bearer_token(&headers("Basic dXNlcg==")), Err(AuthError::MalformedHeader)));
    }

    #[test]
    fn test_from_settings_requires_domain_and_audience() {
        let partial = AuthSettings {
            domain: Some("tenant.example.com".to_string()),
            audience: None,
            client_id: None,
        };
        assert!(JwksVerifier::from_settings(&partial).is_none());

        let full = AuthSettings {
            audience: Some(AUDIENCE.to_string()),
            ..partial
        };
        let verifier = JwksVerifier::from_settings(&full).unwrap();
        assert_eq!(verifier.jwks_url, "https://tenant.example.com/.well-known/jwks.json");
        assert_eq!(verifier.issuer, "https://tenant.example.com/");
    }

    #[tokio::test]
    async fn test_valid_token_yields_claims() {
        let (verifier, _) = verifier().await;
        let claims = verifier.verify(&sign("test-key-1", AUDIENCE, 3600)).await.unwrap();
        assert_eq!(claims.sub, "auth0|tester");
    }

    #[tokio::test]
    async fn test_unknown_kid_is_rejected() {
        let (verifier, _) = verifier().await;
        let err = verifier.verify(&sign("rotated-away", AUDIENCE, 3600)).await.unwrap_err();
        assert!(matches!(err, AuthError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let (verifier, _) = verifier().await;
        let err = verifier
            .verify(&sign("test-key-1", "https://other.example.com", 3600))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (verifier, _) = verifier().await;
        let err = verifier.verify(&sign("test-key-1", AUDIENCE, -3600)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let (verifier, _) = verifier().await;
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_known_keys_are_served_from_cache() {
        let (verifier, hits) = verifier().await;
        for _ in 0..3 {
            verifier.verify(&sign("test-key-1", AUDIENCE, 3600)).await.unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_kids_do_not_refetch_while_cache_is_fresh() {
        let (verifier, hits) = verifier().await;
        verifier.verify(&sign("test-key-1", AUDIENCE, 3600)).await.unwrap();

        for kid in ["forged-1", "forged-2", "forged-3"] {
            let err = verifier.verify(&sign(kid, AUDIENCE, 3600)).await.unwrap_err();
            assert!(matches!(err, AuthError::KeyNotFound));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_once_interval_has_passed() {
        let (mut verifier, hits) = verifier().await;
        verifier.refetch_interval = Duration::ZERO;

        for _ in 0..2 {
            let err = verifier.verify(&sign("rotated-in", AUDIENCE, 3600)).await.unwrap_err();
            assert!(matches!(err, AuthError::KeyNotFound));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
