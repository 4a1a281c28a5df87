use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{MurmurError, Result};

const TOKEN_COOKIE: &str = "token";

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user name or id)
    pub exp: i64,    // Expiration timestamp
    pub iat: i64,    // Issued at timestamp
    pub iss: String, // Issuer
    pub jti: String, // JWT ID (unique token identifier)
}

/// JWT Service - creates and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    /// Create a token for `subject`, valid for `ttl_hours`
    pub fn create_token(&self, subject: &str, ttl_hours: i64) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(ttl_hours);

        let claims = Claims {
            sub: subject.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| MurmurError::Config(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature, expiry and issuer
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                MurmurError::Unauthorized
            })
    }
}

/// Authenticated caller, available to handlers as a request extension
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub subject: String,
}

/// Reject requests without a valid token before they reach note logic.
pub async fn require_auth(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> std::result::Result<Response, MurmurError> {
    let token = extract_token(request.headers()).ok_or_else(|| {
        debug!("No authentication token");
        MurmurError::Unauthorized
    })?;

    let claims = jwt.verify_token(&token)?;
    request.extensions_mut().insert(AuthUser { subject: claims.sub });

    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer <token>`, falling back to a `token` cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
        })
        .filter(|t| !t.is_empty());

    from_header.or_else(|| {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_COOKIE)
            .map(|(_, value)| value.to_string())
            .filter(|t| !t.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "test_issuer");
        let token = service.create_token("alice", 24).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new("secret_a", "murmur");
        let verifier = JwtService::new("secret_b", "murmur");
        let token = issuer.create_token("alice", 1).unwrap();

        assert!(matches!(
            verifier.verify_token(&token),
            Err(MurmurError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuer = JwtService::new("secret", "someone-else");
        let verifier = JwtService::new("secret", "murmur");
        let token = issuer.create_token("alice", 1).unwrap();

        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new("secret", "murmur");
        let token = service.create_token("alice", -2).unwrap();
        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn test_extract_token_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; token=cookie.jwt"));
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie.jwt"));
    }

    #[test]
    fn test_no_token() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
