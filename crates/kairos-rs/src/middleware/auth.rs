//! JWT / API-key authentication middleware.
//!
//! Supports multiple simultaneous signing keys: a primary key plus
//! deprecated keys kept around for a grace period while clients rotate off
//! them. Verification tries the primary first, then each non-expired
//! deprecated key in order; a deprecated-key success is logged as a
//! warning so operators can see rotation progress.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error as ActixError, HttpMessage,
};
use futures::future::{LocalBoxFuture, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    task::{Context, Poll},
    time::{SystemTime, UNIX_EPOCH},
};

/// Standard JWT claims this gateway understands. Extra claims in the token
/// are ignored, not rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
}

/// A signing key kept around past rotation, valid only until `expires_at`
/// (unix seconds). `None` means it never expires on its own (rotate it out
/// of config instead).
#[derive(Debug, Clone)]
pub struct DeprecatedKey {
    pub secret: String,
    pub expires_at: Option<u64>,
}

impl DeprecatedKey {
    fn is_expired(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(exp) if now >= exp)
    }
}

/// JWT verification configuration for the auth middleware.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    primary_secret: String,
    deprecated_keys: Vec<DeprecatedKey>,
    issuer: Option<String>,
    audience: Option<String>,
    required_claims: Vec<String>,
}

impl JwtConfig {
    pub fn new(secret: String) -> Self {
        Self {
            primary_secret: secret,
            deprecated_keys: Vec::new(),
            issuer: None,
            audience: None,
            required_claims: vec!["sub".to_string(), "exp".to_string()],
        }
    }

    pub fn with_issuer(mut self, issuer: String) -> Self {
        if !issuer.is_empty() {
            self.issuer = Some(issuer);
        }
        self
    }

    pub fn with_audience(mut self, audience: String) -> Self {
        if !audience.is_empty() {
            self.audience = Some(audience);
        }
        self
    }

    pub fn with_deprecated_key(mut self, key: DeprecatedKey) -> Self {
        self.deprecated_keys.push(key);
        self
    }

    pub fn with_required_claims(mut self, claims: Vec<String>) -> Self {
        if !claims.is_empty() {
            self.required_claims = claims;
        }
        self
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(ref iss) = self.issuer {
            validation.set_issuer(&[iss]);
        }
        if let Some(ref aud) = self.audience {
            validation.set_audience(&[aud]);
        }
        validation.required_spec_claims = self
            .required_claims
            .iter()
            .cloned()
            .collect::<std::collections::HashSet<_>>();
        validation
    }

    /// Verifies a token, trying the primary key then each non-expired
    /// deprecated key. Returns the decoded claims plus whether a
    /// deprecated key was used.
    fn verify(&self, token: &str) -> Result<(Claims, bool), String> {
        let validation = self.validation();

        let primary_key = DecodingKey::from_secret(self.primary_secret.as_bytes());
        if let Ok(data) = decode::<Claims>(token, &primary_key, &validation) {
            return Ok((data.claims, false));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        for key in &self.deprecated_keys {
            if key.is_expired(now) {
                continue;
            }
            let decoding_key = DecodingKey::from_secret(key.secret.as_bytes());
            if let Ok(data) = decode::<Claims>(token, &decoding_key, &validation) {
                return Ok((data.claims, true));
            }
        }

        Err("token signature invalid for all configured keys".to_string())
    }
}

fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?;
    let value = header.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// JWT authentication middleware factory.
///
/// # Examples
///
/// ```rust
/// use kairos_rs::middleware::auth::{JwtAuth, JwtConfig};
///
/// let config = JwtConfig::new("a-very-long-secret-used-for-signing".to_string());
/// let middleware = JwtAuth::new(config);
/// ```
#[derive(Clone)]
pub struct JwtAuth {
    config: Arc<JwtConfig>,
}

impl JwtAuth {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = JwtAuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(JwtAuthMiddleware {
            service: Arc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct JwtAuthMiddleware<S> {
    service: Arc<S>,
    config: Arc<JwtConfig>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();

        // OPTIONS preflights bypass auth so CORS can answer them.
        if req.method() == actix_web::http::Method::OPTIONS {
            return Box::pin(async move { service.call(req).await });
        }

        let Some(token) = extract_bearer_token(&req) else {
            return Box::pin(async move {
                Err(ActixError::from(crate::models::error::GatewayError::Unauthenticated {
                    message: "missing bearer token".to_string(),
                }))
            });
        };

        match config.verify(&token) {
            Ok((claims, used_deprecated_key)) => {
                if used_deprecated_key {
                    warn!("request authenticated with a deprecated JWT key, sub={}", claims.sub);
                } else {
                    debug!("request authenticated, sub={}", claims.sub);
                }
                req.extensions_mut().insert(claims);
                Box::pin(async move { service.call(req).await })
            }
            Err(reason) => Box::pin(async move {
                Err(ActixError::from(crate::models::error::GatewayError::Unauthenticated { message: reason }))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(secret: &str, sub: &str, exp_offset_secs: i64) -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + exp_offset_secs) as u64,
            iat: Some(now as u64),
            iss: None,
            aud: None,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn primary_key_verifies_without_deprecated_flag() {
        let config = JwtConfig::new("primary-secret-at-least-32-bytes!!".to_string());
        let token = token_for("primary-secret-at-least-32-bytes!!", "user-1", 3600);
        let (claims, used_deprecated) = config.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(!used_deprecated);
    }

    #[test]
    fn deprecated_key_verifies_and_is_flagged() {
        let config = JwtConfig::new("new-secret-at-least-32-bytes-long!!".to_string())
            .with_deprecated_key(DeprecatedKey {
                secret: "old-secret-at-least-32-bytes-long!!".to_string(),
                expires_at: None,
            });
        let token = token_for("old-secret-at-least-32-bytes-long!!", "user-2", 3600);
        let (claims, used_deprecated) = config.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-2");
        assert!(used_deprecated);
    }

    #[test]
    fn expired_deprecated_key_is_rejected() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let config = JwtConfig::new("new-secret-at-least-32-bytes-long!!".to_string())
            .with_deprecated_key(DeprecatedKey {
                secret: "old-secret-at-least-32-bytes-long!!".to_string(),
                expires_at: Some(now - 1),
            });
        let token = token_for("old-secret-at-least-32-bytes-long!!", "user-3", 3600);
        assert!(config.verify(&token).is_err());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let config = JwtConfig::new("new-secret-at-least-32-bytes-long!!".to_string());
        let token = token_for("totally-unknown-secret-at-least-32b", "user-4", 3600);
        assert!(config.verify(&token).is_err());
    }
}
