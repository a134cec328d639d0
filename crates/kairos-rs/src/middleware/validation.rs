//! Input validation middleware.
//!
//! Best-effort heuristic checks against path traversal, disallowed path
//! characters, malformed header tokens, and SQL/XSS/command-injection
//! query-parameter patterns. False positives are acceptable: this is a
//! defense-in-depth layer, not a parser.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error as ActixError,
};
use futures::future::{LocalBoxFuture, Ready};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    sync::Arc,
    task::{Context, Poll},
};

use crate::models::error::GatewayError;

/// Configuration for the input validator.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Characters allowed in the decoded path beyond alphanumerics.
    pub allowed_path_chars: String,
    /// Reject query parameters matching these compiled patterns.
    pub check_sql_injection: bool,
    pub check_xss: bool,
    pub check_command_injection: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_path_chars: "/-_.~%:@!$&'()*+,;=".to_string(),
            check_sql_injection: true,
            check_xss: true,
            check_command_injection: true,
        }
    }
}

static SQL_INJECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\bunion\b.+\bselect\b|\bselect\b.+\bfrom\b|\bdrop\b\s+\btable\b|;\s*--|\bor\b\s+1\s*=\s*1)").unwrap()
});
static XSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(<script|javascript:|onerror\s*=|onload\s*=)").unwrap());
static COMMAND_INJECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;&|`$]|\$\(|\bnc\b|\bwget\b|\bcurl\b").unwrap());
static HEADER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").unwrap());

fn path_has_traversal(path: &str) -> bool {
    let decoded = path.replace("%2e", ".").replace("%2E", ".").replace("%2f", "/").replace("%2F", "/");
    decoded.contains("..") || path.contains('\0')
}

fn path_has_disallowed_chars(path: &str, allowed_extra: &str) -> bool {
    path.chars().any(|c| !(c.is_alphanumeric() || allowed_extra.contains(c)))
}

fn header_name_is_malformed(name: &str) -> bool {
    !HEADER_TOKEN.is_match(name)
}

fn query_value_is_suspicious(value: &str, config: &ValidationConfig) -> bool {
    (config.check_sql_injection && SQL_INJECTION.is_match(value))
        || (config.check_xss && XSS.is_match(value))
        || (config.check_command_injection && COMMAND_INJECTION.is_match(value))
}

/// Input-validation middleware factory.
#[derive(Clone)]
pub struct InputValidator {
    config: Arc<ValidationConfig>,
}

impl InputValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for InputValidator
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = InputValidatorMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(InputValidatorMiddleware {
            service: Arc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct InputValidatorMiddleware<S> {
    service: Arc<S>,
    config: Arc<ValidationConfig>,
}

impl<S, B> Service<ServiceRequest> for InputValidatorMiddleware<S>
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

        let path = req.path().to_string();
        if path_has_traversal(&path) {
            debug!("rejecting request with path traversal attempt: {}", path);
            return Box::pin(async move {
                Err(ActixError::from(GatewayError::InputError {
                    message: "path traversal sequence not allowed".to_string(),
                }))
            });
        }
        if path_has_disallowed_chars(&path, &config.allowed_path_chars) {
            debug!("rejecting request with disallowed path characters: {}", path);
            return Box::pin(async move {
                Err(ActixError::from(GatewayError::InputError {
                    message: "path contains disallowed characters".to_string(),
                }))
            });
        }

        for (name, _) in req.headers().iter() {
            if header_name_is_malformed(name.as_str()) {
                let name = name.as_str().to_string();
                return Box::pin(async move {
                    Err(ActixError::from(GatewayError::InputError {
                        message: format!("malformed header name: {}", name),
                    }))
                });
            }
        }

        for pair in req.query_string().split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if query_value_is_suspicious(value, &config) {
                debug!("rejecting request with suspicious query parameter: {}", key);
                let key = key.to_string();
                return Box::pin(async move {
                    Err(ActixError::from(GatewayError::InputError {
                        message: format!("query parameter '{}' rejected by input validator", key),
                    }))
                });
            }
        }

        Box::pin(async move { service.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dotdot_traversal() {
        assert!(path_has_traversal("/api/../etc/passwd"));
    }

    #[test]
    fn detects_encoded_traversal() {
        assert!(path_has_traversal("/api/%2e%2e/etc/passwd"));
    }

    #[test]
    fn normal_path_is_clean() {
        assert!(!path_has_traversal("/api/users/123"));
    }

    #[test]
    fn detects_sql_injection_pattern() {
        let config = ValidationConfig::default();
        assert!(query_value_is_suspicious("1' OR 1=1 --", &config));
    }

    #[test]
    fn detects_xss_pattern() {
        let config = ValidationConfig::default();
        assert!(query_value_is_suspicious("<script>alert(1)</script>", &config));
    }

    #[test]
    fn benign_value_passes() {
        let config = ValidationConfig::default();
        assert!(!query_value_is_suspicious("hello world", &config));
    }

    #[test]
    fn malformed_header_name_is_rejected() {
        assert!(header_name_is_malformed("bad header"));
        assert!(!header_name_is_malformed("x-request-id"));
    }
}
