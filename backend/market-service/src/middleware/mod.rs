/// HTTP middleware utilities for market-service
///
/// Provides optional-bearer JWT authentication and ownership checks. Tokens
/// are issued elsewhere; this service only validates them.
pub mod permissions;

pub use permissions::*;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;

// =====================================================================
// JWT Authentication
// =====================================================================

/// Access-token claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Extracted user identifier stored in request extensions after auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub Uuid);

/// Validate an HS256 token and return the user it was issued to.
pub fn validate_token(token: &str, key: &DecodingKey) -> Result<Uuid, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, key, &validation)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    Uuid::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID".to_string()))
}

/// Actix middleware that validates a Bearer token when one is present.
///
/// Requests without an `Authorization` header pass through anonymously;
/// handlers that need a user take [`UserId`] as an extractor.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    key: Arc<DecodingKey>,
}

impl JwtAuthMiddleware {
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            key: Arc::clone(&self.key),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    key: Arc<DecodingKey>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let key = Arc::clone(&self.key);

        Box::pin(async move {
            let auth_header = req
                .headers()
                .get("Authorization")
                .map(|h| h.to_str().unwrap_or_default().to_string());

            if let Some(header) = auth_header {
                let token = header.strip_prefix("Bearer ").ok_or_else(|| {
                    AppError::Unauthorized("Invalid Authorization scheme".to_string())
                })?;
                let user_id = validate_token(token, &key)?;
                req.extensions_mut().insert(UserId(user_id));
            }

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(sub: &str, exp: i64) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: sub.to_string(),
                exp,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_valid_token_yields_user() {
        let user = Uuid::new_v4();
        let key = DecodingKey::from_secret(SECRET.as_bytes());
        assert_eq!(
            validate_token(&token(&user.to_string(), far_future()), &key).unwrap(),
            user
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let key = DecodingKey::from_secret(b"other-secret");
        let result = validate_token(&token(&Uuid::new_v4().to_string(), far_future()), &key);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let key = DecodingKey::from_secret(SECRET.as_bytes());
        let expired = chrono::Utc::now().timestamp() - 3600;
        assert!(validate_token(&token(&Uuid::new_v4().to_string(), expired), &key).is_err());
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let key = DecodingKey::from_secret(SECRET.as_bytes());
        assert!(validate_token(&token("alice", far_future()), &key).is_err());
    }
}
