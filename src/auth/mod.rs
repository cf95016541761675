/*!
 * Authentication and authorization.
 *
 * JWT bearer tokens (HS256) carry the user's identity and role. Passwords
 * are hashed with Argon2id. Route protection is layered through
 * [`AuthRouterExt`]: `with_auth` validates the token and injects an
 * [`AuthUser`] into request extensions, `with_role` additionally requires a
 * specific role.
 */

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user;
use crate::errors::ServiceError;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
}

/// Authenticated user data extracted from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(user::ROLE_ADMIN)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
        }
    }
}

/// Issued-token response body
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Handles token issuance, token validation and password hashing.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| ServiceError::Internal("invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("token creation failed: {}", e)))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
            _ => ServiceError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))
    }

    /// Constant-time verification against a stored hash. A malformed stored
    /// hash is treated as a mismatch, not an internal error.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

fn bearer_token(request: &Request) -> Result<String, ServiceError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServiceError::InvalidToken)?;

    header_value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .ok_or(ServiceError::InvalidToken)
}

/// Authentication middleware: validates the bearer token and stores the
/// resulting [`AuthUser`] in request extensions.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = bearer_token(&request)?;
    let claims = auth_service.validate_token(&token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::InvalidToken)?;
    let auth_user = AuthUser {
        user_id,
        name: claims.name,
        email: claims.email,
        role: claims.role,
        token_id: claims.jti,
    };

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Role middleware: requires an already-authenticated user with the given role.
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(ServiceError::InvalidToken)?;

    if !user.has_role(&required_role) {
        return Err(ServiceError::Forbidden(format!(
            "requires role '{}'",
            required_role
        )));
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self, auth: Arc<AuthService>) -> Self;
    fn with_role(self, auth: Arc<AuthService>, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, auth: Arc<AuthService>) -> Self {
        self.layer(axum::middleware::from_fn_with_state(auth, auth_middleware))
    }

    fn with_role(self, auth: Arc<AuthService>, role: &str) -> Self {
        // Layers run outermost-first, so auth runs before the role check.
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn test_service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "unit_test_secret_0123456789_0123456789".into(),
            jwt_issuer: "stocktrack-api".into(),
            access_token_expiration: Duration::from_secs(3600),
        })
    }

    fn test_user() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "alex@example.com".into(),
            password_hash: String::new(),
            name: "Alex".into(),
            role: user::ROLE_USER.into(),
            status: user::STATUS_ACTIVE.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let svc = test_service();
        let user = test_user();

        let token = svc.generate_token(&user).unwrap();
        let claims = svc.validate_token(&token.access_token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, user::ROLE_USER);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let svc = test_service();
        let other = AuthService::new(AuthConfig {
            jwt_secret: "a_completely_different_secret_9876543210".into(),
            jwt_issuer: "stocktrack-api".into(),
            access_token_expiration: Duration::from_secs(3600),
        });

        let token = other.generate_token(&test_user()).unwrap();
        let err = svc.validate_token(&token.access_token).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken));
    }

    #[test]
    fn expired_token_maps_to_token_expired() {
        let svc = test_service();
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: "x".into(),
            email: "x@example.com".into(),
            role: user::ROLE_USER.into(),
            jti: Uuid::new_v4().to_string(),
            iat: (now - ChronoDuration::hours(2)).timestamp(),
            exp: (now - ChronoDuration::hours(1)).timestamp(),
            nbf: (now - ChronoDuration::hours(2)).timestamp(),
            iss: "stocktrack-api".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret("unit_test_secret_0123456789_0123456789".as_bytes()),
        )
        .unwrap();

        let err = svc.validate_token(&token).unwrap_err();
        assert!(matches!(err, ServiceError::TokenExpired));
    }

    #[test]
    fn password_verification_round_trip() {
        let svc = test_service();
        let hash = svc.hash_password("correct horse battery staple").unwrap();

        assert!(svc.verify_password("correct horse battery staple", &hash));
        assert!(!svc.verify_password("wrong password", &hash));
        assert!(!svc.verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn issued_at_is_reasonable() {
        let svc = test_service();
        let token = svc.generate_token(&test_user()).unwrap();
        let claims = svc.validate_token(&token.access_token).unwrap();
        let iat = DateTime::from_timestamp(claims.iat, 0).unwrap();
        assert!((Utc::now() - iat).num_seconds().abs() < 60);
    }
}
