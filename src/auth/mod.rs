//! Authentication module for the Weeb API
//!
//! This module provides authentication functionality including:
//! - Password hashing with bcrypt
//! - JWT access/refresh token pair generation and verification
//! - Authentication extractor for protected routes

use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::ApiError;

/// Default bcrypt cost factor (12 is recommended for production)
const BCRYPT_COST: u32 = 12;

/// Claim value for access tokens
pub const TOKEN_TYPE_ACCESS: &str = "access";

/// Claim value for refresh tokens
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Token generation failed: {0}")]
    TokenGenerationError(String),

    #[error("Token verification failed: {0}")]
    TokenVerificationError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Wrong token type: expected {expected}, got {got}")]
    WrongTokenType { expected: &'static str, got: String },

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: i32,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Token type: "access" or "refresh"
    pub token_type: String,
}

/// A signed access/refresh token pair
///
/// The access token authorizes individual API calls for a short window;
/// the refresh token mints new access tokens without re-authenticating.
/// Neither is persisted server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TokenPair {
    /// Short-lived access token
    pub access: String,
    /// Longer-lived refresh token
    pub refresh: String,
}

/// Lifetimes used when signing a token pair
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    /// Access token validity window
    pub access: Duration,
    /// Refresh token validity window
    pub refresh: Duration,
}

impl TokenLifetimes {
    /// Build lifetimes from the configured minutes/days values
    pub fn new(access_mins: i64, refresh_days: i64) -> Self {
        Self {
            access: Duration::minutes(access_mins),
            refresh: Duration::days(refresh_days),
        }
    }
}

/// Authenticated user info extracted from JWT
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// User ID from the JWT
    pub user_id: i32,
}

/// Hash a password using bcrypt
///
/// # Arguments
/// * `password` - The plain text password to hash
///
/// # Returns
/// * `Ok(String)` - The hashed password
/// * `Err(AuthError)` - If hashing fails
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| AuthError::HashingError(e.to_string()))
}

/// Verify a password against a bcrypt hash
///
/// # Arguments
/// * `password` - The plain text password to verify
/// * `hash` - The bcrypt hash to verify against
///
/// # Returns
/// * `Ok(true)` - If the password matches
/// * `Ok(false)` - If the password doesn't match
/// * `Err(AuthError)` - If verification fails
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::HashingError(e.to_string()))
}

/// Generate a single signed token with the given type and lifetime
fn generate_token(
    user_id: i32,
    secret: &str,
    token_type: &str,
    lifetime: Duration,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let expiry = now + lifetime;

    let claims = Claims {
        sub: user_id,
        exp: expiry.timestamp(),
        iat: now.timestamp(),
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
}

/// Generate a signed access/refresh token pair for a user
///
/// # Arguments
/// * `user_id` - The user's ID to encode in both tokens
/// * `secret` - The JWT secret key for signing
/// * `lifetimes` - Access and refresh validity windows
pub fn generate_token_pair(
    user_id: i32,
    secret: &str,
    lifetimes: &TokenLifetimes,
) -> Result<TokenPair, AuthError> {
    Ok(TokenPair {
        access: generate_token(user_id, secret, TOKEN_TYPE_ACCESS, lifetimes.access)?,
        refresh: generate_token(user_id, secret, TOKEN_TYPE_REFRESH, lifetimes.refresh)?,
    })
}

/// Mint a new access token from a verified refresh token
pub fn refresh_access_token(
    refresh_token: &str,
    secret: &str,
    lifetimes: &TokenLifetimes,
) -> Result<String, AuthError> {
    let claims = verify_refresh_token(refresh_token, secret)?;
    generate_token(claims.sub, secret, TOKEN_TYPE_ACCESS, lifetimes.access)
}

/// Verify and decode a JWT token
///
/// Expiry is checked with zero leeway, so a token is rejected the moment
/// its `exp` passes.
///
/// # Returns
/// * `Ok(Claims)` - The decoded claims if the signature and expiry are valid
/// * `Err(AuthError)` - If verification fails or the token is expired
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data: TokenData<Claims> = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenVerificationError(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Verify a token and require it to be an access token
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let claims = verify_token(token, secret)?;
    if claims.token_type != TOKEN_TYPE_ACCESS {
        return Err(AuthError::WrongTokenType {
            expected: TOKEN_TYPE_ACCESS,
            got: claims.token_type,
        });
    }
    Ok(claims)
}

/// Verify a token and require it to be a refresh token
pub fn verify_refresh_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let claims = verify_token(token, secret)?;
    if claims.token_type != TOKEN_TYPE_REFRESH {
        return Err(AuthError::WrongTokenType {
            expected: TOKEN_TYPE_REFRESH,
            got: claims.token_type,
        });
    }
    Ok(claims)
}

/// Extract JWT token from Authorization header
///
/// # Arguments
/// * `auth_header` - The Authorization header value
///
/// # Returns
/// * `Ok(&str)` - The extracted token
/// * `Err(AuthError)` - If the header format is invalid
pub fn extract_token_from_header(auth_header: &str) -> Result<&str, AuthError> {
    if !auth_header.starts_with("Bearer ") {
        return Err(AuthError::InvalidAuthHeaderFormat);
    }

    let token = auth_header.trim_start_matches("Bearer ").trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeaderFormat);
    }

    Ok(token)
}

/// Validate an HTTP request and extract the authenticated user
///
/// This function extracts the JWT from the Authorization header,
/// verifies it as an access token, and returns the authenticated user info.
pub fn validate_http_request(
    req: &HttpRequest,
    secret: &str,
) -> Result<AuthenticatedUser, AuthError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_access_token(token, secret)?;

    Ok(AuthenticatedUser {
        user_id: claims.sub,
    })
}

/// Configuration for the auth extractor
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key
    pub jwt_secret: String,
}

/// Authenticated user extractor for Actix-web routes
///
/// This extractor can be used in route handlers to require authentication.
/// It extracts the JWT from the Authorization header, verifies it as an
/// access token, and provides the authenticated user info.
///
/// # Example
/// ```ignore
/// async fn protected_route(user: Auth) -> impl Responder {
///     HttpResponse::Ok().json(format!("Hello, user {}", user.user_id))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Auth {
    /// The authenticated user's ID
    pub user_id: i32,
}

impl FromRequest for Auth {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        // Get the JWT secret from app data
        let config = req.app_data::<web::Data<AuthConfig>>();

        let result = match config {
            Some(config) => match validate_http_request(req, &config.jwt_secret) {
                Ok(user) => Ok(Auth {
                    user_id: user.user_id,
                }),
                Err(e) => {
                    let error_response = match &e {
                        AuthError::MissingAuthHeader => HttpResponse::Unauthorized()
                            .json(ApiError::new("Missing authorization header")),
                        AuthError::InvalidAuthHeaderFormat => HttpResponse::Unauthorized()
                            .json(ApiError::new("Invalid authorization header format")),
                        AuthError::TokenExpired => {
                            HttpResponse::Unauthorized().json(ApiError::new("Token expired"))
                        }
                        AuthError::WrongTokenType { .. } => HttpResponse::Unauthorized()
                            .json(ApiError::new("Access token required")),
                        AuthError::TokenVerificationError(_) | AuthError::InvalidToken => {
                            HttpResponse::Unauthorized().json(ApiError::new("Invalid token"))
                        }
                        _ => HttpResponse::Unauthorized()
                            .json(ApiError::new("Authentication failed")),
                    };
                    Err(actix_web::error::InternalError::from_response(e, error_response).into())
                }
            },
            None => {
                let error_response = HttpResponse::InternalServerError()
                    .json(ApiError::new("Auth configuration not found"));
                Err(actix_web::error::InternalError::from_response(
                    AuthError::TokenVerificationError("Config not found".to_string()),
                    error_response,
                )
                .into())
            }
        };

        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifetimes() -> TokenLifetimes {
        TokenLifetimes::new(5, 1)
    }

    #[test]
    fn test_hash_password_creates_valid_hash() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        // Hash should not be empty
        assert!(!hash.is_empty());
        // Hash should start with bcrypt identifier
        assert!(hash.starts_with("$2"));
        // Hash should be different from password
        assert_ne!(hash, password);
    }

    #[test]
    fn test_hash_password_different_hashes_for_same_password() {
        let password = "same_password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // Due to salt, hashes should be different
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct_password() {
        let password = "correct_password";
        let hash = hash_password(password).unwrap();

        let result = verify_password(password, &hash).unwrap();
        assert!(result);
    }

    #[test]
    fn test_verify_password_incorrect_password() {
        let password = "correct_password";
        let wrong_password = "wrong_password";
        let hash = hash_password(password).unwrap();

        let result = verify_password(wrong_password, &hash).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_verify_password_unicode_password() {
        let password = "пароль_密码_🔐";
        let hash = hash_password(password).unwrap();

        let result = verify_password(password, &hash).unwrap();
        assert!(result);
    }

    #[test]
    fn test_generate_token_pair_creates_valid_tokens() {
        let pair = generate_token_pair(42, "test_secret_key", &lifetimes()).unwrap();

        // Both tokens should have 3 parts (header.payload.signature)
        assert_eq!(pair.access.split('.').count(), 3);
        assert_eq!(pair.refresh.split('.').count(), 3);
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn test_token_pair_verifies_against_signing_key() {
        let secret = "test_secret_key";
        let pair = generate_token_pair(123, secret, &lifetimes()).unwrap();

        let access = verify_token(&pair.access, secret).unwrap();
        let refresh = verify_token(&pair.refresh, secret).unwrap();

        assert_eq!(access.sub, 123);
        assert_eq!(refresh.sub, 123);
        assert_eq!(access.token_type, TOKEN_TYPE_ACCESS);
        assert_eq!(refresh.token_type, TOKEN_TYPE_REFRESH);
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let pair = generate_token_pair(123, "correct_secret", &lifetimes()).unwrap();
        let result = verify_token(&pair.access, "wrong_secret");

        assert!(result.is_err());
    }

    #[test]
    fn test_verify_token_invalid_token() {
        let result = verify_token("invalid.token.here", "test_secret");

        assert!(result.is_err());
    }

    #[test]
    fn test_expired_access_token_is_rejected() {
        let secret = "test_secret";
        let expired = TokenLifetimes {
            access: Duration::seconds(-30),
            refresh: Duration::days(1),
        };
        let pair = generate_token_pair(7, secret, &expired).unwrap();

        let result = verify_token(&pair.access, secret);
        assert!(matches!(result, Err(AuthError::TokenExpired)));

        // The refresh token from the same pair is still valid
        assert!(verify_refresh_token(&pair.refresh, secret).is_ok());
    }

    #[test]
    fn test_access_token_rejected_as_refresh() {
        let secret = "test_secret";
        let pair = generate_token_pair(9, secret, &lifetimes()).unwrap();

        let result = verify_refresh_token(&pair.access, secret);
        assert!(matches!(result, Err(AuthError::WrongTokenType { .. })));
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let secret = "test_secret";
        let pair = generate_token_pair(9, secret, &lifetimes()).unwrap();

        let result = verify_access_token(&pair.refresh, secret);
        assert!(matches!(result, Err(AuthError::WrongTokenType { .. })));
    }

    #[test]
    fn test_refresh_access_token_mints_new_access() {
        let secret = "test_secret";
        let pair = generate_token_pair(55, secret, &lifetimes()).unwrap();

        let access = refresh_access_token(&pair.refresh, secret, &lifetimes()).unwrap();
        let claims = verify_access_token(&access, secret).unwrap();

        assert_eq!(claims.sub, 55);
    }

    #[test]
    fn test_refresh_access_token_rejects_access_token() {
        let secret = "test_secret";
        let pair = generate_token_pair(55, secret, &lifetimes()).unwrap();

        let result = refresh_access_token(&pair.access, secret, &lifetimes());
        assert!(matches!(result, Err(AuthError::WrongTokenType { .. })));
    }

    #[test]
    fn test_refresh_access_token_rejects_expired_refresh() {
        let secret = "test_secret";
        let expired = TokenLifetimes {
            access: Duration::minutes(5),
            refresh: Duration::seconds(-30),
        };
        let pair = generate_token_pair(55, secret, &expired).unwrap();

        let result = refresh_access_token(&pair.refresh, secret, &lifetimes());
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_token_contains_correct_claims() {
        let secret = "test_secret";
        let pair = generate_token_pair(999, secret, &lifetimes()).unwrap();
        let claims = verify_token(&pair.access, secret).unwrap();

        assert_eq!(claims.sub, 999);
        assert!(claims.iat > 0);
        assert!(claims.exp > claims.iat);
        // Expiry should be approximately 5 minutes from now
        let expected_expiry = claims.iat + 5 * 60;
        assert!((claims.exp - expected_expiry).abs() < 60);
    }

    #[test]
    fn test_extract_token_valid_header() {
        let header = "Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test";
        let token = extract_token_from_header(header).unwrap();

        assert_eq!(token, "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test");
    }

    #[test]
    fn test_extract_token_missing_bearer() {
        let header = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.test";
        let result = extract_token_from_header(header);

        assert!(matches!(result, Err(AuthError::InvalidAuthHeaderFormat)));
    }

    #[test]
    fn test_extract_token_empty_token() {
        let header = "Bearer ";
        let result = extract_token_from_header(header);

        assert!(matches!(result, Err(AuthError::InvalidAuthHeaderFormat)));
    }

    #[test]
    fn test_extract_token_lowercase_bearer() {
        let header = "bearer token123";
        let result = extract_token_from_header(header);

        // "Bearer" is case-sensitive
        assert!(matches!(result, Err(AuthError::InvalidAuthHeaderFormat)));
    }

    #[test]
    fn test_extract_token_with_extra_spaces() {
        let header = "Bearer   token123  ";
        let token = extract_token_from_header(header).unwrap();

        assert_eq!(token, "token123");
    }

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
        assert_eq!(AuthError::TokenExpired.to_string(), "Token expired");
        assert_eq!(
            AuthError::MissingAuthHeader.to_string(),
            "Missing authorization header"
        );
    }
}
