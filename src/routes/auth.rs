//! Authentication routes for the Weeb API
//!
//! This module contains HTTP route handlers for authentication endpoints:
//! - POST /api/register/ - Register with username/email/password
//! - POST /api/login/ - Login with username/password
//! - POST /api/token/ - Obtain an access/refresh token pair
//! - POST /api/token/refresh/ - Mint a new access token from a refresh token

use actix_web::{web, HttpResponse};
use tracing::info;

use crate::auth::{
    generate_token_pair, hash_password, refresh_access_token, verify_password, AuthError,
    TokenLifetimes, TokenPair,
};
use crate::db::{create_user, email_exists, find_user_by_username, username_exists};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::models::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, TokenRefreshRequest,
    TokenRefreshResponse, User,
};
use crate::routes::AppState;

/// Simple email validation using basic structural checks
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let local = parts[0];
    let domain = parts[1];

    // Local part must not be empty
    if local.is_empty() {
        return false;
    }

    // Domain must contain at least one dot and not be empty
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    // Domain parts must not be empty
    let domain_parts: Vec<&str> = domain.split('.').collect();
    if domain_parts.iter().any(|p| p.is_empty()) {
        return false;
    }

    true
}

/// Validate the request-local registration rules
///
/// Uniqueness is checked separately against the database; this covers the
/// rules that need no lookup: required username, well-formed email, password
/// length, confirmation match. Errors accumulate per field.
fn validate_registration_fields(body: &RegisterRequest, errors: &mut ValidationErrors) {
    if body.username.trim().is_empty() {
        errors.add("username", "Username is required.");
    }

    if !is_valid_email(&body.email) {
        errors.add("email", "Enter a valid email address.");
    }

    if body.password.chars().count() < 8 {
        errors.add("password", "Password must be at least 8 characters long.");
    }

    if body.password != body.confirm_password {
        errors.add("confirm_password", "Passwords do not match.");
    }
}

/// Resolve login credentials to a user
///
/// Field errors name the failing input: an unknown username or a password
/// that does not match its stored hash.
async fn authenticate(
    data: &web::Data<AppState>,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let pool = data.db.pool();

    let (user, password_hash) = match find_user_by_username(pool, username).await? {
        Some(found) => found,
        None => {
            return Err(AppError::field_error(
                "username",
                "Username does not exist.",
            ));
        }
    };

    if !verify_password(password, &password_hash)? {
        return Err(AppError::field_error("password", "Incorrect password."));
    }

    Ok(user)
}

fn token_lifetimes(data: &web::Data<AppState>) -> TokenLifetimes {
    TokenLifetimes::new(
        data.config.access_token_lifetime_mins,
        data.config.refresh_token_lifetime_days,
    )
}

/// POST /api/register/ - Register a new user
///
/// # Request Body
/// - username: Desired unique username (required)
/// - email: User's email address (required, must be unique and valid)
/// - password: User's password (required, min 8 characters)
/// - confirm_password: Must match password
///
/// # Responses
/// - 201: Registration successful
/// - 400: Field validation errors, mapping field name to messages
#[utoipa::path(
    post,
    path = "/api/register/",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Validation failed, field -> messages map")
    )
)]
pub async fn register(
    data: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let body = body.into_inner();

    let mut errors = ValidationErrors::new();
    validate_registration_fields(&body, &mut errors);

    // Friendly up-front uniqueness checks. The unique constraints still
    // enforce these at insert time; a lost race maps back to the same
    // field errors.
    if errors.field("username").is_none() && username_exists(pool, &body.username).await? {
        errors.add("username", "Username already exists.");
    }
    if errors.field("email").is_none() && email_exists(pool, &body.email).await? {
        errors.add("email", "Email already exists.");
    }

    errors.into_result()?;

    let password_hash = hash_password(&body.password)?;
    let user = create_user(pool, &body.username, &body.email, &password_hash).await?;

    info!("User registered: {}", user.username);

    Ok(HttpResponse::Created().json(RegisterResponse {
        message: "User registered successfully".to_string(),
        user_id: user.id,
        username: user.username,
        email: user.email,
    }))
}

/// POST /api/login/ - Login with username and password
///
/// # Request Body
/// - username: Username (required)
/// - password: Password (required)
///
/// # Responses
/// - 200: Login successful, returns the access/refresh token pair
/// - 400: Field validation errors
#[utoipa::path(
    post,
    path = "/api/login/",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation failed, field -> messages map")
    )
)]
pub async fn login(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let user = authenticate(&data, &body.username, &body.password).await?;

    let token = generate_token_pair(user.id, &data.config.jwt_secret, &token_lifetimes(&data))?;

    info!("User logged in: {}", user.username);

    Ok(HttpResponse::Ok().json(LoginResponse {
        message: "Login successful".to_string(),
        token,
    }))
}

/// POST /api/token/ - Obtain an access/refresh token pair
///
/// Same credential check as login; the response body is the bare pair.
///
/// # Responses
/// - 200: Token pair issued
/// - 400: Field validation errors
#[utoipa::path(
    post,
    path = "/api/token/",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Validation failed, field -> messages map")
    )
)]
pub async fn token_obtain_pair(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let user = authenticate(&data, &body.username, &body.password).await?;

    let token = generate_token_pair(user.id, &data.config.jwt_secret, &token_lifetimes(&data))?;

    Ok(HttpResponse::Ok().json(token))
}

/// POST /api/token/refresh/ - Mint a new access token from a refresh token
///
/// # Request Body
/// - refresh: A refresh token issued at login
///
/// # Responses
/// - 200: New access token issued
/// - 400: The refresh token is invalid, expired, or of the wrong type
#[utoipa::path(
    post,
    path = "/api/token/refresh/",
    tag = "auth",
    request_body = TokenRefreshRequest,
    responses(
        (status = 200, description = "New access token issued", body = TokenRefreshResponse),
        (status = 400, description = "Validation failed, field -> messages map")
    )
)]
pub async fn token_refresh(
    data: web::Data<AppState>,
    body: web::Json<TokenRefreshRequest>,
) -> AppResult<HttpResponse> {
    let access = refresh_access_token(
        &body.refresh,
        &data.config.jwt_secret,
        &token_lifetimes(&data),
    )
    .map_err(|e| match e {
        AuthError::TokenExpired => AppError::field_error("refresh", "Token has expired."),
        AuthError::WrongTokenType { .. } => {
            AppError::field_error("refresh", "Token is not a refresh token.")
        }
        AuthError::TokenVerificationError(_) | AuthError::InvalidToken => {
            AppError::field_error("refresh", "Token is invalid.")
        }
        other => AppError::Auth(other),
    })?;

    Ok(HttpResponse::Ok().json(TokenRefreshResponse { access }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_is_valid_email_valid() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name@domain.co.uk"));
        assert!(is_valid_email("user+tag@example.org"));
        assert!(is_valid_email("a@b.co"));
    }

    #[test]
    fn test_is_valid_email_invalid() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("test@.com"));
        assert!(!is_valid_email("test@example"));
        assert!(!is_valid_email("test@@example.com"));
        assert!(!is_valid_email("test@example..com"));
    }

    fn register_request(password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn test_short_password_fails_on_password_field() {
        let mut errors = ValidationErrors::new();
        validate_registration_fields(&register_request("short", "short"), &mut errors);

        assert_eq!(
            errors.field("password"),
            Some(&["Password must be at least 8 characters long.".to_string()][..])
        );
        assert!(errors.field("confirm_password").is_none());
    }

    #[test]
    fn test_eight_character_password_passes() {
        let mut errors = ValidationErrors::new();
        validate_registration_fields(&register_request("password", "password"), &mut errors);

        assert!(errors.is_empty());
    }

    #[test]
    fn test_mismatched_confirmation_fails_on_confirm_field() {
        let mut errors = ValidationErrors::new();
        validate_registration_fields(&register_request("password1", "password2"), &mut errors);

        assert_eq!(
            errors.field("confirm_password"),
            Some(&["Passwords do not match.".to_string()][..])
        );
        assert!(errors.field("password").is_none());
    }

    #[test]
    fn test_empty_username_fails() {
        let mut errors = ValidationErrors::new();
        let body = RegisterRequest {
            username: "   ".to_string(),
            email: "a@x.com".to_string(),
            password: "password1".to_string(),
            confirm_password: "password1".to_string(),
        };
        validate_registration_fields(&body, &mut errors);

        assert!(errors.field("username").is_some());
    }

    #[test]
    fn test_malformed_email_fails_on_email_field() {
        let mut errors = ValidationErrors::new();
        let body = RegisterRequest {
            username: "alice".to_string(),
            email: "not-an-email".to_string(),
            password: "password1".to_string(),
            confirm_password: "password1".to_string(),
        };
        validate_registration_fields(&body, &mut errors);

        assert!(errors.field("email").is_some());
    }

    #[test]
    fn test_all_failures_reported_together() {
        let mut errors = ValidationErrors::new();
        let body = RegisterRequest {
            username: "".to_string(),
            email: "bad".to_string(),
            password: "short".to_string(),
            confirm_password: "different".to_string(),
        };
        validate_registration_fields(&body, &mut errors);

        assert!(errors.field("username").is_some());
        assert!(errors.field("email").is_some());
        assert!(errors.field("password").is_some());
        assert!(errors.field("confirm_password").is_some());
    }

    proptest! {
        // The length rule counts characters, not bytes, and the boundary
        // sits exactly at 8.
        #[test]
        fn prop_password_length_rule(password in "\\PC{0,16}") {
            let mut errors = ValidationErrors::new();
            let body = register_request(&password, &password);
            validate_registration_fields(&body, &mut errors);

            let failed = errors.field("password").is_some();
            prop_assert_eq!(failed, password.chars().count() < 8);
        }

        #[test]
        fn prop_matching_confirmation_never_fails_confirm(password in "\\PC{8,32}") {
            let mut errors = ValidationErrors::new();
            let body = register_request(&password, &password);
            validate_registration_fields(&body, &mut errors);

            prop_assert!(errors.field("confirm_password").is_none());
        }
    }
}
