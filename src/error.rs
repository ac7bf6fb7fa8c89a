//! Global error handling module for the Weeb API
//!
//! This module provides a unified error type that handles all application
//! errors and converts them to appropriate HTTP responses, plus the
//! field-level validation error map returned by the credential validator.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::auth::AuthError;
use crate::db::{DbError, RepositoryError};
use crate::models::ApiError;

/// Field-level validation errors
///
/// Serializes directly as the 400 response body, mapping each field name to
/// its list of messages, e.g. `{"username": ["Username already exists."]}`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Create an empty error map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error map with a single field error
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Whether any field has an error
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded against a field, if any
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(|v| v.as_slice())
    }

    /// Convert into the error type, or `Ok(())` when no field failed
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Application-wide error type that unifies all error sources
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication-related errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Repository-related errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Field-level validation errors (bad request)
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate resource)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// SQLx database errors (direct)
    #[error("Database query error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl AppError {
    /// Create a validation error for a single field
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(ValidationErrors::single(field, message))
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - field validation failures
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized - authentication errors
            AppError::Auth(auth_err) => match auth_err {
                AuthError::InvalidCredentials
                | AuthError::TokenExpired
                | AuthError::InvalidToken
                | AuthError::WrongTokenType { .. }
                | AuthError::MissingAuthHeader
                | AuthError::InvalidAuthHeaderFormat
                | AuthError::TokenVerificationError(_) => StatusCode::UNAUTHORIZED,
                // Other auth errors are internal
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },

            // 404 Not Found
            AppError::NotFound(_) | AppError::Repository(RepositoryError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }

            // 409 Conflict
            AppError::Conflict(_) | AppError::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }

            // Unique-constraint races on registration surface as field errors
            AppError::Repository(RepositoryError::UsernameTaken)
            | AppError::Repository(RepositoryError::EmailTaken) => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(errors) => errors.to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),

            AppError::Auth(auth_err) => match auth_err {
                AuthError::InvalidCredentials => "Invalid username or password".to_string(),
                AuthError::TokenExpired => "Token has expired, please login again".to_string(),
                AuthError::InvalidToken => "Invalid authentication token".to_string(),
                AuthError::WrongTokenType { expected, .. } => {
                    format!("Expected an {} token", expected)
                }
                AuthError::MissingAuthHeader => "Authorization header is required".to_string(),
                AuthError::InvalidAuthHeaderFormat => {
                    "Invalid authorization header format, expected 'Bearer <token>'".to_string()
                }
                AuthError::TokenVerificationError(_) => "Invalid authentication token".to_string(),
                AuthError::HashingError(_) => "Authentication processing error".to_string(),
                AuthError::TokenGenerationError(_) => {
                    "Failed to generate authentication token".to_string()
                }
            },

            AppError::Repository(repo_err) => match repo_err {
                RepositoryError::NotFound(msg) => msg.clone(),
                RepositoryError::Conflict(msg) => msg.clone(),
                RepositoryError::UsernameTaken => "Username already exists.".to_string(),
                RepositoryError::EmailTaken => "Email already exists.".to_string(),
                RepositoryError::DatabaseError(_) => "Database operation failed".to_string(),
            },

            AppError::Database(db_err) => match db_err {
                DbError::ConnectionError(_) => "Database connection error".to_string(),
                DbError::MigrationError(_) => "Database migration failed".to_string(),
                DbError::HealthCheckError(_) => "Database health check failed".to_string(),
            },

            AppError::SqlxError(_) => "Database operation failed".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // Validation failures serialize the raw field -> messages map
            AppError::Validation(errors) => HttpResponse::BadRequest().json(errors),
            AppError::Repository(RepositoryError::UsernameTaken) => HttpResponse::BadRequest()
                .json(ValidationErrors::single(
                    "username",
                    "Username already exists.",
                )),
            AppError::Repository(RepositoryError::EmailTaken) => HttpResponse::BadRequest()
                .json(ValidationErrors::single("email", "Email already exists.")),
            _ => {
                let status = self.status_code();
                HttpResponse::build(status).json(ApiError::new(self.user_message()))
            }
        }
    }
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_serialize_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("username", "Username already exists.");
        errors.add("password", "Password must be at least 8 characters long.");

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(
            json,
            r#"{"password":["Password must be at least 8 characters long."],"username":["Username already exists."]}"#
        );
    }

    #[test]
    fn test_validation_errors_accumulate_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("password", "first");
        errors.add("password", "second");

        assert_eq!(
            errors.field("password"),
            Some(&["first".to_string(), "second".to_string()][..])
        );
        assert_eq!(errors.field("username"), None);
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let result = ValidationErrors::single("email", "Email already exists.").into_result();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::field_error("username", "Username already exists.");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::not_found("Anime not found");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_error_status_code() {
        let error = AppError::conflict("Tag already attached");
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_error_status_code() {
        let error = AppError::internal("Something went wrong");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_error_unauthorized() {
        let error = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let error = AppError::Auth(AuthError::TokenExpired);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let error = AppError::Auth(AuthError::MissingAuthHeader);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_unique_violation_maps_to_bad_request() {
        let error = AppError::Repository(RepositoryError::UsernameTaken);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);

        let error = AppError::Repository(RepositoryError::EmailTaken);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_repository_conflict_maps_to_conflict() {
        let error = AppError::Repository(RepositoryError::Conflict("dup".to_string()));
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_error_user_messages() {
        let error = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(error.user_message(), "Invalid username or password");

        let error = AppError::Auth(AuthError::TokenExpired);
        assert_eq!(error.user_message(), "Token has expired, please login again");
    }

    #[test]
    fn test_error_display() {
        let error = AppError::field_error("username", "Username already exists.");
        assert_eq!(
            format!("{}", error),
            "Validation error: username: Username already exists."
        );

        let error = AppError::not_found("anime");
        assert_eq!(format!("{}", error), "Not found: anime");
    }

    #[test]
    fn test_from_auth_error() {
        let auth_err = AuthError::InvalidCredentials;
        let app_err: AppError = auth_err.into();
        assert!(matches!(app_err, AppError::Auth(_)));
    }

    #[test]
    fn test_from_db_error() {
        let db_err = DbError::HealthCheckError("test".to_string());
        let app_err: AppError = db_err.into();
        assert!(matches!(app_err, AppError::Database(_)));
    }
}
