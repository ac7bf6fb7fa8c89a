//! Data models for the Weeb API
//!
//! This module contains all data structures used throughout the application:
//! domain entities (users, anime, genres, studios, list entries, reviews,
//! tags), API request bodies, and response wrappers.
//!
//! JSON field names follow the wire format of the public API (snake_case),
//! e.g. `confirm_password`, `user_id`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use crate::auth::TokenPair;

/// Represents a user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct User {
    /// User ID
    pub id: i32,
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// An anime catalog entry
///
/// `average_rating` is derivative data: `rating_total / rating_count`
/// computed on read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Anime {
    /// Anime ID
    pub id: i32,
    /// Title
    pub title: String,
    /// TV, OVA, Movie, etc.
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    /// Synopsis text
    pub synopsis: Option<String>,
    /// Total episode count, if known
    pub total_episodes: Option<i32>,
    /// Airing status (Ongoing, Completed, etc.)
    pub status: Option<String>,
    /// First air date
    pub aired_from: Option<NaiveDate>,
    /// Last air date
    pub aired_to: Option<NaiveDate>,
    /// Cover image URL
    pub image_url: Option<String>,
    /// Average review score, 0.0 when unrated
    pub average_rating: f64,
    /// Number of reviews contributing to the average
    pub rating_count: i32,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
}

/// Anime detail with its many-to-many relations resolved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AnimeDetail {
    /// The anime row
    #[serde(flatten)]
    pub anime: Anime,
    /// Genre names attached via join records
    pub genres: Vec<String>,
    /// Studio names attached via join records
    pub studios: Vec<String>,
}

/// A genre label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// An animation studio
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Studio {
    pub id: i32,
    pub name: String,
}

/// A list status (watching, completed, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ListStatus {
    pub id: i32,
    pub name: String,
}

/// One entry on a user's anime list
///
/// At most one entry exists per (user, anime) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ListEntry {
    /// Entry ID
    pub id: i32,
    /// The anime this entry tracks
    pub anime_id: i32,
    /// Anime title for display
    pub anime_title: String,
    /// List status name (watching, completed, ...)
    pub status: String,
    /// User's score for the anime, if given
    pub score: Option<i16>,
    /// Episodes watched so far
    pub episodes_watched: i32,
    /// When the user started watching
    pub start_date: Option<NaiveDate>,
    /// When the user finished watching
    pub finish_date: Option<NaiveDate>,
    /// Watch priority
    pub priority: i16,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// A scored text review of an anime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Review {
    /// Review ID
    pub id: i32,
    /// Reviewing user's ID
    pub user_id: i32,
    /// Reviewing user's name for display
    pub username: String,
    /// Reviewed anime ID
    pub anime_id: i32,
    /// Score, 1-10
    pub score: i16,
    /// Review body
    pub review_text: String,
    /// When the review was written
    pub created_at: DateTime<Utc>,
    /// When the review was last edited
    pub updated_at: DateTime<Utc>,
}

/// A user-scoped label attachable to list entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

// ============================================================================
// Request Bodies
// ============================================================================

/// Request body for user registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RegisterRequest {
    /// Desired unique username
    pub username: String,
    /// User email address
    pub email: String,
    /// User password (min 8 characters)
    pub password: String,
    /// Confirmation, must match password
    pub confirm_password: String,
}

/// Request body for user login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LoginRequest {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

/// Request body for the token refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TokenRefreshRequest {
    /// A refresh token issued at login
    pub refresh: String,
}

/// Request body for creating an anime
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CreateAnimeRequest {
    /// Title (required)
    pub title: String,
    /// TV, OVA, Movie, etc.
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    /// Synopsis text
    pub synopsis: Option<String>,
    /// Total episode count
    pub total_episodes: Option<i32>,
    /// Airing status
    pub status: Option<String>,
    /// First air date
    pub aired_from: Option<NaiveDate>,
    /// Last air date
    pub aired_to: Option<NaiveDate>,
    /// Cover image URL
    pub image_url: Option<String>,
    /// Genre names to attach (created if missing)
    #[serde(default)]
    pub genres: Vec<String>,
    /// Studio names to attach (created if missing)
    #[serde(default)]
    pub studios: Vec<String>,
}

/// Request body for creating or updating a list entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct UpsertListEntryRequest {
    /// List status name (watching, completed, ...)
    pub status: String,
    /// Score for the anime
    pub score: Option<i16>,
    /// Episodes watched so far
    #[serde(default)]
    pub episodes_watched: i32,
    /// When the user started watching
    pub start_date: Option<NaiveDate>,
    /// When the user finished watching
    pub finish_date: Option<NaiveDate>,
    /// Watch priority
    #[serde(default)]
    pub priority: i16,
}

/// Request body for posting a review
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CreateReviewRequest {
    /// Score, 1-10
    pub score: i16,
    /// Review body
    pub review_text: String,
}

/// Request body for creating a tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CreateTagRequest {
    /// Tag name
    pub name: String,
}

/// Request body for attaching a tag to a list entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AttachTagRequest {
    /// ID of one of the caller's tags
    pub tag_id: i32,
}

// ============================================================================
// Responses
// ============================================================================

/// Response for successful registration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct RegisterResponse {
    /// Human-readable confirmation
    pub message: String,
    /// New user's ID
    pub user_id: i32,
    /// New user's username
    pub username: String,
    /// New user's email
    pub email: String,
}

/// Response for successful login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct LoginResponse {
    /// Human-readable confirmation
    pub message: String,
    /// Signed access/refresh token pair
    pub token: TokenPair,
}

/// Response for the token refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TokenRefreshResponse {
    /// Newly minted access token
    pub access: String,
}

/// Response wrapper for the paged anime list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AnimeListResponse {
    /// Anime on this page
    pub items: Vec<Anime>,
    /// Current page number
    pub page: i64,
    /// Total number of anime in the catalog
    pub total: i64,
}

/// Generic API response wrapper for successful responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful (always true for this type)
    pub success: bool,
    /// The response payload
    pub data: T,
    /// ISO timestamp of the response
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Create a new successful API response with the current timestamp
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ApiError {
    /// Whether the operation was successful (always false for errors)
    pub success: bool,
    /// Error message describing what went wrong
    pub error: String,
    /// ISO timestamp of when the error occurred
    pub timestamp: String,
}

impl ApiError {
    /// Create a new API error response with the current timestamp
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"username\":\"alice\""));
        assert!(json.contains("\"email\":\"a@x.com\""));
        assert!(json.contains("\"created_at\""));
    }

    #[test]
    fn test_anime_type_field_renamed() {
        let anime = Anime {
            id: 1,
            title: "Cowboy Bebop".to_string(),
            anime_type: Some("TV".to_string()),
            synopsis: None,
            total_episodes: Some(26),
            status: Some("Completed".to_string()),
            aired_from: None,
            aired_to: None,
            image_url: None,
            average_rating: 8.75,
            rating_count: 4,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&anime).unwrap();
        assert!(json.contains("\"type\":\"TV\""));
        assert!(!json.contains("\"anime_type\""));
        assert!(json.contains("\"average_rating\":8.75"));
    }

    #[test]
    fn test_anime_detail_flattens_anime_fields() {
        let detail = AnimeDetail {
            anime: Anime {
                id: 2,
                title: "Monster".to_string(),
                anime_type: Some("TV".to_string()),
                synopsis: None,
                total_episodes: Some(74),
                status: None,
                aired_from: None,
                aired_to: None,
                image_url: None,
                average_rating: 0.0,
                rating_count: 0,
                created_at: Utc::now(),
            },
            genres: vec!["Thriller".to_string()],
            studios: vec!["Madhouse".to_string()],
        };

        let json = serde_json::to_string(&detail).unwrap();
        // Flattened: title sits beside genres/studios, no nested "anime" key
        assert!(json.contains("\"title\":\"Monster\""));
        assert!(json.contains("\"genres\":[\"Thriller\"]"));
        assert!(json.contains("\"studios\":[\"Madhouse\"]"));
        assert!(!json.contains("\"anime\":"));
    }

    #[test]
    fn test_register_request_deserialization() {
        let json = r#"{
            "username": "alice",
            "email": "a@x.com",
            "password": "password1",
            "confirm_password": "password1"
        }"#;

        let request: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.email, "a@x.com");
        assert_eq!(request.password, "password1");
        assert_eq!(request.confirm_password, "password1");
    }

    #[test]
    fn test_login_request_deserialization() {
        let json = r#"{
            "username": "alice",
            "password": "password1"
        }"#;

        let request: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.password, "password1");
    }

    #[test]
    fn test_register_response_shape() {
        let response = RegisterResponse {
            message: "User registered successfully".to_string(),
            user_id: 1,
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"message\":\"User registered successfully\""));
        assert!(json.contains("\"user_id\":1"));
        assert!(json.contains("\"username\":\"alice\""));
        assert!(json.contains("\"email\":\"a@x.com\""));
    }

    #[test]
    fn test_login_response_shape() {
        let response = LoginResponse {
            message: "Login successful".to_string(),
            token: TokenPair {
                access: "access.jwt.token".to_string(),
                refresh: "refresh.jwt.token".to_string(),
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"message\":\"Login successful\""));
        assert!(json.contains("\"token\":{"));
        assert!(json.contains("\"access\":\"access.jwt.token\""));
        assert!(json.contains("\"refresh\":\"refresh.jwt.token\""));
    }

    #[test]
    fn test_create_anime_request_defaults() {
        let json = r#"{"title": "Cowboy Bebop"}"#;

        let request: CreateAnimeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.title, "Cowboy Bebop");
        assert_eq!(request.anime_type, None);
        assert!(request.genres.is_empty());
        assert!(request.studios.is_empty());
    }

    #[test]
    fn test_upsert_list_entry_request_defaults() {
        let json = r#"{"status": "watching"}"#;

        let request: UpsertListEntryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.status, "watching");
        assert_eq!(request.score, None);
        assert_eq!(request.episodes_watched, 0);
        assert_eq!(request.priority, 0);
    }

    #[test]
    fn test_api_response_new() {
        let response = ApiResponse::new("test data");
        assert!(response.success);
        assert_eq!(response.data, "test data");
        assert!(!response.timestamp.is_empty());
    }

    #[test]
    fn test_api_error_new() {
        let error = ApiError::new("test error");
        assert!(!error.success);
        assert_eq!(error.error, "test error");
        assert!(!error.timestamp.is_empty());
    }
}
