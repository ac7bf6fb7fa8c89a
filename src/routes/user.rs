//! User routes for the Weeb API
//!
//! This module contains HTTP route handlers for user-specific endpoints:
//! - GET /api/list - Get the caller's anime list
//! - PUT /api/list/{anime_id} - Create or update a list entry
//! - DELETE /api/list/{anime_id} - Remove a list entry
//! - POST /api/anime/{id}/reviews - Post a review
//! - GET /api/anime/{id}/reviews - Get an anime's reviews
//! - POST /api/tags - Create a tag
//! - GET /api/tags - Get the caller's tags
//! - POST /api/list/{anime_id}/tags - Attach a tag to a list entry
//! - GET /api/list/{anime_id}/tags - Get a list entry's tags

use actix_web::{web, HttpResponse};
use tracing::info;

use crate::auth::Auth;
use crate::db::{
    add_review, attach_tag, create_tag, find_status_by_name, find_tag, get_anime,
    get_list_entries, get_list_entry, get_reviews_for_anime, get_tags, get_tags_for_entry,
    remove_list_entry, upsert_list_entry,
};
use crate::error::{AppError, AppResult, ValidationErrors};
use crate::models::{
    ApiError, ApiResponse, AttachTagRequest, CreateReviewRequest, CreateTagRequest, ListEntry,
    Review, Tag, UpsertListEntryRequest,
};
use crate::routes::AppState;

/// GET /api/list - Get the caller's anime list
///
/// Requires authentication. Entries are sorted by most recently updated.
#[utoipa::path(
    get,
    path = "/api/list",
    tag = "list",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "List retrieved successfully", body = ApiResponse<Vec<ListEntry>>),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_list(data: web::Data<AppState>, auth: Auth) -> AppResult<HttpResponse> {
    let entries = get_list_entries(data.db.pool(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(entries)))
}

/// PUT /api/list/{anime_id} - Create or update the caller's list entry
///
/// Requires authentication. At most one entry exists per (user, anime)
/// pair; a second PUT updates the existing entry.
#[utoipa::path(
    put,
    path = "/api/list/{anime_id}",
    tag = "list",
    params(
        ("anime_id" = i32, Path, description = "Anime ID")
    ),
    request_body = UpsertListEntryRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "List entry saved", body = ApiResponse<ListEntry>),
        (status = 400, description = "Validation failed, field -> messages map"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "Anime not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn upsert_list_entry_handler(
    data: web::Data<AppState>,
    auth: Auth,
    path: web::Path<i32>,
    body: web::Json<UpsertListEntryRequest>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let anime_id = path.into_inner();
    let body = body.into_inner();

    if get_anime(pool, anime_id).await?.is_none() {
        return Err(AppError::not_found("Anime not found"));
    }

    let mut errors = ValidationErrors::new();
    if let Some(score) = body.score {
        if !(1..=10).contains(&score) {
            errors.add("score", "Score must be between 1 and 10.");
        }
    }
    if body.episodes_watched < 0 {
        errors.add("episodes_watched", "Episodes watched cannot be negative.");
    }

    let Some(status) = find_status_by_name(pool, &body.status).await? else {
        errors.add("status", "Unknown list status.");
        return Err(AppError::Validation(errors));
    };
    errors.into_result()?;
    let entry = upsert_list_entry(
        pool,
        auth.user_id,
        anime_id,
        status.id,
        body.score,
        body.episodes_watched,
        body.start_date,
        body.finish_date,
        body.priority,
    )
    .await?;

    info!("User {} saved list entry for anime {}", auth.user_id, anime_id);
    Ok(HttpResponse::Ok().json(ApiResponse::new(entry)))
}

/// DELETE /api/list/{anime_id} - Remove the caller's list entry
#[utoipa::path(
    delete,
    path = "/api/list/{anime_id}",
    tag = "list",
    params(
        ("anime_id" = i32, Path, description = "Anime ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "List entry removed", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "List entry not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn remove_list_entry_handler(
    data: web::Data<AppState>,
    auth: Auth,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let anime_id = path.into_inner();

    if remove_list_entry(data.db.pool(), auth.user_id, anime_id).await? {
        info!("User {} removed list entry for anime {}", auth.user_id, anime_id);
        Ok(HttpResponse::Ok().json(ApiResponse::new("List entry removed".to_string())))
    } else {
        Err(AppError::not_found("List entry not found"))
    }
}

/// POST /api/anime/{id}/reviews - Post a review of an anime
///
/// Requires authentication. The review's score accumulates into the anime's
/// rating aggregate in the same transaction.
#[utoipa::path(
    post,
    path = "/api/anime/{id}/reviews",
    tag = "reviews",
    params(
        ("id" = i32, Path, description = "Anime ID")
    ),
    request_body = CreateReviewRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Review created", body = ApiResponse<Review>),
        (status = 400, description = "Validation failed, field -> messages map"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "Anime not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn create_review_handler(
    data: web::Data<AppState>,
    auth: Auth,
    path: web::Path<i32>,
    body: web::Json<CreateReviewRequest>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let anime_id = path.into_inner();

    if get_anime(pool, anime_id).await?.is_none() {
        return Err(AppError::not_found("Anime not found"));
    }

    let mut errors = ValidationErrors::new();
    if !(1..=10).contains(&body.score) {
        errors.add("score", "Score must be between 1 and 10.");
    }
    if body.review_text.trim().is_empty() {
        errors.add("review_text", "Review text is required.");
    }
    errors.into_result()?;

    let review = add_review(pool, auth.user_id, anime_id, body.score, &body.review_text).await?;

    info!("User {} reviewed anime {}", auth.user_id, anime_id);
    Ok(HttpResponse::Created().json(ApiResponse::new(review)))
}

/// GET /api/anime/{id}/reviews - Get an anime's reviews, newest first
#[utoipa::path(
    get,
    path = "/api/anime/{id}/reviews",
    tag = "reviews",
    params(
        ("id" = i32, Path, description = "Anime ID")
    ),
    responses(
        (status = 200, description = "Reviews retrieved successfully", body = ApiResponse<Vec<Review>>),
        (status = 404, description = "Anime not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_reviews_handler(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let anime_id = path.into_inner();

    if get_anime(pool, anime_id).await?.is_none() {
        return Err(AppError::not_found("Anime not found"));
    }

    let reviews = get_reviews_for_anime(pool, anime_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(reviews)))
}

/// POST /api/tags - Create a user-scoped tag
#[utoipa::path(
    post,
    path = "/api/tags",
    tag = "tags",
    request_body = CreateTagRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Tag created", body = ApiResponse<Tag>),
        (status = 400, description = "Validation failed, field -> messages map"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn create_tag_handler(
    data: web::Data<AppState>,
    auth: Auth,
    body: web::Json<CreateTagRequest>,
) -> AppResult<HttpResponse> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::field_error("name", "Tag name is required."));
    }

    let tag = create_tag(data.db.pool(), auth.user_id, name).await?;

    info!("User {} created tag: {}", auth.user_id, tag.name);
    Ok(HttpResponse::Created().json(ApiResponse::new(tag)))
}

/// GET /api/tags - Get the caller's tags
#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tags retrieved successfully", body = ApiResponse<Vec<Tag>>),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_tags_handler(data: web::Data<AppState>, auth: Auth) -> AppResult<HttpResponse> {
    let tags = get_tags(data.db.pool(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(tags)))
}

/// POST /api/list/{anime_id}/tags - Attach a tag to the caller's list entry
///
/// Requires authentication. Attaching the same tag twice is a conflict.
#[utoipa::path(
    post,
    path = "/api/list/{anime_id}/tags",
    tag = "tags",
    params(
        ("anime_id" = i32, Path, description = "Anime ID")
    ),
    request_body = AttachTagRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tag attached", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "List entry or tag not found", body = ApiError),
        (status = 409, description = "Tag already attached", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn attach_tag_handler(
    data: web::Data<AppState>,
    auth: Auth,
    path: web::Path<i32>,
    body: web::Json<AttachTagRequest>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let anime_id = path.into_inner();

    let entry = get_list_entry(pool, auth.user_id, anime_id)
        .await?
        .ok_or_else(|| AppError::not_found("List entry not found"))?;

    let tag = find_tag(pool, auth.user_id, body.tag_id)
        .await?
        .ok_or_else(|| AppError::not_found("Tag not found"))?;

    attach_tag(pool, entry.id, tag.id).await?;

    info!(
        "User {} tagged anime {} with '{}'",
        auth.user_id, anime_id, tag.name
    );
    Ok(HttpResponse::Ok().json(ApiResponse::new("Tag attached".to_string())))
}

/// GET /api/list/{anime_id}/tags - Get the tags on the caller's list entry
#[utoipa::path(
    get,
    path = "/api/list/{anime_id}/tags",
    tag = "tags",
    params(
        ("anime_id" = i32, Path, description = "Anime ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tags retrieved successfully", body = ApiResponse<Vec<Tag>>),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "List entry not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_entry_tags_handler(
    data: web::Data<AppState>,
    auth: Auth,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let anime_id = path.into_inner();

    let entry = get_list_entry(pool, auth.user_id, anime_id)
        .await?
        .ok_or_else(|| AppError::not_found("List entry not found"))?;

    let tags = get_tags_for_entry(pool, entry.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(tags)))
}

