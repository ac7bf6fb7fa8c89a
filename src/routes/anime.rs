//! Anime catalog routes for the Weeb API
//!
//! This module contains HTTP route handlers for the catalog endpoints:
//! - GET /api/anime - Paged anime list
//! - GET /api/anime/{id} - Anime detail with genres and studios
//! - POST /api/anime - Create an anime (authenticated)
//! - GET /api/genres, /api/studios, /api/statuses - Lookup listings

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use crate::auth::Auth;
use crate::db::{
    add_anime_genre, add_anime_studio, create_anime, get_anime_detail, get_or_create_genre,
    get_or_create_studio, list_anime, list_genres, list_statuses, list_studios,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AnimeDetail, AnimeListResponse, ApiError, ApiResponse, CreateAnimeRequest, Genre, ListStatus,
    Studio,
};
use crate::routes::AppState;

const DEFAULT_PER_PAGE: i64 = 20;
const MAX_PER_PAGE: i64 = 100;

/// Query parameters for the anime list endpoint
#[derive(Debug, Deserialize, IntoParams)]
pub struct AnimeListQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Page size (default: 20, max: 100)
    pub per_page: Option<i64>,
}

/// GET /api/anime - Get the anime catalog, paged
#[utoipa::path(
    get,
    path = "/api/anime",
    tag = "anime",
    params(AnimeListQuery),
    responses(
        (status = 200, description = "Anime list retrieved successfully", body = ApiResponse<AnimeListResponse>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_anime_list(
    data: web::Data<AppState>,
    query: web::Query<AnimeListQuery>,
) -> AppResult<HttpResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);

    let (items, total) = list_anime(data.db.pool(), page, per_page).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(AnimeListResponse { items, page, total })))
}

/// GET /api/anime/{id} - Get anime detail with genres and studios
#[utoipa::path(
    get,
    path = "/api/anime/{id}",
    tag = "anime",
    params(
        ("id" = i32, Path, description = "Anime ID")
    ),
    responses(
        (status = 200, description = "Anime detail retrieved successfully", body = ApiResponse<AnimeDetail>),
        (status = 404, description = "Anime not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_anime_by_id(
    data: web::Data<AppState>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let anime_id = path.into_inner();

    match get_anime_detail(data.db.pool(), anime_id).await? {
        Some(detail) => Ok(HttpResponse::Ok().json(ApiResponse::new(detail))),
        None => Err(AppError::not_found("Anime not found")),
    }
}

/// POST /api/anime - Create an anime catalog entry
///
/// Requires authentication. Genre and studio names are attached as join
/// records, created on first use; attaching the same name twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/anime",
    tag = "anime",
    request_body = CreateAnimeRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Anime created successfully", body = ApiResponse<AnimeDetail>),
        (status = 400, description = "Validation failed, field -> messages map"),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn create_anime_handler(
    data: web::Data<AppState>,
    auth: Auth,
    body: web::Json<CreateAnimeRequest>,
) -> AppResult<HttpResponse> {
    let pool = data.db.pool();
    let body = body.into_inner();

    if body.title.trim().is_empty() {
        return Err(AppError::field_error("title", "Title is required."));
    }

    let anime = create_anime(
        pool,
        body.title.trim(),
        body.anime_type.as_deref(),
        body.synopsis.as_deref(),
        body.total_episodes,
        body.status.as_deref(),
        body.aired_from,
        body.aired_to,
        body.image_url.as_deref(),
    )
    .await?;

    for name in &body.genres {
        let genre = get_or_create_genre(pool, name).await?;
        add_anime_genre(pool, anime.id, genre.id).await?;
    }

    for name in &body.studios {
        let studio = get_or_create_studio(pool, name).await?;
        add_anime_studio(pool, anime.id, studio.id).await?;
    }

    info!("User {} created anime: {}", auth.user_id, anime.title);

    let detail = get_anime_detail(pool, anime.id)
        .await?
        .ok_or_else(|| AppError::internal("Anime vanished after creation"))?;

    Ok(HttpResponse::Created().json(ApiResponse::new(detail)))
}

/// GET /api/genres - Get all genres
#[utoipa::path(
    get,
    path = "/api/genres",
    tag = "anime",
    responses(
        (status = 200, description = "Genres retrieved successfully", body = ApiResponse<Vec<Genre>>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_genres(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let genres = list_genres(data.db.pool()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(genres)))
}

/// GET /api/studios - Get all studios
#[utoipa::path(
    get,
    path = "/api/studios",
    tag = "anime",
    responses(
        (status = 200, description = "Studios retrieved successfully", body = ApiResponse<Vec<Studio>>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_studios(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let studios = list_studios(data.db.pool()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(studios)))
}

/// GET /api/statuses - Get all list statuses
#[utoipa::path(
    get,
    path = "/api/statuses",
    tag = "anime",
    responses(
        (status = 200, description = "List statuses retrieved successfully", body = ApiResponse<Vec<ListStatus>>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn get_statuses(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let statuses = list_statuses(data.db.pool()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(statuses)))
}

