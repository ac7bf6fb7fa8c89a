//! API Routes module for the Weeb API
//!
//! This module wires all HTTP route handlers together: authentication and
//! token endpoints, the anime catalog, and per-user list/review/tag
//! endpoints, plus the authenticated API root.

pub mod anime;
pub mod auth;
pub mod user;

use actix_web::{web, HttpResponse, Responder};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::{Auth, TokenPair};
use crate::config::Config;
use crate::db::Database;
use crate::models::{
    Anime, AnimeDetail, AnimeListResponse, ApiError, AttachTagRequest, CreateAnimeRequest,
    CreateReviewRequest, CreateTagRequest, Genre, ListEntry, ListStatus, LoginRequest,
    LoginResponse, RegisterRequest, RegisterResponse, Review, Studio, Tag, TokenRefreshRequest,
    TokenRefreshResponse, UpsertListEntryRequest, User,
};

/// Application state shared across handlers
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

/// GET / - Authenticated API root
///
/// Returns a static listing of the available endpoints.
#[utoipa::path(
    get,
    path = "/",
    tag = "root",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Endpoint listing"),
        (status = 401, description = "Not authenticated", body = ApiError)
    )
)]
pub async fn api_root(_auth: Auth) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Weeb API - Get your favourite anime!",
        "endpoints": {
            "token_obtain_pair": "/api/token/",
            "token_refresh": "/api/token/refresh/",
            "register": "/api/register/",
            "login": "/api/login/",
            "anime": "/api/anime",
            "list": "/api/list",
            "tags": "/api/tags",
        }
    }))
}

/// Registers the bearer JWT scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weeb API",
        version = "0.1.0",
        description = "Anime tracking API: catalog, per-user lists, reviews, tags, and JWT authentication"
    ),
    modifiers(&SecurityAddon),
    paths(
        api_root,
        auth::register,
        auth::login,
        auth::token_obtain_pair,
        auth::token_refresh,
        anime::get_anime_list,
        anime::get_anime_by_id,
        anime::create_anime_handler,
        anime::get_genres,
        anime::get_studios,
        anime::get_statuses,
        user::get_list,
        user::upsert_list_entry_handler,
        user::remove_list_entry_handler,
        user::create_review_handler,
        user::get_reviews_handler,
        user::create_tag_handler,
        user::get_tags_handler,
        user::attach_tag_handler,
        user::get_entry_tags_handler
    ),
    components(
        schemas(
            User,
            Anime,
            AnimeDetail,
            Genre,
            Studio,
            ListStatus,
            ListEntry,
            Review,
            Tag,
            TokenPair,
            RegisterRequest,
            LoginRequest,
            TokenRefreshRequest,
            CreateAnimeRequest,
            UpsertListEntryRequest,
            CreateReviewRequest,
            CreateTagRequest,
            AttachTagRequest,
            RegisterResponse,
            LoginResponse,
            TokenRefreshResponse,
            AnimeListResponse,
            ApiError
        )
    ),
    tags(
        (name = "root", description = "API root"),
        (name = "auth", description = "Registration, login, and token endpoints"),
        (name = "anime", description = "Anime catalog endpoints"),
        (name = "list", description = "Per-user anime list endpoints"),
        (name = "reviews", description = "Review endpoints"),
        (name = "tags", description = "Tag endpoints")
    )
)]
pub struct ApiDoc;

/// Configure API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(api_root)).service(
        web::scope("/api")
            // Auth
            .route("/register/", web::post().to(auth::register))
            .route("/login/", web::post().to(auth::login))
            .route("/token/", web::post().to(auth::token_obtain_pair))
            .route("/token/refresh/", web::post().to(auth::token_refresh))
            // Catalog
            .route("/anime", web::get().to(anime::get_anime_list))
            .route("/anime", web::post().to(anime::create_anime_handler))
            .route("/anime/{id}", web::get().to(anime::get_anime_by_id))
            .route("/genres", web::get().to(anime::get_genres))
            .route("/studios", web::get().to(anime::get_studios))
            .route("/statuses", web::get().to(anime::get_statuses))
            // List entries
            .route("/list", web::get().to(user::get_list))
            .route(
                "/list/{anime_id}",
                web::put().to(user::upsert_list_entry_handler),
            )
            .route(
                "/list/{anime_id}",
                web::delete().to(user::remove_list_entry_handler),
            )
            // Reviews
            .route(
                "/anime/{id}/reviews",
                web::post().to(user::create_review_handler),
            )
            .route(
                "/anime/{id}/reviews",
                web::get().to(user::get_reviews_handler),
            )
            // Tags
            .route("/tags", web::post().to(user::create_tag_handler))
            .route("/tags", web::get().to(user::get_tags_handler))
            .route(
                "/list/{anime_id}/tags",
                web::post().to(user::attach_tag_handler),
            )
            .route(
                "/list/{anime_id}/tags",
                web::get().to(user::get_entry_tags_handler),
            ),
    );
}
