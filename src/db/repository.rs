//! Repository module for Weeb API data persistence
//!
//! Provides CRUD operations for users, the anime catalog (with genre and
//! studio join records), per-user anime lists, reviews, and tags. Uniqueness
//! invariants live in the database; unique-constraint violations are mapped
//! to typed errors here.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use thiserror::Error;

use crate::models::{Anime, AnimeDetail, Genre, ListEntry, ListStatus, Review, Studio, Tag, User};

/// Repository-related errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,
}

impl From<sqlx::Error> for RepositoryError {
    /// Map unique-constraint violations to typed errors by constraint name.
    /// Races lost at write time surface exactly like the up-front checks.
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some("users_username_key") => RepositoryError::UsernameTaken,
                    Some("users_email_key") => RepositoryError::EmailTaken,
                    Some(constraint) => {
                        RepositoryError::Conflict(format!("Duplicate record ({})", constraint))
                    }
                    None => RepositoryError::Conflict("Duplicate record".to_string()),
                };
            }
        }
        RepositoryError::DatabaseError(err)
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn anime_from_row(row: &PgRow) -> Anime {
    Anime {
        id: row.get("id"),
        title: row.get("title"),
        anime_type: row.get("type"),
        synopsis: row.get("synopsis"),
        total_episodes: row.get("total_episodes"),
        status: row.get("status"),
        aired_from: row.get("aired_from"),
        aired_to: row.get("aired_to"),
        image_url: row.get("image_url"),
        average_rating: row.get("average_rating"),
        rating_count: row.get("rating_count"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

fn list_entry_from_row(row: &PgRow) -> ListEntry {
    ListEntry {
        id: row.get("id"),
        anime_id: row.get("anime_id"),
        anime_title: row.get("anime_title"),
        status: row.get("status"),
        score: row.get("score"),
        episodes_watched: row.get("episodes_watched"),
        start_date: row.get("start_date"),
        finish_date: row.get("finish_date"),
        priority: row.get("priority"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn review_from_row(row: &PgRow) -> Review {
    Review {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        anime_id: row.get("anime_id"),
        score: row.get("score"),
        review_text: row.get("review_text"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

// The average is always derived from the stored total and count on read.
const ANIME_COLUMNS: &str = r#"
    id, title, type, synopsis, total_episodes, status, aired_from, aired_to,
    image_url,
    CASE WHEN rating_count > 0
         THEN rating_total::float8 / rating_count
         ELSE 0.0
    END AS average_rating,
    rating_count, created_at
"#;

// ============================================================================
// Users Repository
// ============================================================================

/// Create a new user with an already-hashed password
///
/// Unique violations on username/email map to `UsernameTaken` / `EmailTaken`.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> RepositoryResult<User> {
    let row = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, username, email, created_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user_from_row(&row))
}

/// Find a user by username, returning the user and their password hash
pub async fn find_user_by_username(
    pool: &PgPool,
    username: &str,
) -> RepositoryResult<Option<(User, String)>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let hash: String = row.get("password_hash");
        (user_from_row(&row), hash)
    }))
}

/// Whether a username is already registered
pub async fn username_exists(pool: &PgPool, username: &str) -> RepositoryResult<bool> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(row.get::<bool, _>(0))
}

/// Whether an email is already registered
pub async fn email_exists(pool: &PgPool, email: &str) -> RepositoryResult<bool> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(row.get::<bool, _>(0))
}

// ============================================================================
// Anime Repository
// ============================================================================

/// Create an anime catalog entry
pub async fn create_anime(
    pool: &PgPool,
    title: &str,
    anime_type: Option<&str>,
    synopsis: Option<&str>,
    total_episodes: Option<i32>,
    status: Option<&str>,
    aired_from: Option<NaiveDate>,
    aired_to: Option<NaiveDate>,
    image_url: Option<&str>,
) -> RepositoryResult<Anime> {
    let query = format!(
        r#"
        INSERT INTO anime (title, type, synopsis, total_episodes, status,
                           aired_from, aired_to, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        ANIME_COLUMNS
    );

    let row = sqlx::query(&query)
        .bind(title)
        .bind(anime_type)
        .bind(synopsis)
        .bind(total_episodes)
        .bind(status)
        .bind(aired_from)
        .bind(aired_to)
        .bind(image_url)
        .fetch_one(pool)
        .await?;

    Ok(anime_from_row(&row))
}

/// Get one page of the anime catalog and the total entry count
pub async fn list_anime(
    pool: &PgPool,
    page: i64,
    per_page: i64,
) -> RepositoryResult<(Vec<Anime>, i64)> {
    let offset = (page - 1) * per_page;
    let query = format!(
        "SELECT {} FROM anime ORDER BY id LIMIT $1 OFFSET $2",
        ANIME_COLUMNS
    );

    let rows = sqlx::query(&query)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query("SELECT COUNT(*) FROM anime")
        .fetch_one(pool)
        .await?
        .get(0);

    Ok((rows.iter().map(anime_from_row).collect(), total))
}

/// Get an anime by ID
pub async fn get_anime(pool: &PgPool, anime_id: i32) -> RepositoryResult<Option<Anime>> {
    let query = format!("SELECT {} FROM anime WHERE id = $1", ANIME_COLUMNS);

    let row = sqlx::query(&query)
        .bind(anime_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| anime_from_row(&row)))
}

/// Get an anime by ID with its genre and studio names resolved
pub async fn get_anime_detail(
    pool: &PgPool,
    anime_id: i32,
) -> RepositoryResult<Option<AnimeDetail>> {
    let anime = match get_anime(pool, anime_id).await? {
        Some(anime) => anime,
        None => return Ok(None),
    };

    let genres = sqlx::query(
        r#"
        SELECT g.name
        FROM genres g
        JOIN anime_genres ag ON ag.genre_id = g.id
        WHERE ag.anime_id = $1
        ORDER BY g.name
        "#,
    )
    .bind(anime_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| row.get::<String, _>("name"))
    .collect();

    let studios = sqlx::query(
        r#"
        SELECT s.name
        FROM studios s
        JOIN anime_studios ast ON ast.studio_id = s.id
        WHERE ast.anime_id = $1
        ORDER BY s.name
        "#,
    )
    .bind(anime_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| row.get::<String, _>("name"))
    .collect();

    Ok(Some(AnimeDetail {
        anime,
        genres,
        studios,
    }))
}

/// Accumulate a review score into the anime's rating aggregate
///
/// Runs inside the caller's transaction; the stored columns hold the running
/// total and count only.
async fn accumulate_rating(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    anime_id: i32,
    score: i16,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        UPDATE anime
        SET rating_total = rating_total + $2,
            rating_count = rating_count + 1
        WHERE id = $1
        "#,
    )
    .bind(anime_id)
    .bind(score as i64)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ============================================================================
// Genres and Studios Repository
// ============================================================================

/// Find or create a genre by name
pub async fn get_or_create_genre(pool: &PgPool, name: &str) -> RepositoryResult<Genre> {
    let row = sqlx::query(
        r#"
        INSERT INTO genres (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(Genre {
        id: row.get("id"),
        name: row.get("name"),
    })
}

/// Find or create a studio by name
pub async fn get_or_create_studio(pool: &PgPool, name: &str) -> RepositoryResult<Studio> {
    let row = sqlx::query(
        r#"
        INSERT INTO studios (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(Studio {
        id: row.get("id"),
        name: row.get("name"),
    })
}

/// Attach a genre to an anime; duplicate attachments are no-ops
pub async fn add_anime_genre(
    pool: &PgPool,
    anime_id: i32,
    genre_id: i32,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO anime_genres (anime_id, genre_id)
        VALUES ($1, $2)
        ON CONFLICT (anime_id, genre_id) DO NOTHING
        "#,
    )
    .bind(anime_id)
    .bind(genre_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Attach a studio to an anime; duplicate attachments are no-ops
pub async fn add_anime_studio(
    pool: &PgPool,
    anime_id: i32,
    studio_id: i32,
) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO anime_studios (anime_id, studio_id)
        VALUES ($1, $2)
        ON CONFLICT (anime_id, studio_id) DO NOTHING
        "#,
    )
    .bind(anime_id)
    .bind(studio_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Get all genres
pub async fn list_genres(pool: &PgPool) -> RepositoryResult<Vec<Genre>> {
    let rows = sqlx::query("SELECT id, name FROM genres ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Genre {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

/// Get all studios
pub async fn list_studios(pool: &PgPool) -> RepositoryResult<Vec<Studio>> {
    let rows = sqlx::query("SELECT id, name FROM studios ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Studio {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

/// Get all list statuses
pub async fn list_statuses(pool: &PgPool) -> RepositoryResult<Vec<ListStatus>> {
    let rows = sqlx::query("SELECT id, name FROM list_statuses ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| ListStatus {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

/// Find a list status by name
pub async fn find_status_by_name(
    pool: &PgPool,
    name: &str,
) -> RepositoryResult<Option<ListStatus>> {
    let row = sqlx::query("SELECT id, name FROM list_statuses WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| ListStatus {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

// ============================================================================
// User Anime List Repository
// ============================================================================

const LIST_ENTRY_QUERY: &str = r#"
    SELECT l.id, l.anime_id, a.title AS anime_title, s.name AS status,
           l.score, l.episodes_watched, l.start_date, l.finish_date,
           l.priority, l.updated_at
    FROM user_anime_list l
    JOIN anime a ON a.id = l.anime_id
    JOIN list_statuses s ON s.id = l.status_id
"#;

/// Create or update the caller's list entry for an anime
///
/// The (user_id, anime_id) unique key makes this an upsert: at most one
/// entry per pair ever exists.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_list_entry(
    pool: &PgPool,
    user_id: i32,
    anime_id: i32,
    status_id: i32,
    score: Option<i16>,
    episodes_watched: i32,
    start_date: Option<NaiveDate>,
    finish_date: Option<NaiveDate>,
    priority: i16,
) -> RepositoryResult<ListEntry> {
    sqlx::query(
        r#"
        INSERT INTO user_anime_list
            (user_id, anime_id, status_id, score, episodes_watched,
             start_date, finish_date, priority, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CURRENT_TIMESTAMP)
        ON CONFLICT (user_id, anime_id) DO UPDATE SET
            status_id = EXCLUDED.status_id,
            score = EXCLUDED.score,
            episodes_watched = EXCLUDED.episodes_watched,
            start_date = EXCLUDED.start_date,
            finish_date = EXCLUDED.finish_date,
            priority = EXCLUDED.priority,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(user_id)
    .bind(anime_id)
    .bind(status_id)
    .bind(score)
    .bind(episodes_watched)
    .bind(start_date)
    .bind(finish_date)
    .bind(priority)
    .execute(pool)
    .await?;

    let entry = get_list_entry(pool, user_id, anime_id).await?;
    entry.ok_or_else(|| RepositoryError::NotFound("List entry not found".to_string()))
}

/// Get all of a user's list entries, most recently updated first
pub async fn get_list_entries(pool: &PgPool, user_id: i32) -> RepositoryResult<Vec<ListEntry>> {
    let query = format!("{} WHERE l.user_id = $1 ORDER BY l.updated_at DESC", LIST_ENTRY_QUERY);

    let rows = sqlx::query(&query).bind(user_id).fetch_all(pool).await?;

    Ok(rows.iter().map(list_entry_from_row).collect())
}

/// Get a user's list entry for one anime
pub async fn get_list_entry(
    pool: &PgPool,
    user_id: i32,
    anime_id: i32,
) -> RepositoryResult<Option<ListEntry>> {
    let query = format!("{} WHERE l.user_id = $1 AND l.anime_id = $2", LIST_ENTRY_QUERY);

    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(anime_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| list_entry_from_row(&row)))
}

/// Remove a user's list entry for an anime
pub async fn remove_list_entry(
    pool: &PgPool,
    user_id: i32,
    anime_id: i32,
) -> RepositoryResult<bool> {
    let result = sqlx::query("DELETE FROM user_anime_list WHERE user_id = $1 AND anime_id = $2")
        .bind(user_id)
        .bind(anime_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================================================
// Reviews Repository
// ============================================================================

/// Persist a review and accumulate the anime's rating aggregate
///
/// Both writes happen in one transaction so the stored total/count never
/// drift from the review rows.
pub async fn add_review(
    pool: &PgPool,
    user_id: i32,
    anime_id: i32,
    score: i16,
    review_text: &str,
) -> RepositoryResult<Review> {
    let mut tx = pool.begin().await?;

    let username: String = sqlx::query("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?
        .get("username");

    let row = sqlx::query(
        r#"
        INSERT INTO reviews (user_id, anime_id, score, review_text)
        VALUES ($1, $2, $3, $4)
        RETURNING id, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(anime_id)
    .bind(score)
    .bind(review_text)
    .fetch_one(&mut *tx)
    .await?;

    accumulate_rating(&mut tx, anime_id, score).await?;

    tx.commit().await?;

    Ok(Review {
        id: row.get("id"),
        user_id,
        username,
        anime_id,
        score,
        review_text: review_text.to_string(),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}

/// Get all reviews for an anime, newest first
pub async fn get_reviews_for_anime(
    pool: &PgPool,
    anime_id: i32,
) -> RepositoryResult<Vec<Review>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.user_id, u.username, r.anime_id, r.score,
               r.review_text, r.created_at, r.updated_at
        FROM reviews r
        JOIN users u ON u.id = r.user_id
        WHERE r.anime_id = $1
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(anime_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(review_from_row).collect())
}

// ============================================================================
// Tags Repository
// ============================================================================

/// Create a user-scoped tag
pub async fn create_tag(pool: &PgPool, user_id: i32, name: &str) -> RepositoryResult<Tag> {
    let row = sqlx::query(
        r#"
        INSERT INTO tags (user_id, name)
        VALUES ($1, $2)
        RETURNING id, name
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(Tag {
        id: row.get("id"),
        name: row.get("name"),
    })
}

/// Get all of a user's tags
pub async fn get_tags(pool: &PgPool, user_id: i32) -> RepositoryResult<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name FROM tags WHERE user_id = $1 ORDER BY name")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Tag {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

/// Find one of a user's tags by ID
pub async fn find_tag(pool: &PgPool, user_id: i32, tag_id: i32) -> RepositoryResult<Option<Tag>> {
    let row = sqlx::query("SELECT id, name FROM tags WHERE id = $1 AND user_id = $2")
        .bind(tag_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| Tag {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// Attach a tag to a list entry
///
/// The (list_id, tag_id) unique key rejects duplicate attachments.
pub async fn attach_tag(pool: &PgPool, list_id: i32, tag_id: i32) -> RepositoryResult<()> {
    sqlx::query(
        r#"
        INSERT INTO list_tags (list_id, tag_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(list_id)
    .bind(tag_id)
    .execute(pool)
    .await
    .map_err(|e| match RepositoryError::from(e) {
        RepositoryError::Conflict(_) => {
            RepositoryError::Conflict("Tag already attached to this list entry".to_string())
        }
        other => other,
    })?;
    Ok(())
}

/// Get the tags attached to a list entry
pub async fn get_tags_for_entry(pool: &PgPool, list_id: i32) -> RepositoryResult<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name
        FROM tags t
        JOIN list_tags lt ON lt.tag_id = t.id
        WHERE lt.list_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(list_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Tag {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> PgPool {
        dotenvy::dotenv().ok();
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
        PgPool::connect(&database_url)
            .await
            .expect("Should connect to database")
    }

    #[tokio::test]
    #[ignore] // Requires a running database
    async fn test_duplicate_username_maps_to_username_taken() {
        let pool = test_pool().await;

        let first = create_user(&pool, "repo_test_user", "repo_test@example.com", "hash").await;
        assert!(first.is_ok());

        let second =
            create_user(&pool, "repo_test_user", "repo_test2@example.com", "hash").await;
        assert!(matches!(second, Err(RepositoryError::UsernameTaken)));

        sqlx::query("DELETE FROM users WHERE username = 'repo_test_user'")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires a running database
    async fn test_rating_average_derived_from_total_and_count() {
        let pool = test_pool().await;

        let anime = create_anime(&pool, "Rating Test", None, None, None, None, None, None, None)
            .await
            .unwrap();
        assert_eq!(anime.average_rating, 0.0);
        assert_eq!(anime.rating_count, 0);

        let user = create_user(&pool, "rating_test_user", "rating_test@example.com", "hash")
            .await
            .unwrap();

        add_review(&pool, user.id, anime.id, 8, "good").await.unwrap();
        add_review(&pool, user.id, anime.id, 6, "okay").await.unwrap();

        let reloaded = get_anime(&pool, anime.id).await.unwrap().unwrap();
        assert_eq!(reloaded.rating_count, 2);
        assert_eq!(reloaded.average_rating, 7.0);

        sqlx::query("DELETE FROM anime WHERE id = $1")
            .bind(anime.id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();
    }
}
