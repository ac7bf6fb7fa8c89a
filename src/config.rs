//! Configuration module for the Weeb API
//!
//! Handles loading environment variables and application configuration.

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret key for token signing
    pub jwt_secret: String,
    /// Access token lifetime in minutes
    pub access_token_lifetime_mins: i64,
    /// Refresh token lifetime in days
    pub refresh_token_lifetime_days: i64,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Panics
    /// Panics if required environment variables are not set
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_lifetime_mins: env::var("ACCESS_TOKEN_LIFETIME_MINS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("ACCESS_TOKEN_LIFETIME_MINS must be a valid number"),
            refresh_token_lifetime_days: env::var("REFRESH_TOKEN_LIFETIME_DAYS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .expect("REFRESH_TOKEN_LIFETIME_DAYS must be a valid number"),
        }
    }
}
