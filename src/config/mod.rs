use serde::Deserialize;
use std::env;

// Top-level configuration container for all settings
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub image_store: ImageStoreConfig,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Image blob store settings
#[derive(Debug, Clone, Deserialize)]
pub struct ImageStoreConfig {
    pub endpoint: String,
    pub api_key: String,
    pub container: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "venue_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            image_store: ImageStoreConfig {
                endpoint: env::var("IMAGE_STORE_ENDPOINT")
                    .unwrap_or_else(|_| "https://blobs.example.com/api/v1".to_string()),
                api_key: env::var("IMAGE_STORE_API_KEY").expect("IMAGE_STORE_API_KEY must be set"),
                container: env::var("IMAGE_STORE_CONTAINER")
                    .unwrap_or_else(|_| "venue-images".to_string()),
            },
        }
    }
}
