/// Configuration management for Market Service
///
/// This module handles loading and managing configuration from environment variables
/// (optionally seeded from a `.env` file).
use serde::{Deserialize, Serialize};

use crate::services::feed_window::DEFAULT_PAGE_SIZE;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Feed paging configuration
    pub feed: FeedConfig,
    /// Neighborhood graph source
    pub neighborhood: NeighborhoodConfig,
    /// Image object storage
    pub storage: StorageConfig,
    /// Search-log index
    pub search: SearchConfig,
    /// Reverse geocoding API
    pub geocoding: GeocodingConfig,
    /// Token validation
    pub auth: AuthConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// HTTP worker count
    pub workers: usize,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Posts per feed page
    pub page_size: u32,
    /// Posts returned by the related-posts sample
    pub related_sample_size: u32,
    /// Number of popular search terms returned by the ranking endpoint
    pub ranking_size: u32,
    /// Number of terms returned by autocomplete
    pub autocomplete_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodConfig {
    /// Path to the adjacency JSON export
    pub data_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3 bucket holding post images
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Custom endpoint (MinIO, localstack)
    pub endpoint: Option<String>,
    /// Object key suffix appended to image names
    pub key_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Elasticsearch node URL
    pub url: String,
    /// Index that stores search-log documents
    pub log_index: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the issuing auth service
    pub jwt_secret: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        let page_size = parse_env_or_default("FEED_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err("FEED_PAGE_SIZE must be greater than zero".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("MARKET_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("MARKET_SERVICE_PORT", 3000)?,
                workers: parse_env_or_default("MARKET_SERVICE_WORKERS", 4)?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost/market".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout_secs: parse_env_or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", 10)?,
            },
            feed: FeedConfig {
                page_size,
                related_sample_size: parse_env_or_default("FEED_RELATED_SAMPLE_SIZE", 8)?,
                ranking_size: parse_env_or_default("SEARCH_RANKING_SIZE", 10)?,
                autocomplete_size: parse_env_or_default("SEARCH_AUTOCOMPLETE_SIZE", 15)?,
            },
            neighborhood: NeighborhoodConfig {
                data_path: std::env::var("NEIGHBORHOOD_DATA_PATH")
                    .unwrap_or_else(|_| "./data/dong_data.json".to_string()),
            },
            storage: StorageConfig {
                bucket: std::env::var("S3_BUCKET")
                    .unwrap_or_else(|_| "grooom-market".to_string()),
                region: std::env::var("AWS_REGION")
                    .unwrap_or_else(|_| "ap-northeast-2".to_string()),
                endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.trim().is_empty()),
                key_suffix: std::env::var("S3_KEY_SUFFIX").unwrap_or_else(|_| ".jpg".to_string()),
            },
            search: SearchConfig {
                url: std::env::var("ELASTICSEARCH_URL")
                    .unwrap_or_else(|_| "http://localhost:9200".to_string()),
                log_index: std::env::var("SEARCH_LOG_INDEX")
                    .unwrap_or_else(|_| "search_logs".to_string()),
            },
            geocoding: GeocodingConfig {
                endpoint: std::env::var("GEOCODING_ENDPOINT").unwrap_or_else(|_| {
                    "https://naveropenapi.apigw.ntruss.com/map-reversegeocode/v2/gc".to_string()
                }),
                client_id: std::env::var("GEOCODING_CLIENT_ID").unwrap_or_default(),
                client_secret: std::env::var("GEOCODING_CLIENT_SECRET").unwrap_or_default(),
            },
            auth: {
                let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
                if production && jwt_secret.trim().is_empty() {
                    return Err("JWT_SECRET must be set in production".to_string());
                }
                AuthConfig { jwt_secret }
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
