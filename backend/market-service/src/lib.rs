/// Market Service Library
///
/// Neighborhood classifieds backend: a location-scoped infinite-scroll feed,
/// the post lifecycle, two-level comment threads, categories and images.
///
/// # Modules
///
/// - `neighborhood`: area adjacency graph and the bounded proximity search
/// - `handlers`: HTTP request handlers
/// - `models`: Data structures for posts, comments, categories
/// - `services`: Business logic layer (comment threads, feed window, posts)
/// - `db`: Store traits and their Postgres implementations
/// - `storage`: Image object storage
/// - `search`: Search-log index
/// - `middleware`: JWT authentication and ownership checks
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Observability and metrics collection
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod neighborhood;
pub mod openapi;
pub mod search;
pub mod services;
pub mod state;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::{AppState, Collaborators};
