/// Business logic layer for market-service
///
/// This module provides:
/// - Comment threads: tree reconstruction and the cascading delete policy
/// - Feed window: scroll pagination that tolerates concurrent inserts
/// - Post service: feed listing and the post lifecycle
/// - Comment service: adding and deleting comments
/// - Geocoding: coordinates to town names
pub mod comment_thread;
pub mod comments;
pub mod feed_window;
pub mod geocoding;
pub mod posts;

// Re-export commonly used services
pub use comments::CommentService;
pub use geocoding::GeocodingClient;
pub use posts::{FeedPage, FeedRequest, PostService};
