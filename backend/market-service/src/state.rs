use actix_web::web;
use std::sync::Arc;

use crate::config::FeedConfig;
use crate::db::{CategoryStore, CommentStore, PostStore};
use crate::neighborhood::ProximityResolver;
use crate::search::SearchLog;
use crate::services::{CommentService, GeocodingClient, PostService};
use crate::storage::ImageStore;

/// External collaborators behind their trait seams.
#[derive(Clone)]
pub struct Collaborators {
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub images: Arc<dyn ImageStore>,
    pub search_log: Arc<dyn SearchLog>,
}

/// Request-scoped application data shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub posts: web::Data<PostService>,
    pub comments: web::Data<CommentService>,
    pub resolver: web::Data<ProximityResolver>,
    pub categories: web::Data<Arc<dyn CategoryStore>>,
    pub images: web::Data<Arc<dyn ImageStore>>,
    pub geocoding: web::Data<GeocodingClient>,
}

impl AppState {
    pub fn new(
        collaborators: Collaborators,
        resolver: ProximityResolver,
        feed: FeedConfig,
        geocoding: GeocodingClient,
    ) -> Self {
        let post_service = PostService::new(
            Arc::clone(&collaborators.posts),
            Arc::clone(&collaborators.comments),
            Arc::clone(&collaborators.images),
            Arc::clone(&collaborators.search_log),
            resolver.clone(),
            feed,
        );
        let comment_service =
            CommentService::new(Arc::clone(&collaborators.posts), collaborators.comments);

        Self {
            posts: web::Data::new(post_service),
            comments: web::Data::new(comment_service),
            resolver: web::Data::new(resolver),
            categories: web::Data::new(collaborators.categories),
            images: web::Data::new(collaborators.images),
            geocoding: web::Data::new(geocoding),
        }
    }

    /// Register the shared data and the `/api/v1` resources.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.posts.clone())
            .app_data(self.comments.clone())
            .app_data(self.resolver.clone())
            .app_data(self.categories.clone())
            .app_data(self.images.clone())
            .app_data(self.geocoding.clone())
            .app_data(crate::handlers::json_config())
            .app_data(crate::handlers::query_config())
            .app_data(crate::handlers::path_config())
            .configure(crate::handlers::configure);
    }
}
