/// HTTP handlers for market endpoints
///
/// This module contains handlers for:
/// - Posts: neighborhood feed, post lifecycle, likes, reports, search terms
/// - Comments: two-level threads with cascading delete
/// - Towns: nearby-area lookup and reverse geocoding
/// - Categories and images
pub mod categories;
pub mod comments;
pub mod images;
pub mod posts;
pub mod towns;

use actix_web::web;

use crate::error::AppError;

// Re-export handler functions at module level
pub use categories::list_categories;
pub use comments::{add_comment, delete_comment};
pub use images::{get_image, upload_image};
pub use posts::{
    autocomplete, create_post, delete_post, get_post, list_feed, ranking, related_posts,
    report_post, set_buyer, toggle_like, update_post, update_post_state,
};
pub use towns::{nearby_towns, town_name};

/// Register the `/api/v1` resources. Authentication is applied by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .service(
                web::resource("")
                    .route(web::get().to(list_feed))
                    .route(web::post().to(create_post)),
            )
            .route("/ranking", web::get().to(ranking))
            .route("/autocomplete", web::get().to(autocomplete))
            .route("/relation/{category_id}", web::get().to(related_posts))
            .service(
                web::resource("/{post_id}")
                    .route(web::get().to(get_post))
                    .route(web::put().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .route("/{post_id}/state", web::patch().to(update_post_state))
            .route("/{post_id}/buyer/{user_id}", web::post().to(set_buyer))
            .route("/{post_id}/like", web::post().to(toggle_like))
            .route("/{post_id}/report", web::post().to(report_post)),
    )
    .service(
        web::scope("/comments")
            .route("/{post_id}", web::post().to(add_comment))
            .route("/{post_id}/{comment_id}", web::delete().to(delete_comment)),
    )
    .service(
        web::scope("/towns")
            .route("", web::get().to(nearby_towns))
            .route("/name", web::get().to(town_name)),
    )
    .route("/categories", web::get().to(list_categories))
    .service(
        web::resource("/images/{image_name}")
            .route(web::get().to(get_image))
            .route(web::post().to(upload_image)),
    );
}

/// JSON body errors use the service's error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(256 * 1024)
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Query string errors use the service's error envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Path segment errors (malformed ids) use the service's error envelope.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}
