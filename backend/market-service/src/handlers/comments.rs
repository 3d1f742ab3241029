/// Comment handlers - add and delete comments on a post
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::NewComment;
use crate::services::CommentService;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    /// Top-level comment being replied to.
    pub parent_comment_id: Option<Uuid>,
}

/// Add a comment to a post; returns the post with its updated threads
pub async fn add_comment(
    service: web::Data<CommentService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let req = req.into_inner();

    let detail = service
        .add_comment(
            *post_id,
            NewComment {
                writer_id: user_id.0,
                parent_comment_id: req.parent_comment_id,
                description: req.description,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Delete a comment (writer only); returns the post with its updated threads
pub async fn delete_comment(
    service: web::Data<CommentService>,
    user_id: UserId,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let detail = service.delete_comment(user_id.0, post_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}
