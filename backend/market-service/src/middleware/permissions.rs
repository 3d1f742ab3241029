/// Authorization module for market-service
///
/// Provides ownership-based permission checks for posts and comments.
/// Users can only modify content they wrote.
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Comment, Post};

/// Result type for permission checks
pub type PermissionResult = Result<(), AppError>;

/// Check if a user owns a post
pub fn check_post_ownership(user_id: Uuid, post: &Post) -> PermissionResult {
    if post.writer_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You don't have permission to modify this post".to_string(),
        ))
    }
}

/// Check if a user wrote a comment
pub fn check_comment_ownership(user_id: Uuid, comment: &Comment) -> PermissionResult {
    if comment.writer_id == user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You don't have permission to delete this comment".to_string(),
        ))
    }
}
