use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Comment, NewComment};
use crate::services::comment_thread::DeletionPlan;

/// Persistence seam for comments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// All comments of a post in creation order, soft-deleted ones included.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    async fn insert_comment(&self, post_id: Uuid, comment: NewComment) -> Result<Comment>;

    /// Apply a deletion plan computed from an earlier snapshot.
    ///
    /// Each statement is scoped to the post and guarded so that a plan made
    /// stale by a concurrent reply changes nothing. Returns the number of
    /// rows touched.
    async fn apply_deletion(&self, post_id: Uuid, plan: DeletionPlan) -> Result<u64>;
}

#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
}

impl PgCommentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DELETE_CHILDLESS: &str = r#"
    DELETE FROM comments
    WHERE post_id = $1 AND id = $2
      AND NOT EXISTS (SELECT 1 FROM comments c WHERE c.parent_comment_id = $2)
"#;

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, writer_id, parent_comment_id, description, is_deleted, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn insert_comment(&self, post_id: Uuid, comment: NewComment) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, writer_id, parent_comment_id, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, post_id, writer_id, parent_comment_id, description, is_deleted, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(comment.writer_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn apply_deletion(&self, post_id: Uuid, plan: DeletionPlan) -> Result<u64> {
        match plan {
            DeletionPlan::SoftDelete { comment_id } => {
                let result = sqlx::query(
                    "UPDATE comments SET is_deleted = TRUE WHERE post_id = $1 AND id = $2",
                )
                .bind(post_id)
                .bind(comment_id)
                .execute(&self.pool)
                .await?;
                Ok(result.rows_affected())
            }
            DeletionPlan::HardDelete { comment_id } => {
                let result = sqlx::query(DELETE_CHILDLESS)
                    .bind(post_id)
                    .bind(comment_id)
                    .execute(&self.pool)
                    .await?;
                Ok(result.rows_affected())
            }
            DeletionPlan::HardDeleteWithParent {
                comment_id,
                parent_id,
            } => {
                let mut tx = self.pool.begin().await?;

                let target = sqlx::query(DELETE_CHILDLESS)
                    .bind(post_id)
                    .bind(comment_id)
                    .execute(&mut *tx)
                    .await?;

                // Parent goes only if it is still a placeholder with no replies left.
                let parent = sqlx::query(
                    r#"
                    DELETE FROM comments
                    WHERE post_id = $1 AND id = $2 AND is_deleted
                      AND NOT EXISTS (SELECT 1 FROM comments c WHERE c.parent_comment_id = $2)
                    "#,
                )
                .bind(post_id)
                .bind(parent_id)
                .execute(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(target.rows_affected() + parent.rows_affected())
            }
        }
    }
}
