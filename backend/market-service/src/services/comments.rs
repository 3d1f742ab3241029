/// Comment service - adds comments and applies the cascading delete policy
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CommentStore, PostStore};
use crate::error::{AppError, Result};
use crate::metrics::comments::COMMENT_DELETIONS_TOTAL;
use crate::middleware::permissions::check_comment_ownership;
use crate::models::{NewComment, PostDetail};
use crate::services::comment_thread::{build_tree, plan_deletion, ThreadError};

pub struct CommentService {
    posts: Arc<dyn PostStore>,
    comments: Arc<dyn CommentStore>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostStore>, comments: Arc<dyn CommentStore>) -> Self {
        Self { posts, comments }
    }

    /// Post with its current threads, without counting a view.
    async fn thread_view(&self, post_id: Uuid) -> Result<PostDetail> {
        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", post_id)))?;
        let comments = self.comments.list_comments(post_id).await?;

        Ok(PostDetail {
            post,
            comments: build_tree(&comments),
        })
    }

    /// Add a comment or a reply. A reply must target a top-level comment of
    /// the same post.
    pub async fn add_comment(&self, post_id: Uuid, comment: NewComment) -> Result<PostDetail> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {} not found", post_id)));
        }

        if let Some(parent_id) = comment.parent_comment_id {
            let existing = self.comments.list_comments(post_id).await?;
            let parent = existing
                .iter()
                .find(|c| c.id == parent_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "parent comment {} does not belong to post {}",
                        parent_id, post_id
                    ))
                })?;
            if parent.parent_comment_id.is_some() {
                return Err(AppError::BadRequest(
                    "replies can only be added to top-level comments".to_string(),
                ));
            }
        }

        let created = self.comments.insert_comment(post_id, comment).await?;
        tracing::info!(
            %post_id,
            comment_id = %created.id,
            reply = created.parent_comment_id.is_some(),
            "Comment added"
        );

        self.thread_view(post_id).await
    }

    /// Delete a comment written by `user_id`.
    ///
    /// The plan is computed from one snapshot and applied as a single guarded
    /// mutation; if a concurrent change makes it stale, nothing is touched.
    pub async fn delete_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<PostDetail> {
        if self.posts.find_post(post_id).await?.is_none() {
            return Err(AppError::NotFound(format!("post {} not found", post_id)));
        }

        let snapshot = self.comments.list_comments(post_id).await?;
        let target = snapshot
            .iter()
            .find(|c| c.id == comment_id)
            .ok_or(ThreadError::CommentNotFound(comment_id))?;
        check_comment_ownership(user_id, target)?;

        let plan = plan_deletion(&snapshot, comment_id)?;
        let touched = self.comments.apply_deletion(post_id, plan).await?;

        if touched == 0 {
            tracing::warn!(
                %post_id,
                %comment_id,
                plan = plan.kind(),
                "Comment deletion plan was stale; nothing changed"
            );
        } else {
            COMMENT_DELETIONS_TOTAL
                .with_label_values(&[plan.kind()])
                .inc();
            tracing::info!(%post_id, %comment_id, plan = plan.kind(), touched, "Comment deleted");
        }

        self.thread_view(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::comment_repo::MockCommentStore;
    use crate::db::post_repo::MockPostStore;
    use crate::models::{Comment, Post, PostState};
    use crate::services::comment_thread::DeletionPlan;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn post(post_id: Uuid) -> Post {
        Post {
            id: post_id,
            title: "책상".into(),
            description: "원목 책상".into(),
            writer_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            price: 30_000,
            state: PostState::Selling,
            buyer_id: None,
            images: vec![],
            likes: vec![],
            town: "녹번동".into(),
            town_range: None,
            is_suggestable: false,
            is_talkable: true,
            telephone: None,
            views: 0,
            report_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn comment(post_id: Uuid, writer_id: Uuid, parent: Option<Uuid>, deleted: bool) -> Comment {
        Comment {
            id: Uuid::new_v4(),
            post_id,
            writer_id,
            parent_comment_id: parent,
            description: "댓글".into(),
            is_deleted: deleted,
            created_at: Utc::now(),
        }
    }

    fn posts_with(post_id: Uuid) -> MockPostStore {
        let mut posts = MockPostStore::new();
        posts
            .expect_find_post()
            .with(eq(post_id))
            .returning(move |id| Ok(Some(post(id))));
        posts
    }

    #[tokio::test]
    async fn test_reply_to_reply_is_rejected() {
        let post_id = Uuid::new_v4();
        let writer = Uuid::new_v4();
        let root = comment(post_id, writer, None, false);
        let reply = comment(post_id, writer, Some(root.id), false);
        let reply_id = reply.id;
        let snapshot = vec![root, reply];

        let mut comments = MockCommentStore::new();
        comments
            .expect_list_comments()
            .returning(move |_| Ok(snapshot.clone()));
        comments.expect_insert_comment().never();

        let svc = CommentService::new(Arc::new(posts_with(post_id)), Arc::new(comments));
        let err = svc
            .add_comment(
                post_id,
                NewComment {
                    writer_id: writer,
                    parent_comment_id: Some(reply_id),
                    description: "대댓글의 댓글".into(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_last_reply_of_deleted_parent_removes_both() {
        let post_id = Uuid::new_v4();
        let writer = Uuid::new_v4();
        let parent = comment(post_id, writer, None, true);
        let reply = comment(post_id, writer, Some(parent.id), false);
        let (parent_id, reply_id) = (parent.id, reply.id);
        let snapshot = vec![parent, reply];

        let mut comments = MockCommentStore::new();
        comments
            .expect_list_comments()
            .returning(move |_| Ok(snapshot.clone()));
        comments
            .expect_apply_deletion()
            .with(
                eq(post_id),
                eq(DeletionPlan::HardDeleteWithParent {
                    comment_id: reply_id,
                    parent_id,
                }),
            )
            .times(1)
            .returning(|_, _| Ok(2));

        let svc = CommentService::new(Arc::new(posts_with(post_id)), Arc::new(comments));
        svc.delete_comment(writer, post_id, reply_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_by_other_user_is_forbidden() {
        let post_id = Uuid::new_v4();
        let target = comment(post_id, Uuid::new_v4(), None, false);
        let target_id = target.id;
        let snapshot = vec![target];

        let mut comments = MockCommentStore::new();
        comments
            .expect_list_comments()
            .returning(move |_| Ok(snapshot.clone()));
        comments.expect_apply_deletion().never();

        let svc = CommentService::new(Arc::new(posts_with(post_id)), Arc::new(comments));
        let err = svc
            .delete_comment(Uuid::new_v4(), post_id, target_id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_unknown_comment_is_not_found() {
        let post_id = Uuid::new_v4();

        let mut comments = MockCommentStore::new();
        comments.expect_list_comments().returning(|_| Ok(vec![]));
        comments.expect_apply_deletion().never();

        let svc = CommentService::new(Arc::new(posts_with(post_id)), Arc::new(comments));
        let err = svc
            .delete_comment(Uuid::new_v4(), post_id, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }
}
