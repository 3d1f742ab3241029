use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewPost, Post, PostFilter, PostPatch, PostState, PostSummary, ReportOutcome};
use crate::services::feed_window::FeedWindow;

/// Persistence seam for posts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Count posts matching a feed filter.
    async fn count_posts(&self, filter: &PostFilter) -> Result<u64>;

    /// Newest-first page of posts matching a feed filter.
    async fn list_posts(&self, filter: &PostFilter, window: FeedWindow)
        -> Result<Vec<PostSummary>>;

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>>;

    async fn increment_views(&self, post_id: Uuid) -> Result<()>;

    async fn create_post(&self, writer_id: Uuid, post: NewPost) -> Result<Post>;

    /// Apply a partial update. Returns the updated post, or `None` if it no
    /// longer exists.
    async fn update_post(&self, post_id: Uuid, patch: PostPatch) -> Result<Option<Post>>;

    /// Returns false when nothing was deleted.
    async fn delete_post(&self, post_id: Uuid) -> Result<bool>;

    async fn set_state(&self, post_id: Uuid, state: PostState) -> Result<bool>;

    async fn set_buyer(&self, post_id: Uuid, buyer_id: Uuid) -> Result<bool>;

    /// Add the user's like, or remove it if present. Returns the likes after
    /// the toggle, oldest first.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Record a report once per user.
    async fn report(&self, post_id: Uuid, user_id: Uuid) -> Result<ReportOutcome>;

    /// Random sample of still-available posts in a category.
    async fn sample_related(&self, category_id: Uuid, limit: u32) -> Result<Vec<PostSummary>>;
}

const POST_COLUMNS: &str = r#"
    p.id, p.title, p.description, p.writer_id, p.category_id, p.price, p.state,
    p.buyer_id, p.images,
    ARRAY(SELECT l.user_id FROM post_likes l WHERE l.post_id = p.id ORDER BY l.created_at) AS likes,
    p.town, p.town_range, p.is_suggestable, p.is_talkable, p.telephone, p.views,
    (SELECT COUNT(*) FROM post_reports r WHERE r.post_id = p.id) AS report_count,
    p.created_at, p.updated_at
"#;

const SUMMARY_COLUMNS: &str = r#"
    p.id, p.title, p.town, p.price, p.state, p.images,
    (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
    p.created_at
"#;

// $1 towns, $2 categories (empty = all), $3 keyword patterns (empty = all)
const FEED_FILTER: &str = r#"
    p.town = ANY($1)
    AND (cardinality($2::uuid[]) = 0 OR p.category_id = ANY($2))
    AND (
        cardinality($3::text[]) = 0
        OR p.title LIKE ANY($3)
        OR p.description LIKE ANY($3)
    )
"#;

/// Escape LIKE metacharacters and wrap a search word for substring matching.
pub(crate) fn like_pattern(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len() + 2);
    escaped.push('%');
    for ch in word.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn keyword_patterns(filter: &PostFilter) -> Vec<String> {
    filter.keywords.iter().map(|w| like_pattern(w)).collect()
}

#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {}", FEED_FILTER);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(&filter.towns)
            .bind(&filter.categories)
            .bind(keyword_patterns(filter))
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        window: FeedWindow,
    ) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "SELECT {} FROM posts p WHERE {} ORDER BY p.created_at DESC, p.id DESC LIMIT $4 OFFSET $5",
            SUMMARY_COLUMNS, FEED_FILTER
        );
        let posts = sqlx::query_as::<_, PostSummary>(&sql)
            .bind(&filter.towns)
            .bind(&filter.categories)
            .bind(keyword_patterns(filter))
            .bind(i64::from(window.limit))
            .bind(window.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = $1", POST_COLUMNS);
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn increment_views(&self, post_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_post(&self, writer_id: Uuid, post: NewPost) -> Result<Post> {
        let post_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, title, description, writer_id, category_id, price, state, images,
                town, town_range, is_suggestable, is_talkable, telephone
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(post_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(writer_id)
        .bind(post.category_id)
        .bind(post.price)
        .bind(post.state.code())
        .bind(&post.images)
        .bind(&post.town)
        .bind(post.town_range)
        .bind(post.is_suggestable)
        .bind(post.is_talkable)
        .bind(&post.telephone)
        .execute(&self.pool)
        .await?;

        self.find_post(post_id)
            .await?
            .ok_or_else(|| crate::error::AppError::Internal(format!("post {} vanished", post_id)))
    }

    async fn update_post(&self, post_id: Uuid, patch: PostPatch) -> Result<Option<Post>> {
        let result = sqlx::query(
            r#"
            UPDATE posts SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category_id = COALESCE($4, category_id),
                price = COALESCE($5, price),
                state = COALESCE($6, state),
                images = COALESCE($7, images),
                town = COALESCE($8, town),
                town_range = COALESCE($9, town_range),
                is_suggestable = COALESCE($10, is_suggestable),
                is_talkable = COALESCE($11, is_talkable),
                telephone = COALESCE($12, telephone),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.category_id)
        .bind(patch.price)
        .bind(patch.state.map(PostState::code))
        .bind(patch.images)
        .bind(patch.town)
        .bind(patch.town_range)
        .bind(patch.is_suggestable)
        .bind(patch.is_talkable)
        .bind(patch.telephone)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_post(post_id).await
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_state(&self, post_id: Uuid, state: PostState) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET state = $2, updated_at = NOW() WHERE id = $1")
            .bind(post_id)
            .bind(state.code())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_buyer(&self, post_id: Uuid, buyer_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("UPDATE posts SET buyer_id = $2, updated_at = NOW() WHERE id = $1")
                .bind(post_id)
                .bind(buyer_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let likes: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM post_likes WHERE post_id = $1 ORDER BY created_at",
        )
        .bind(post_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(likes)
    }

    async fn report(&self, post_id: Uuid, user_id: Uuid) -> Result<ReportOutcome> {
        let inserted = sqlx::query(
            "INSERT INTO post_reports (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(ReportOutcome::AlreadyReported);
        }

        match self.find_post(post_id).await? {
            Some(post) => Ok(ReportOutcome::Reported(post)),
            None => Err(crate::error::AppError::NotFound(format!(
                "post {} not found",
                post_id
            ))),
        }
    }

    async fn sample_related(&self, category_id: Uuid, limit: u32) -> Result<Vec<PostSummary>> {
        let available: Vec<i16> = PostState::available().iter().map(|s| s.code()).collect();
        let sql = format!(
            "SELECT {} FROM posts p WHERE p.category_id = $1 AND p.state = ANY($2) ORDER BY random() LIMIT $3",
            SUMMARY_COLUMNS
        );
        let posts = sqlx::query_as::<_, PostSummary>(&sql)
            .bind(category_id)
            .bind(available)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_wraps_word() {
        assert_eq!(like_pattern("자전거"), "%자전거%");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_keyword_patterns_follow_filter_order() {
        let filter = PostFilter {
            keywords: vec!["책상".into(), "의자".into()],
            ..Default::default()
        };
        assert_eq!(keyword_patterns(&filter), vec!["%책상%", "%의자%"]);
    }
}
