/// Post service - feed listing, post lifecycle and search-log driven lookups
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::db::category_repo::{self, LOCAL_PROMOTION, USED_GOODS};
use crate::db::{CommentStore, PostStore};
use crate::error::{AppError, Result};
use crate::metrics::feed::{
    FEED_REQUEST_DURATION_SECONDS, FEED_REQUEST_TOTAL, SEARCH_LOG_WRITE_TOTAL,
};
use crate::middleware::permissions::check_post_ownership;
use crate::models::{
    NewPost, Post, PostDetail, PostFilter, PostPatch, PostState, PostSummary, ReportOutcome,
};
use crate::neighborhood::ProximityResolver;
use crate::search::{SearchLog, SearchLogEntry};
use crate::services::comment_thread::build_tree;
use crate::services::feed_window::FeedWindow;
use crate::storage::{release_images, ImageStore};

/// One infinite-scroll page request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub town: String,
    pub town_range: u32,
    /// Empty means every category.
    pub categories: Vec<Uuid>,
    pub scroll: u64,
    /// Match count the client saw on the first page of its session, 0 if none.
    pub baseline_count: u64,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub posts: Vec<PostSummary>,
    /// Current match count; echoed back by the client as its baseline.
    pub max_num: u64,
}

pub struct PostService {
    posts: Arc<dyn PostStore>,
    comments: Arc<dyn CommentStore>,
    images: Arc<dyn ImageStore>,
    search_log: Arc<dyn SearchLog>,
    resolver: ProximityResolver,
    feed: FeedConfig,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        comments: Arc<dyn CommentStore>,
        images: Arc<dyn ImageStore>,
        search_log: Arc<dyn SearchLog>,
        resolver: ProximityResolver,
        feed: FeedConfig,
    ) -> Self {
        Self {
            posts,
            comments,
            images,
            search_log,
            resolver,
            feed,
        }
    }

    /// List one page of the neighborhood feed.
    pub async fn list_feed(&self, request: FeedRequest) -> Result<FeedPage> {
        let board = board_label(&request.categories);
        let started = Instant::now();

        let result = self.list_feed_inner(request).await;

        FEED_REQUEST_DURATION_SECONDS
            .with_label_values(&[board])
            .observe(started.elapsed().as_secs_f64());
        FEED_REQUEST_TOTAL
            .with_label_values(&[if result.is_ok() { "success" } else { "error" }])
            .inc();

        result
    }

    async fn list_feed_inner(&self, request: FeedRequest) -> Result<FeedPage> {
        let areas = self.resolver.resolve(&request.town, request.town_range)?;

        let keywords: Vec<String> = request
            .query
            .as_deref()
            .map(|q| q.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        if let Some(query) = request.query.as_deref().map(str::trim) {
            if !query.is_empty() {
                self.spawn_search_log(query, &request.categories);
            }
        }

        let filter = PostFilter {
            towns: areas.into_vec(),
            categories: request.categories,
            keywords,
        };

        let current_count = self.posts.count_posts(&filter).await?;
        let window = FeedWindow::compute(
            self.feed.page_size,
            request.scroll,
            request.baseline_count,
            current_count,
        )?;
        let posts = self.posts.list_posts(&filter, window).await?;

        tracing::debug!(
            town = %request.town,
            areas = filter.towns.len(),
            skip = window.skip,
            returned = posts.len(),
            max_num = current_count,
            "Listed feed page"
        );

        Ok(FeedPage {
            posts,
            max_num: current_count,
        })
    }

    /// Record the search in the background; failures are only logged.
    fn spawn_search_log(&self, query: &str, categories: &[Uuid]) {
        let entry = SearchLogEntry {
            log: query.to_string(),
            category: search_group(categories).to_string(),
            timestamp: Utc::now(),
        };
        let search_log = Arc::clone(&self.search_log);

        tokio::spawn(async move {
            match search_log.record(entry).await {
                Ok(()) => SEARCH_LOG_WRITE_TOTAL.with_label_values(&["success"]).inc(),
                Err(e) => {
                    SEARCH_LOG_WRITE_TOTAL.with_label_values(&["error"]).inc();
                    tracing::warn!(error = %e, "Failed to record search log");
                }
            }
        });
    }

    async fn require_post(&self, post_id: Uuid) -> Result<Post> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", post_id)))
    }

    /// Load a post with its comment threads and count the view.
    pub async fn get_post_detail(&self, post_id: Uuid) -> Result<PostDetail> {
        let mut post = self.require_post(post_id).await?;
        self.posts.increment_views(post_id).await?;
        post.views += 1;

        let comments = self.comments.list_comments(post_id).await?;
        Ok(PostDetail {
            post,
            comments: build_tree(&comments),
        })
    }

    pub async fn create_post(&self, writer_id: Uuid, new_post: NewPost) -> Result<Post> {
        let post = self.posts.create_post(writer_id, new_post).await?;
        tracing::info!(post_id = %post.id, %writer_id, town = %post.town, "Created post");
        Ok(post)
    }

    /// Update a post; images dropped by the update are released from storage.
    pub async fn update_post(&self, user_id: Uuid, post_id: Uuid, patch: PostPatch) -> Result<Post> {
        let existing = self.require_post(post_id).await?;
        check_post_ownership(user_id, &existing)?;

        let removed = patch
            .images
            .as_deref()
            .map(|images| removed_images(&existing.images, images))
            .unwrap_or_default();

        let updated = self
            .posts
            .update_post(post_id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", post_id)))?;

        release_images(self.images.as_ref(), &removed).await;
        Ok(updated)
    }

    pub async fn delete_post(&self, user_id: Uuid, post_id: Uuid) -> Result<()> {
        let existing = self.require_post(post_id).await?;
        check_post_ownership(user_id, &existing)?;

        if !self.posts.delete_post(post_id).await? {
            return Err(AppError::NotFound(format!("post {} not found", post_id)));
        }

        release_images(self.images.as_ref(), &existing.images).await;
        tracing::info!(%post_id, images = existing.images.len(), "Deleted post");
        Ok(())
    }

    pub async fn set_state(&self, user_id: Uuid, post_id: Uuid, state: PostState) -> Result<()> {
        let existing = self.require_post(post_id).await?;
        check_post_ownership(user_id, &existing)?;

        if !self.posts.set_state(post_id, state).await? {
            return Err(AppError::NotFound(format!("post {} not found", post_id)));
        }
        tracing::info!(%post_id, from = %existing.state, to = %state, "Post state changed");
        Ok(())
    }

    pub async fn set_buyer(&self, user_id: Uuid, post_id: Uuid, buyer_id: Uuid) -> Result<()> {
        let existing = self.require_post(post_id).await?;
        check_post_ownership(user_id, &existing)?;

        if !self.posts.set_buyer(post_id, buyer_id).await? {
            return Err(AppError::NotFound(format!("post {} not found", post_id)));
        }
        Ok(())
    }

    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<Vec<Uuid>> {
        self.require_post(post_id).await?;
        self.posts.toggle_like(post_id, user_id).await
    }

    pub async fn report(&self, user_id: Uuid, post_id: Uuid) -> Result<ReportOutcome> {
        self.require_post(post_id).await?;
        let outcome = self.posts.report(post_id, user_id).await?;
        if matches!(outcome, ReportOutcome::Reported(_)) {
            tracing::info!(%post_id, reporter = %user_id, "Post reported");
        }
        Ok(outcome)
    }

    pub async fn related_posts(&self, category_id: Uuid) -> Result<Vec<PostSummary>> {
        self.posts
            .sample_related(category_id, self.feed.related_sample_size)
            .await
    }

    /// Most searched terms.
    pub async fn ranking(&self) -> Result<Vec<String>> {
        Ok(self.search_log.top_terms(self.feed.ranking_size).await?)
    }

    pub async fn autocomplete(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .search_log
            .suggest(prefix, self.feed.autocomplete_size)
            .await?)
    }
}

/// Images present before an update and absent after it.
fn removed_images(before: &[String], after: &[String]) -> Vec<String> {
    before
        .iter()
        .filter(|name| !after.contains(name))
        .cloned()
        .collect()
}

/// Board a search is attributed to.
fn search_group(categories: &[Uuid]) -> &'static str {
    if category_repo::is_used_goods(categories) {
        USED_GOODS
    } else {
        LOCAL_PROMOTION
    }
}

fn board_label(categories: &[Uuid]) -> &'static str {
    if categories.is_empty() {
        "all"
    } else if category_repo::is_used_goods(categories) {
        "used_goods"
    } else {
        "promotion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::comment_repo::MockCommentStore;
    use crate::db::post_repo::MockPostStore;
    use crate::neighborhood::NeighborhoodGraph;
    use crate::search::MockSearchLog;
    use crate::storage::MockImageStore;
    use mockall::predicate::eq;

    fn graph() -> Arc<NeighborhoodGraph> {
        Arc::new(
            NeighborhoodGraph::from_adjacency(vec![
                ("녹번동", vec!["응암동", "불광동"]),
                ("응암동", vec!["녹번동"]),
                ("불광동", vec!["녹번동"]),
            ])
            .unwrap(),
        )
    }

    fn feed_config() -> FeedConfig {
        FeedConfig {
            page_size: 15,
            related_sample_size: 8,
            ranking_size: 10,
            autocomplete_size: 15,
        }
    }

    fn service(posts: MockPostStore, images: MockImageStore) -> PostService {
        PostService::new(
            Arc::new(posts),
            Arc::new(MockCommentStore::new()),
            Arc::new(images),
            Arc::new(MockSearchLog::new()),
            ProximityResolver::new(graph()),
            feed_config(),
        )
    }

    fn post(writer_id: Uuid, images: &[&str]) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: "자전거 팝니다".into(),
            description: "거의 새것".into(),
            writer_id,
            category_id: Uuid::new_v4(),
            price: 50_000,
            state: PostState::Selling,
            buyer_id: None,
            images: images.iter().map(|s| s.to_string()).collect(),
            likes: vec![],
            town: "녹번동".into(),
            town_range: Some(1),
            is_suggestable: false,
            is_talkable: true,
            telephone: None,
            views: 3,
            report_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_removed_images() {
        let before = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let after = vec!["c".to_string(), "d".to_string()];
        assert_eq!(removed_images(&before, &after), vec!["a", "b"]);
    }

    #[test]
    fn test_search_group_defaults_to_promotion() {
        let digital = category_repo::category_id(USED_GOODS, "디지털/가전");
        assert_eq!(search_group(&[digital]), USED_GOODS);
        assert_eq!(search_group(&[]), LOCAL_PROMOTION);
    }

    #[tokio::test]
    async fn test_feed_filters_by_resolved_areas_and_compensates() {
        let mut posts = MockPostStore::new();
        posts
            .expect_count_posts()
            .withf(|filter: &PostFilter| {
                filter.towns == vec!["녹번동", "응암동", "불광동"] && filter.keywords.is_empty()
            })
            .returning(|_| Ok(105));
        posts
            .expect_list_posts()
            .withf(|_, window: &FeedWindow| window.skip == 20 && window.limit == 15)
            .returning(|_, _| Ok(vec![]));

        let svc = service(posts, MockImageStore::new());
        let page = svc
            .list_feed(FeedRequest {
                town: "녹번동".into(),
                town_range: 1,
                categories: vec![],
                scroll: 1,
                baseline_count: 100,
                query: None,
            })
            .await
            .unwrap();

        assert_eq!(page.max_num, 105);
    }

    #[tokio::test]
    async fn test_feed_unknown_town_is_bad_request() {
        let svc = service(MockPostStore::new(), MockImageStore::new());
        let err = svc
            .list_feed(FeedRequest {
                town: "없는동".into(),
                town_range: 2,
                categories: vec![],
                scroll: 0,
                baseline_count: 0,
                query: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_update_releases_dropped_images() {
        let owner = Uuid::new_v4();
        let existing = post(owner, &["a", "b"]);
        let post_id = existing.id;
        let updated = Post {
            images: vec!["b".into(), "c".into()],
            ..existing.clone()
        };

        let mut posts = MockPostStore::new();
        posts
            .expect_find_post()
            .with(eq(post_id))
            .returning(move |_| Ok(Some(existing.clone())));
        posts
            .expect_update_post()
            .returning(move |_, _| Ok(Some(updated.clone())));

        let mut images = MockImageStore::new();
        images
            .expect_delete()
            .with(eq("a"))
            .times(1)
            .returning(|_| Ok(()));

        let svc = service(posts, images);
        let patch = PostPatch {
            images: Some(vec!["b".into(), "c".into()]),
            ..Default::default()
        };
        let result = svc.update_post(owner, post_id, patch).await.unwrap();
        assert_eq!(result.images, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_non_owner_cannot_delete() {
        let existing = post(Uuid::new_v4(), &["a"]);
        let post_id = existing.id;

        let mut posts = MockPostStore::new();
        posts
            .expect_find_post()
            .returning(move |_| Ok(Some(existing.clone())));
        posts.expect_delete_post().never();

        let svc = service(posts, MockImageStore::new());
        let err = svc.delete_post(Uuid::new_v4(), post_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_delete_releases_every_image() {
        let owner = Uuid::new_v4();
        let existing = post(owner, &["a", "b"]);
        let post_id = existing.id;

        let mut posts = MockPostStore::new();
        posts
            .expect_find_post()
            .returning(move |_| Ok(Some(existing.clone())));
        posts.expect_delete_post().returning(|_| Ok(true));

        let mut images = MockImageStore::new();
        images.expect_delete().times(2).returning(|_| Ok(()));

        let svc = service(posts, images);
        svc.delete_post(owner, post_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_autocomplete_skips_search_index() {
        let svc = service(MockPostStore::new(), MockImageStore::new());
        assert!(svc.autocomplete("   ").await.unwrap().is_empty());
    }
}
