//! In-memory collaborators for HTTP-level tests
//!
//! Implements every store seam over `Mutex`-guarded collections so the full
//! actix app can be exercised without Postgres, S3 or Elasticsearch.
#![allow(dead_code)]

use actix_web::web;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use market_service::config::{FeedConfig, GeocodingConfig};
use market_service::db::category_repo::default_groups;
use market_service::db::{CategoryStore, CommentStore, PostStore};
use market_service::middleware::{Claims, JwtAuthMiddleware};
use market_service::models::{
    CategoryGroup, Comment, NewComment, NewPost, Post, PostFilter, PostPatch, PostState,
    PostSummary, ReportOutcome,
};
use market_service::neighborhood::{NeighborhoodGraph, ProximityResolver};
use market_service::search::{SearchLog, SearchLogEntry, SearchLogError};
use market_service::services::comment_thread::DeletionPlan;
use market_service::services::feed_window::FeedWindow;
use market_service::services::GeocodingClient;
use market_service::storage::{ImageStore, ImageStoreError};
use market_service::{AppState, Collaborators, Result};

pub const SECRET: &str = "integration-test-secret";

pub const NOKBEON: &str = "서울특별시 은평구 녹번동";
pub const EUNGAM: &str = "서울특별시 은평구 응암동";
pub const BULGWANG: &str = "서울특별시 은평구 불광동";
pub const YEOKCHON: &str = "서울특별시 은평구 역촌동";

/// Bearer header value for `user_id`.
pub fn bearer(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

/// The sample adjacency export shipped with the service.
pub fn sample_graph() -> Arc<NeighborhoodGraph> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/dong_data.json");
    Arc::new(NeighborhoodGraph::load(path).unwrap())
}

// =====================================================================
// Posts and comments
// =====================================================================

#[derive(Default)]
struct MarketData {
    posts: Vec<Post>,
    comments: Vec<Comment>,
    reports: HashSet<(Uuid, Uuid)>,
}

/// Posts and comments sharing one lock, like rows sharing one database.
#[derive(Default)]
pub struct InMemoryMarket {
    data: Mutex<MarketData>,
}

impl InMemoryMarket {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert a post directly, `age_minutes` in the past.
    pub fn seed_post(&self, writer_id: Uuid, town: &str, title: &str, age_minutes: i64) -> Post {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{} 설명", title),
            writer_id,
            category_id: Uuid::new_v4(),
            price: 10_000,
            state: PostState::Selling,
            buyer_id: None,
            images: vec![],
            likes: vec![],
            town: town.to_string(),
            town_range: Some(1),
            is_suggestable: false,
            is_talkable: true,
            telephone: None,
            views: 0,
            report_count: 0,
            created_at,
            updated_at: created_at,
        };
        self.data.lock().unwrap().posts.push(post.clone());
        post
    }

    pub fn seed_comment(
        &self,
        post_id: Uuid,
        writer_id: Uuid,
        parent_comment_id: Option<Uuid>,
        is_deleted: bool,
    ) -> Comment {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            writer_id,
            parent_comment_id,
            description: "댓글".to_string(),
            is_deleted,
            created_at: Utc::now(),
        };
        self.data.lock().unwrap().comments.push(comment.clone());
        comment
    }

    pub fn comments_of(&self, post_id: Uuid) -> Vec<Comment> {
        self.data
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect()
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.data
            .lock()
            .unwrap()
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
    }
}

fn matches_filter(post: &Post, filter: &PostFilter) -> bool {
    filter.towns.contains(&post.town)
        && (filter.categories.is_empty() || filter.categories.contains(&post.category_id))
        && (filter.keywords.is_empty()
            || filter
                .keywords
                .iter()
                .any(|w| post.title.contains(w.as_str()) || post.description.contains(w.as_str())))
}

fn summary(post: &Post, comments: &[Comment]) -> PostSummary {
    PostSummary {
        id: post.id,
        title: post.title.clone(),
        town: post.town.clone(),
        price: post.price,
        state: post.state,
        images: post.images.clone(),
        like_count: post.likes.len() as i64,
        comment_count: comments.iter().filter(|c| c.post_id == post.id).count() as i64,
        created_at: post.created_at,
    }
}

#[async_trait]
impl PostStore for InMemoryMarket {
    async fn count_posts(&self, filter: &PostFilter) -> Result<u64> {
        let data = self.data.lock().unwrap();
        Ok(data.posts.iter().filter(|p| matches_filter(p, filter)).count() as u64)
    }

    async fn list_posts(&self, filter: &PostFilter, window: FeedWindow) -> Result<Vec<PostSummary>> {
        let data = self.data.lock().unwrap();
        let mut matching: Vec<&Post> = data
            .posts
            .iter()
            .filter(|p| matches_filter(p, filter))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(window.skip as usize)
            .take(window.limit as usize)
            .map(|p| summary(p, &data.comments))
            .collect())
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.post(post_id))
    }

    async fn increment_views(&self, post_id: Uuid) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(post) = data.posts.iter_mut().find(|p| p.id == post_id) {
            post.views += 1;
        }
        Ok(())
    }

    async fn create_post(&self, writer_id: Uuid, new_post: NewPost) -> Result<Post> {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: new_post.title,
            description: new_post.description,
            writer_id,
            category_id: new_post.category_id,
            price: new_post.price,
            state: new_post.state,
            buyer_id: None,
            images: new_post.images,
            likes: vec![],
            town: new_post.town,
            town_range: new_post.town_range,
            is_suggestable: new_post.is_suggestable,
            is_talkable: new_post.is_talkable,
            telephone: new_post.telephone,
            views: 0,
            report_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.data.lock().unwrap().posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: Uuid, patch: PostPatch) -> Result<Option<Post>> {
        let mut data = self.data.lock().unwrap();
        let Some(post) = data.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(None);
        };

        if let Some(v) = patch.title {
            post.title = v;
        }
        if let Some(v) = patch.description {
            post.description = v;
        }
        if let Some(v) = patch.category_id {
            post.category_id = v;
        }
        if let Some(v) = patch.price {
            post.price = v;
        }
        if let Some(v) = patch.state {
            post.state = v;
        }
        if let Some(v) = patch.images {
            post.images = v;
        }
        if let Some(v) = patch.town {
            post.town = v;
        }
        if let Some(v) = patch.town_range {
            post.town_range = Some(v);
        }
        if let Some(v) = patch.is_suggestable {
            post.is_suggestable = v;
        }
        if let Some(v) = patch.is_talkable {
            post.is_talkable = v;
        }
        if let Some(v) = patch.telephone {
            post.telephone = Some(v);
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        let before = data.posts.len();
        data.posts.retain(|p| p.id != post_id);
        data.comments.retain(|c| c.post_id != post_id);
        Ok(data.posts.len() != before)
    }

    async fn set_state(&self, post_id: Uuid, state: PostState) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .map(|p| p.state = state)
            .is_some())
    }

    async fn set_buyer(&self, post_id: Uuid, buyer_id: Uuid) -> Result<bool> {
        let mut data = self.data.lock().unwrap();
        Ok(data
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .map(|p| p.buyer_id = Some(buyer_id))
            .is_some())
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>> {
        let mut data = self.data.lock().unwrap();
        let Some(post) = data.posts.iter_mut().find(|p| p.id == post_id) else {
            return Ok(vec![]);
        };
        if let Some(pos) = post.likes.iter().position(|u| *u == user_id) {
            post.likes.remove(pos);
        } else {
            post.likes.push(user_id);
        }
        Ok(post.likes.clone())
    }

    async fn report(&self, post_id: Uuid, user_id: Uuid) -> Result<ReportOutcome> {
        let mut data = self.data.lock().unwrap();
        if !data.reports.insert((post_id, user_id)) {
            return Ok(ReportOutcome::AlreadyReported);
        }
        let post = data
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .map(|p| {
                p.report_count += 1;
                p.clone()
            });
        Ok(post.map_or(ReportOutcome::AlreadyReported, ReportOutcome::Reported))
    }

    async fn sample_related(&self, category_id: Uuid, limit: u32) -> Result<Vec<PostSummary>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .posts
            .iter()
            .filter(|p| p.category_id == category_id && p.state != PostState::Sold)
            .take(limit as usize)
            .map(|p| summary(p, &data.comments))
            .collect())
    }
}

#[async_trait]
impl CommentStore for InMemoryMarket {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        Ok(self.comments_of(post_id))
    }

    async fn insert_comment(&self, post_id: Uuid, comment: NewComment) -> Result<Comment> {
        let created = Comment {
            id: Uuid::new_v4(),
            post_id,
            writer_id: comment.writer_id,
            parent_comment_id: comment.parent_comment_id,
            description: comment.description,
            is_deleted: false,
            created_at: Utc::now(),
        };
        self.data.lock().unwrap().comments.push(created.clone());
        Ok(created)
    }

    async fn apply_deletion(&self, post_id: Uuid, plan: DeletionPlan) -> Result<u64> {
        let mut data = self.data.lock().unwrap();
        let has_children = |comments: &[Comment], id: Uuid| {
            comments.iter().any(|c| c.parent_comment_id == Some(id))
        };

        match plan {
            DeletionPlan::SoftDelete { comment_id } => {
                let target = data
                    .comments
                    .iter_mut()
                    .find(|c| c.post_id == post_id && c.id == comment_id);
                Ok(target.map(|c| c.is_deleted = true).map_or(0, |_| 1))
            }
            DeletionPlan::HardDelete { comment_id } => {
                if has_children(&data.comments, comment_id) {
                    return Ok(0);
                }
                let before = data.comments.len();
                data.comments
                    .retain(|c| !(c.post_id == post_id && c.id == comment_id));
                Ok((before - data.comments.len()) as u64)
            }
            DeletionPlan::HardDeleteWithParent {
                comment_id,
                parent_id,
            } => {
                if has_children(&data.comments, comment_id) {
                    return Ok(0);
                }
                let before = data.comments.len();
                data.comments
                    .retain(|c| !(c.post_id == post_id && c.id == comment_id));
                let parent_orphaned = data
                    .comments
                    .iter()
                    .any(|c| c.id == parent_id && c.is_deleted)
                    && !has_children(&data.comments, parent_id);
                if parent_orphaned {
                    data.comments.retain(|c| c.id != parent_id);
                }
                Ok((before - data.comments.len()) as u64)
            }
        }
    }
}

// =====================================================================
// Categories, images, search log
// =====================================================================

#[derive(Default)]
pub struct InMemoryCategories;

#[async_trait]
impl CategoryStore for InMemoryCategories {
    async fn list_groups(&self) -> Result<Vec<CategoryGroup>> {
        Ok(default_groups())
    }

    async fn seed_defaults(&self) -> Result<u64> {
        Ok(0)
    }
}

#[derive(Default)]
pub struct InMemoryImages {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryImages {
    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(name)
    }

    pub fn insert(&self, name: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), body.to_vec());
    }
}

#[async_trait]
impl ImageStore for InMemoryImages {
    async fn put(
        &self,
        name: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> std::result::Result<(), ImageStoreError> {
        self.objects.lock().unwrap().insert(name.to_string(), body);
        Ok(())
    }

    async fn get(&self, name: &str) -> std::result::Result<Vec<u8>, ImageStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ImageStoreError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> std::result::Result<(), ImageStoreError> {
        self.objects.lock().unwrap().remove(name);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySearchLog {
    entries: Mutex<Vec<SearchLogEntry>>,
}

impl InMemorySearchLog {
    pub fn entries(&self) -> Vec<SearchLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn ranked(&self, prefix: Option<&str>, size: u32) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for entry in self.entries.lock().unwrap().iter() {
            if prefix.map_or(true, |p| entry.log.contains(p)) {
                *counts.entry(entry.log.clone()).or_default() += 1;
            }
        }
        let mut terms: Vec<(String, usize)> = counts.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.into_iter().take(size as usize).map(|(t, _)| t).collect()
    }
}

#[async_trait]
impl SearchLog for InMemorySearchLog {
    async fn record(&self, entry: SearchLogEntry) -> std::result::Result<(), SearchLogError> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    async fn top_terms(&self, size: u32) -> std::result::Result<Vec<String>, SearchLogError> {
        Ok(self.ranked(None, size))
    }

    async fn suggest(
        &self,
        prefix: &str,
        size: u32,
    ) -> std::result::Result<Vec<String>, SearchLogError> {
        Ok(self.ranked(Some(prefix), size))
    }
}

// =====================================================================
// App wiring
// =====================================================================

pub struct TestMarket {
    pub market: Arc<InMemoryMarket>,
    pub images: Arc<InMemoryImages>,
    pub search_log: Arc<InMemorySearchLog>,
    pub state: AppState,
}

pub fn feed_config(page_size: u32) -> FeedConfig {
    FeedConfig {
        page_size,
        related_sample_size: 8,
        ranking_size: 10,
        autocomplete_size: 15,
    }
}

impl TestMarket {
    pub fn new(page_size: u32) -> Self {
        let market = InMemoryMarket::new();
        let images = Arc::new(InMemoryImages::default());
        let search_log = Arc::new(InMemorySearchLog::default());

        let state = AppState::new(
            Collaborators {
                posts: market.clone(),
                comments: market.clone(),
                categories: Arc::new(InMemoryCategories),
                images: images.clone(),
                search_log: search_log.clone(),
            },
            ProximityResolver::new(sample_graph()),
            feed_config(page_size),
            GeocodingClient::new(&GeocodingConfig {
                endpoint: "http://127.0.0.1:9/unused".to_string(),
                client_id: String::new(),
                client_secret: String::new(),
            }),
        );

        Self {
            market,
            images,
            search_log,
            state,
        }
    }

    /// `/api/v1` behind the JWT middleware, as mounted by the server.
    pub fn api(&self) -> impl FnOnce(&mut web::ServiceConfig) {
        let state = self.state.clone();
        move |cfg| {
            cfg.service(
                web::scope("/api/v1")
                    .wrap(JwtAuthMiddleware::new(SECRET))
                    .configure(move |c| state.configure(c)),
            );
        }
    }
}
