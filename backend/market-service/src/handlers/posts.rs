/// Post handlers - HTTP endpoints for the feed and the post lifecycle
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{NewPost, PostPatch, PostState, ReportOutcome};
use crate::services::{FeedRequest, PostService};

use super::towns::parse_town_range;

/// Query string of the feed endpoint.
///
/// `townRange` is required and must be non-negative. The pagination inputs
/// are signed so that negative values from older clients can be clamped to
/// zero instead of failing deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQueryParams {
    pub town: String,
    pub town_range: i64,
    /// Comma-separated category ids; empty means every category.
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub scroll: i64,
    #[serde(default)]
    pub max_num: i64,
    pub query: Option<String>,
}

fn clamp_non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

pub(crate) fn parse_categories(raw: &str) -> Result<Vec<Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::BadRequest(format!("invalid category id '{}'", s)))
        })
        .collect()
}

impl FeedQueryParams {
    pub fn into_request(self) -> Result<FeedRequest> {
        let town_range = parse_town_range(self.town_range)?;
        let categories = parse_categories(&self.category)?;

        Ok(FeedRequest {
            town: self.town,
            town_range,
            categories,
            scroll: clamp_non_negative(self.scroll),
            baseline_count: clamp_non_negative(self.max_num),
            query: self.query,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub category_id: Uuid,
    #[validate(range(min = 0))]
    pub price: i64,
    pub state: PostState,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub images: Vec<String>,
    #[validate(length(min = 1, max = 100))]
    pub town: String,
    #[validate(range(min = 0))]
    pub town_range: Option<i32>,
    #[serde(default)]
    pub is_suggestable: bool,
    #[serde(default)]
    pub is_talkable: bool,
    #[validate(length(max = 20))]
    pub telephone: Option<String>,
}

impl From<CreatePostRequest> for NewPost {
    fn from(req: CreatePostRequest) -> Self {
        NewPost {
            title: req.title,
            description: req.description,
            category_id: req.category_id,
            price: req.price,
            state: req.state,
            images: req.images,
            town: req.town,
            town_range: req.town_range,
            is_suggestable: req.is_suggestable,
            is_talkable: req.is_talkable,
            telephone: req.telephone,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    pub state: Option<PostState>,
    #[validate(length(max = 10))]
    pub images: Option<Vec<String>>,
    #[validate(length(min = 1, max = 100))]
    pub town: Option<String>,
    #[validate(range(min = 0))]
    pub town_range: Option<i32>,
    pub is_suggestable: Option<bool>,
    pub is_talkable: Option<bool>,
    #[validate(length(max = 20))]
    pub telephone: Option<String>,
}

impl From<UpdatePostRequest> for PostPatch {
    fn from(req: UpdatePostRequest) -> Self {
        PostPatch {
            title: req.title,
            description: req.description,
            category_id: req.category_id,
            price: req.price,
            state: req.state,
            images: req.images,
            town: req.town,
            town_range: req.town_range,
            is_suggestable: req.is_suggestable,
            is_talkable: req.is_talkable,
            telephone: req.telephone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStateRequest {
    pub state: PostState,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TermsResponse {
    pub result: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LikesResponse {
    pub likes: Vec<Uuid>,
}

/// List one page of the neighborhood feed
pub async fn list_feed(
    service: web::Data<PostService>,
    query: web::Query<FeedQueryParams>,
) -> Result<HttpResponse> {
    let request = query.into_inner().into_request()?;
    let page = service.list_feed(request).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Get a post with its comment threads
pub async fn get_post(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let detail = service.get_post_detail(*post_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Create a new post
pub async fn create_post(
    service: web::Data<PostService>,
    user_id: UserId,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let post = service.create_post(user_id.0, req.into_inner().into()).await?;
    Ok(HttpResponse::Created().json(post))
}

/// Update a post (owner only)
pub async fn update_post(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let post = service
        .update_post(user_id.0, *post_id, req.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Delete a post and release its images (owner only)
pub async fn delete_post(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    service.delete_post(user_id.0, *post_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "success" }))
}

/// Change the sale state (owner only)
pub async fn update_post_state(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
    req: web::Json<UpdateStateRequest>,
) -> Result<HttpResponse> {
    service.set_state(user_id.0, *post_id, req.state).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "success" }))
}

/// Register the buyer of a post (owner only)
pub async fn set_buyer(
    service: web::Data<PostService>,
    user_id: UserId,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (post_id, buyer_id) = path.into_inner();
    service.set_buyer(user_id.0, post_id, buyer_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse { message: "success" }))
}

/// Like a post, or undo an earlier like
pub async fn toggle_like(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let likes = service.toggle_like(user_id.0, *post_id).await?;
    Ok(HttpResponse::Ok().json(LikesResponse { likes }))
}

/// Report a post once per user
pub async fn report_post(
    service: web::Data<PostService>,
    user_id: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match service.report(user_id.0, *post_id).await? {
        ReportOutcome::Reported(post) => Ok(HttpResponse::Ok().json(post)),
        ReportOutcome::AlreadyReported => Ok(HttpResponse::Ok().json(MessageResponse {
            message: "already reported!",
        })),
    }
}

/// Random available posts in the same category
pub async fn related_posts(
    service: web::Data<PostService>,
    category_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let posts = service.related_posts(*category_id).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// Popular search terms
pub async fn ranking(service: web::Data<PostService>) -> Result<HttpResponse> {
    let result = service.ranking().await?;
    Ok(HttpResponse::Ok().json(TermsResponse { result }))
}

/// Popular search terms matching a prefix
pub async fn autocomplete(
    service: web::Data<PostService>,
    query: web::Query<AutocompleteQuery>,
) -> Result<HttpResponse> {
    let result = service.autocomplete(&query.query).await?;
    Ok(HttpResponse::Ok().json(TermsResponse { result }))
}
