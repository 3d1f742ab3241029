/// Data models for market-service
///
/// This module defines structures for:
/// - Post: classified listings with lifecycle state, images and engagement
/// - Comment: two-level comment threads embedded in a post
/// - Category: listing categories grouped by board type
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::services::comment_thread::CommentNode;

// ============================================================================
// Post lifecycle
// ============================================================================

/// Sale state of a post, encoded on the wire and in storage as -1/0/1.
///
/// Any state may follow any other; only the encoding is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum PostState {
    Selling,
    Reserved,
    Sold,
}

impl PostState {
    pub fn code(self) -> i16 {
        match self {
            PostState::Selling => -1,
            PostState::Reserved => 0,
            PostState::Sold => 1,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            -1 => Some(PostState::Selling),
            0 => Some(PostState::Reserved),
            1 => Some(PostState::Sold),
            _ => None,
        }
    }

    /// States that are still on the market.
    pub fn available() -> [PostState; 2] {
        [PostState::Selling, PostState::Reserved]
    }
}

/// State code outside -1/0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid post state {0}: expected -1 (selling), 0 (reserved) or 1 (sold)")]
pub struct InvalidPostState(pub i16);

impl TryFrom<i16> for PostState {
    type Error = InvalidPostState;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        PostState::from_code(code).ok_or(InvalidPostState(code))
    }
}

impl From<PostState> for i16 {
    fn from(state: PostState) -> Self {
        state.code()
    }
}

impl fmt::Display for PostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PostState::Selling => "selling",
            PostState::Reserved => "reserved",
            PostState::Sold => "sold",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Posts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub writer_id: Uuid,
    pub category_id: Uuid,
    pub price: i64,
    #[sqlx(try_from = "i16")]
    pub state: PostState,
    pub buyer_id: Option<Uuid>,
    /// Object names in upload order.
    pub images: Vec<String>,
    pub likes: Vec<Uuid>,
    pub town: String,
    pub town_range: Option<i32>,
    pub is_suggestable: bool,
    pub is_talkable: bool,
    pub telephone: Option<String>,
    pub views: i64,
    pub report_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Feed projection of a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub town: String,
    pub price: i64,
    #[sqlx(try_from = "i16")]
    pub state: PostState,
    pub images: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Post with its comments reshaped into threads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<CommentNode>,
}

/// Fields supplied when a post is created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub price: i64,
    pub state: PostState,
    pub images: Vec<String>,
    pub town: String,
    pub town_range: Option<i32>,
    pub is_suggestable: bool,
    pub is_talkable: bool,
    pub telephone: Option<String>,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<i64>,
    pub state: Option<PostState>,
    pub images: Option<Vec<String>>,
    pub town: Option<String>,
    pub town_range: Option<i32>,
    pub is_suggestable: Option<bool>,
    pub is_talkable: Option<bool>,
    pub telephone: Option<String>,
}

/// Post-listing filter built from a feed request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub towns: Vec<String>,
    /// Empty means every category.
    pub categories: Vec<Uuid>,
    /// Whitespace-separated search words; a post matches if any word occurs
    /// in its title or description.
    pub keywords: Vec<String>,
}

/// Result of a report request.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Reported(Post),
    AlreadyReported,
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub writer_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub description: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub writer_id: Uuid,
    pub parent_comment_id: Option<Uuid>,
    pub description: String,
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// Categories of one board ("중고거래", "동네홍보").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    #[serde(rename = "type")]
    pub group_type: String,
    pub categories: Vec<Category>,
}
