/// Two-level comment threads
///
/// Comments are stored flat per post. This module reshapes them into
/// top-level comments with their replies, and decides how a deletion must be
/// applied so that soft-deleted placeholders only survive while they still
/// have replies.
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Comment;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadError {
    #[error("comment {0} not found in post")]
    CommentNotFound(Uuid),
}

/// A top-level comment with its direct replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<Comment>,
}

/// Reshape a flat comment list into threads.
///
/// Roots keep their input order and so do replies under each root. A comment
/// whose parent is not a root of this list (a reply to a reply, or a parent
/// that no longer exists) is surfaced as a root of its own at its input
/// position instead of being dropped.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let roots: HashSet<Uuid> = comments
        .iter()
        .filter(|c| c.parent_comment_id.is_none())
        .map(|c| c.id)
        .collect();

    let mut replies: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for comment in comments {
        if let Some(parent_id) = comment.parent_comment_id {
            if roots.contains(&parent_id) {
                replies.entry(parent_id).or_default().push(comment.clone());
            }
        }
    }

    comments
        .iter()
        .filter(|c| match c.parent_comment_id {
            None => true,
            Some(parent_id) => !roots.contains(&parent_id),
        })
        .map(|c| {
            if let Some(parent_id) = c.parent_comment_id {
                tracing::warn!(
                    comment_id = %c.id,
                    %parent_id,
                    "Comment parent is not a top-level comment; surfacing as root"
                );
            }
            CommentNode {
                comment: c.clone(),
                children: replies.remove(&c.id).unwrap_or_default(),
            }
        })
        .collect()
}

/// Mutation required to delete one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPlan {
    /// The comment still has replies: mark it deleted, keep the row.
    SoftDelete { comment_id: Uuid },
    /// Remove the comment.
    HardDelete { comment_id: Uuid },
    /// Remove the comment and its soft-deleted parent, whose last reply this was.
    HardDeleteWithParent { comment_id: Uuid, parent_id: Uuid },
}

impl DeletionPlan {
    pub fn comment_id(&self) -> Uuid {
        match *self {
            DeletionPlan::SoftDelete { comment_id }
            | DeletionPlan::HardDelete { comment_id }
            | DeletionPlan::HardDeleteWithParent { comment_id, .. } => comment_id,
        }
    }

    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            DeletionPlan::SoftDelete { .. } => "soft",
            DeletionPlan::HardDelete { .. } => "hard",
            DeletionPlan::HardDeleteWithParent { .. } => "hard_with_parent",
        }
    }
}

/// Decide how to delete `target` given a snapshot of the post's comments.
pub fn plan_deletion(comments: &[Comment], target: Uuid) -> Result<DeletionPlan, ThreadError> {
    let comment = comments
        .iter()
        .find(|c| c.id == target)
        .ok_or(ThreadError::CommentNotFound(target))?;

    let has_replies = comments
        .iter()
        .any(|c| c.parent_comment_id == Some(target));
    if has_replies {
        return Ok(DeletionPlan::SoftDelete { comment_id: target });
    }

    let Some(parent_id) = comment.parent_comment_id else {
        return Ok(DeletionPlan::HardDelete { comment_id: target });
    };

    let parent_deleted = comments
        .iter()
        .find(|c| c.id == parent_id)
        .map(|p| p.is_deleted)
        .unwrap_or(false);
    let has_siblings = comments
        .iter()
        .any(|c| c.id != target && c.parent_comment_id == Some(parent_id));

    if parent_deleted && !has_siblings {
        Ok(DeletionPlan::HardDeleteWithParent {
            comment_id: target,
            parent_id,
        })
    } else {
        Ok(DeletionPlan::HardDelete { comment_id: target })
    }
}
