/// Skip/limit window for infinite-scroll feeds.
///
/// The feed is ordered newest first, so posts created after a scroll session
/// started push older posts further down. The client echoes back the match
/// count it saw on its first page (`baseline_count`); the difference to the
/// current count is exactly the number of rows inserted at the head since
/// then, and is added to the skip so no post is repeated or missed.
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page size must be greater than zero")]
    ZeroPageSize,
    #[error("scroll index {0} is too large")]
    ScrollOverflow(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedWindow {
    pub skip: u64,
    pub limit: u32,
}

impl FeedWindow {
    /// Compute the window for one page request.
    ///
    /// A `baseline_count` of 0 marks the first load of a session and adds no
    /// compensation. Removals since the baseline clamp the compensation to 0.
    pub fn compute(
        page_size: u32,
        scroll_index: u64,
        baseline_count: u64,
        current_count: u64,
    ) -> Result<Self, PaginationError> {
        if page_size == 0 {
            return Err(PaginationError::ZeroPageSize);
        }

        let compensation = if baseline_count == 0 {
            0
        } else {
            current_count.saturating_sub(baseline_count)
        };

        let skip = scroll_index
            .checked_mul(u64::from(page_size))
            .and_then(|offset| offset.checked_add(compensation))
            .ok_or(PaginationError::ScrollOverflow(scroll_index))?;

        Ok(Self {
            skip,
            limit: page_size,
        })
    }

    /// Skip as a SQL `OFFSET` bind value.
    pub fn offset(&self) -> i64 {
        i64::try_from(self.skip).unwrap_or(i64::MAX)
    }
}
