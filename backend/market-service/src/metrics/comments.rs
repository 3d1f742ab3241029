use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Applied comment deletions by plan (soft/hard/hard_with_parent).
    pub static ref COMMENT_DELETIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "market_comment_deletions_total",
        "Comment deletions segmented by the plan that was applied",
        &["plan"]
    )
    .expect("failed to register market_comment_deletions_total");
}
