use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

lazy_static! {
    /// Duration of feed listings by board (used, promotion, all).
    pub static ref FEED_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "market_feed_request_duration_seconds",
        "Feed request duration segmented by board",
        &["board"]
    )
    .expect("failed to register market_feed_request_duration_seconds");

    /// Feed requests by outcome (success/error).
    pub static ref FEED_REQUEST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "market_feed_request_total",
        "Total feed requests segmented by outcome",
        &["result"]
    )
    .expect("failed to register market_feed_request_total");

    /// Search-log writes by outcome (success/error).
    pub static ref SEARCH_LOG_WRITE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "market_search_log_write_total",
        "Search log write attempts segmented by outcome",
        &["result"]
    )
    .expect("failed to register market_search_log_write_total");
}
