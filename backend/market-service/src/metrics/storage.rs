use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Image store calls by operation (put/delete) and result (ok/error).
    pub static ref IMAGE_STORE_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "market_image_store_operations_total",
        "Image store operations segmented by operation and outcome",
        &["op", "result"]
    )
    .expect("failed to register market_image_store_operations_total");
}
