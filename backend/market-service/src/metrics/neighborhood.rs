use lazy_static::lazy_static;
use prometheus::{register_histogram, Histogram};

lazy_static! {
    /// Size of the area set produced by each proximity lookup.
    pub static ref PROXIMITY_AREA_COUNT: Histogram = register_histogram!(
        "market_proximity_area_count",
        "Number of areas reachable within the requested radius",
        vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]
    )
    .expect("failed to register market_proximity_area_count");
}
