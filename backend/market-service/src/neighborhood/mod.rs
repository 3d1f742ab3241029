/// Neighborhood proximity
///
/// - `graph`: adjacency list of administrative areas, loaded once at startup
/// - `resolver`: hop-bounded breadth-first search producing the area filter
///   used by feed queries
pub mod graph;
pub mod resolver;

pub use graph::NeighborhoodGraph;
pub use resolver::{resolve, AreaSet, ProximityResolver};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NeighborhoodError {
    #[error("unknown area: {0}")]
    UnknownArea(String),
    #[error("area '{area}' lists neighbor '{neighbor}' which is not in the graph")]
    MissingNeighbor { area: String, neighbor: String },
    #[error("malformed neighborhood data: {0}")]
    Malformed(String),
    #[error("failed to read neighborhood data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse neighborhood data: {0}")]
    Json(#[from] serde_json::Error),
}
