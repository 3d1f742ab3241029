use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use super::{NeighborhoodError, NeighborhoodGraph};

/// Areas reachable from an origin, in discovery order.
///
/// Each area appears once. The ordered list is what the `/towns` endpoint
/// returns and what the feed filter binds as `town = ANY($1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaSet {
    ordered: Vec<String>,
}

impl AreaSet {
    pub fn contains(&self, area: &str) -> bool {
        self.ordered.iter().any(|a| a == area)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Breadth-first search bounded by `radius` hops.
///
/// Nodes at exactly `radius` hops are included but not expanded. The visited
/// set is local to this call.
pub fn resolve(
    graph: &NeighborhoodGraph,
    origin: &str,
    radius: u32,
) -> Result<AreaSet, NeighborhoodError> {
    let origin = graph
        .key(origin)
        .ok_or_else(|| NeighborhoodError::UnknownArea(origin.to_string()))?;

    // Keys borrow from the graph; nothing is copied until the result is built.
    let mut visited: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<&str> = Vec::new();
    let mut queue: VecDeque<(&str, u32)> = VecDeque::new();

    visited.insert(origin);
    ordered.push(origin);
    queue.push_back((origin, 0));

    while let Some((area, hops)) = queue.pop_front() {
        if hops >= radius {
            continue;
        }

        for next in graph.neighbors(area).unwrap_or_default() {
            let next = graph
                .key(next)
                .ok_or_else(|| NeighborhoodError::MissingNeighbor {
                    area: area.to_string(),
                    neighbor: next.clone(),
                })?;

            if visited.insert(next) {
                ordered.push(next);
                queue.push_back((next, hops + 1));
            }
        }
    }

    Ok(AreaSet {
        ordered: ordered.into_iter().map(str::to_string).collect(),
    })
}

/// Shared handle used by request handlers.
#[derive(Debug, Clone)]
pub struct ProximityResolver {
    graph: Arc<NeighborhoodGraph>,
}

impl ProximityResolver {
    pub fn new(graph: Arc<NeighborhoodGraph>) -> Self {
        Self { graph }
    }

    pub fn resolve(&self, origin: &str, radius: u32) -> Result<AreaSet, NeighborhoodError> {
        let areas = resolve(&self.graph, origin, radius)?;
        crate::metrics::neighborhood::PROXIMITY_AREA_COUNT.observe(areas.len() as f64);
        tracing::debug!(origin, radius, areas = areas.len(), "Resolved nearby areas");
        Ok(areas)
    }
}
