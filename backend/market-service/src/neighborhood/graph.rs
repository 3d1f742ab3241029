use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::NeighborhoodError;

/// Adjacency-list graph of administrative areas (towns).
///
/// Nodes only carry their ordered neighbor list. Traversal bookkeeping lives
/// with the caller, so a single graph can be shared across request handlers
/// behind an `Arc` without any locking.
#[derive(Debug, Clone, Default)]
pub struct NeighborhoodGraph {
    nodes: HashMap<String, Vec<String>>,
}

/// One entry of the on-disk adjacency file.
///
/// The legacy export packs a traversal flag into the first slot of the
/// neighbor array (`[false, "A", "B"]`). The flag is meaningless at rest and
/// is discarded on load.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Packed(Vec<Value>),
    Record { neighbors: Vec<String> },
}

impl RawNode {
    fn into_neighbors(self, area: &str) -> Result<Vec<String>, NeighborhoodError> {
        match self {
            RawNode::Record { neighbors } => Ok(neighbors),
            RawNode::Packed(slots) => {
                let mut slots = slots.into_iter();
                match slots.next() {
                    Some(Value::Bool(_)) => {}
                    Some(other) => {
                        return Err(NeighborhoodError::Malformed(format!(
                            "area '{}' must start with a boolean slot, found {}",
                            area, other
                        )))
                    }
                    None => {
                        return Err(NeighborhoodError::Malformed(format!(
                            "area '{}' has an empty adjacency entry",
                            area
                        )))
                    }
                }

                slots
                    .map(|slot| match slot {
                        Value::String(name) => Ok(name),
                        other => Err(NeighborhoodError::Malformed(format!(
                            "area '{}' lists a non-string neighbor {}",
                            area, other
                        ))),
                    })
                    .collect()
            }
        }
    }
}

impl NeighborhoodGraph {
    /// Build a graph from `(area, neighbors)` pairs.
    ///
    /// Fails with [`NeighborhoodError::MissingNeighbor`] when a neighbor is
    /// referenced that has no node of its own.
    pub fn from_adjacency<I, S>(entries: I) -> Result<Self, NeighborhoodError>
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let nodes: HashMap<String, Vec<String>> = entries
            .into_iter()
            .map(|(area, neighbors)| {
                (
                    area.into(),
                    neighbors.into_iter().map(Into::into).collect(),
                )
            })
            .collect();

        let graph = Self { nodes };
        graph.check_integrity()?;
        Ok(graph)
    }

    /// Parse the JSON adjacency export (packed or record form).
    pub fn from_json_str(raw: &str) -> Result<Self, NeighborhoodError> {
        let parsed: HashMap<String, RawNode> = serde_json::from_str(raw)?;

        let mut entries = Vec::with_capacity(parsed.len());
        for (area, node) in parsed {
            let neighbors = node.into_neighbors(&area)?;
            entries.push((area, neighbors));
        }

        Self::from_adjacency(entries)
    }

    /// Load the adjacency export from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NeighborhoodError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let graph = Self::from_json_str(&raw)?;

        tracing::info!(
            path = %path.as_ref().display(),
            areas = graph.len(),
            "Loaded neighborhood graph"
        );

        Ok(graph)
    }

    fn check_integrity(&self) -> Result<(), NeighborhoodError> {
        for (area, neighbors) in &self.nodes {
            if let Some(missing) = neighbors.iter().find(|n| !self.nodes.contains_key(*n)) {
                return Err(NeighborhoodError::MissingNeighbor {
                    area: area.clone(),
                    neighbor: missing.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, area: &str) -> bool {
        self.nodes.contains_key(area)
    }

    /// Ordered neighbors of `area`, or `None` if the area is unknown.
    pub fn neighbors(&self, area: &str) -> Option<&[String]> {
        self.nodes.get(area).map(Vec::as_slice)
    }

    /// The graph-owned key for `area`, so traversals can borrow from the graph
    /// rather than from caller input.
    pub(crate) fn key(&self, area: &str) -> Option<&str> {
        self.nodes.get_key_value(area).map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
