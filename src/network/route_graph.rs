use std::collections::{BTreeMap, BTreeSet};

use crate::error::ZikaError;
use crate::network::{FlowTable, NetworkModel};

/// Undirected airport connectivity, keyed by airport id.
///
/// The graph is bookkeeping for sweeps and for external map rendering. Transmission itself uses
/// the directed `FlowTable`.
#[derive(Clone, Debug, Default)]
pub struct RouteGraph {
    adjacency: BTreeMap<u32, BTreeSet<u32>>,
    edge_count: usize,
    duplicate_count: usize,
}

impl RouteGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from every route of `flows`, translating codes to ids through `network`.
    ///
    /// # Errors
    ///
    /// Returns `ZikaError::LookupError` if a route endpoint is not an airport of `network`.
    pub fn from_flow_table(network: &NetworkModel, flows: &FlowTable) -> Result<Self, ZikaError> {
        let mut graph = RouteGraph::new();
        for (origin, destination, _) in flows.iter() {
            let from = network
                .airport(origin)
                .ok_or_else(|| ZikaError::lookup("airport network", origin))?;
            let to = network
                .airport(destination)
                .ok_or_else(|| ZikaError::lookup("airport network", destination))?;
            graph.add_route(from.id, to.id);
        }
        Ok(graph)
    }

    /// Connects two airports. Returns false, and counts a duplicate, if they were already
    /// connected in either direction. Self-loops are ignored.
    pub fn add_route(&mut self, a: u32, b: u32) -> bool {
        if a == b {
            return false;
        }
        if self.has_route(a, b) {
            self.duplicate_count += 1;
            return false;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        self.edge_count += 1;
        true
    }

    #[must_use]
    pub fn has_route(&self, a: u32, b: u32) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|neighbors| neighbors.contains(&b))
    }

    pub fn neighbors(&self, id: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    #[must_use]
    pub fn degree(&self, id: u32) -> usize {
        self.adjacency.get(&id).map_or(0, BTreeSet::len)
    }

    /// Iterates over each undirected edge once, as `(smaller id, larger id)`.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.adjacency.iter().flat_map(|(&a, neighbors)| {
            neighbors
                .iter()
                .filter(move |&&b| a < b)
                .map(move |&b| (a, b))
        })
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.duplicate_count
    }
}
