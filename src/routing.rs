use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::graph::dijkstra::{HeapElement, unpack_path};
use crate::graph::path::Path;
use crate::graph::{entering_edges, exiting_edges};
use crate::{DirectedEdge, Frc, Length, RoadNetwork, Score, VehicleProfile};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortestPathConfig {
    /// Maximum number of edges settled before giving up the search.
    pub max_settled: usize,
    /// Maximum length of the path before reaching the last edge.
    pub max_length: Length,
    /// Least important road class that can be traversed between the origin and the destination.
    pub lowest_frc: Frc,
}

impl Default for ShortestPathConfig {
    fn default() -> Self {
        Self {
            max_settled: 10_000,
            max_length: Length::MAX,
            lowest_frc: Frc::Frc7,
        }
    }
}

/// Path found between two candidates (if any) and the score of its existence.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePath<EdgeId> {
    pub path: Option<Path<EdgeId>>,
    pub score: Score,
}

impl<EdgeId> CandidatePath<EdgeId> {
    pub const ROUTE_SCORE: &str = "route";

    pub fn found(path: Path<EdgeId>) -> Self {
        Self {
            path: Some(path),
            score: Score::new(Self::ROUTE_SCORE, "route existence", 1.0, 1.0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            path: None,
            score: Score::new(Self::ROUTE_SCORE, "route existence", 0.0, 1.0),
        }
    }
}

/// Direction in which edges are expanded from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// Follows the exiting edges, the origin is the first edge of every path.
    Forward,
    /// Follows the entering edges, the origin is the last edge of every path.
    Backward,
}

/// Edge based Dijkstra search. States are directed edges, so that paths are forced to start (or
/// end) with the origin edge, and the cumulative weight of a state includes its own edge.
///
/// Edges that cannot be traversed by the profile in the expanded direction are never relaxed,
/// neither are immediate U-turns on the same edge. The search stops when the number of settled
/// edges reaches the configured budget.
pub struct Search<'a, G: RoadNetwork, P> {
    config: ShortestPathConfig,
    graph: &'a G,
    profile: &'a P,
    direction: SearchDirection,
    /// Edge that is never filtered out by road class.
    target: Option<DirectedEdge<G::EdgeId>>,
    weights: FxHashMap<DirectedEdge<G::EdgeId>, OrderedFloat<f64>>,
    previous: FxHashMap<DirectedEdge<G::EdgeId>, DirectedEdge<G::EdgeId>>,
    settled: FxHashMap<DirectedEdge<G::EdgeId>, Length>,
    frontier: BinaryHeap<HeapElement<G::EdgeId>>,
    excluded: FxHashSet<DirectedEdge<G::EdgeId>>,
}

impl<'a, G, P> Search<'a, G, P>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    pub fn new(
        config: &ShortestPathConfig,
        graph: &'a G,
        profile: &'a P,
        origin: DirectedEdge<G::EdgeId>,
        direction: SearchDirection,
    ) -> Result<Self, G::Error> {
        let tags = graph.edge_tags(origin.id)?;
        let length = graph.edge_length(origin.id)?;
        let weight = OrderedFloat(profile.weight(length, tags).max(0.0));

        Ok(Self {
            config: *config,
            graph,
            profile,
            direction,
            target: None,
            weights: FxHashMap::from_iter([(origin, weight)]),
            previous: FxHashMap::default(),
            settled: FxHashMap::default(),
            frontier: BinaryHeap::from([HeapElement {
                weight,
                length,
                edge: origin,
            }]),
            excluded: FxHashSet::default(),
        })
    }

    /// Allows the edge to be reached even if its road class is below the configured bound.
    pub fn with_target(mut self, target: DirectedEdge<G::EdgeId>) -> Self {
        self.target = Some(target);
        self
    }

    /// Edges that will never be relaxed.
    pub fn exclude(&mut self, edge: DirectedEdge<G::EdgeId>) {
        self.excluded.insert(edge);
    }

    /// Settles the next closest edge.
    /// Returns None once the frontier is exhausted or the settle budget is reached.
    pub fn next_settled(&mut self) -> Result<Option<HeapElement<G::EdgeId>>, G::Error> {
        while let Some(element) = self.frontier.pop() {
            if self.settled.contains_key(&element.edge) {
                continue;
            }

            if self.settled.len() >= self.config.max_settled {
                debug!("Settle budget of {} edges reached", self.config.max_settled);
                self.frontier.clear();
                return Ok(None);
            }

            self.settled.insert(element.edge, element.length);
            self.relax(element)?;
            return Ok(Some(element));
        }

        Ok(None)
    }

    fn relax(&mut self, element: HeapElement<G::EdgeId>) -> Result<(), G::Error> {
        let HeapElement {
            weight,
            length,
            edge,
        } = element;

        if length > self.config.max_length {
            trace!("Not expanding {edge:?}: {length} exceeds max length");
            return Ok(());
        }

        let neighbours = match self.direction {
            SearchDirection::Forward => {
                exiting_edges(self.graph, self.profile, edge.end_vertex(self.graph)?)?
            }
            SearchDirection::Backward => {
                entering_edges(self.graph, self.profile, edge.start_vertex(self.graph)?)?
            }
        };

        for next in neighbours {
            if next.is_opposite(&edge)
                || self.excluded.contains(&next)
                || self.settled.contains_key(&next)
            {
                continue;
            }

            let tags = self.graph.edge_tags(next.id)?;

            if Some(next) != self.target
                && self
                    .profile
                    .frc(tags)
                    .is_some_and(|frc| frc > self.config.lowest_frc)
            {
                trace!("Not relaxing {next:?}: road class below {:?}", self.config.lowest_frc);
                continue;
            }

            let next_length = self.graph.edge_length(next.id)?;
            let next_weight = weight + self.profile.weight(next_length, tags).max(0.0);

            let is_better = self
                .weights
                .get(&next)
                .is_none_or(|&known| next_weight < known);

            if is_better {
                trace!("Relaxing {next:?} with weight {next_weight}");
                self.weights.insert(next, next_weight);
                self.previous.insert(next, edge);
                self.frontier.push(HeapElement {
                    weight: next_weight,
                    length: length + next_length,
                    edge: next,
                });
            }
        }

        Ok(())
    }

    /// Runs the search until the destination is settled.
    pub fn settle(
        &mut self,
        destination: DirectedEdge<G::EdgeId>,
    ) -> Result<Option<Path<G::EdgeId>>, G::Error> {
        if let Some(&length) = self.settled.get(&destination) {
            return Ok(Some(self.path_to(destination, length)));
        }

        while let Some(element) = self.next_settled()? {
            if element.edge == destination {
                return Ok(Some(self.path_to(destination, element.length)));
            }
        }

        Ok(None)
    }

    /// Returns true if the edge has been settled.
    pub fn is_settled(&self, edge: &DirectedEdge<G::EdgeId>) -> bool {
        self.settled.contains_key(edge)
    }

    /// Edge settled right before the given one on its shortest path from the origin.
    pub fn previous(&self, edge: &DirectedEdge<G::EdgeId>) -> Option<DirectedEdge<G::EdgeId>> {
        self.previous.get(edge).copied()
    }

    /// Shortest path between the origin and a settled edge, in the direction of travel.
    pub fn path_to(&self, edge: DirectedEdge<G::EdgeId>, length: Length) -> Path<G::EdgeId> {
        let mut edges = unpack_path(&self.previous, edge);

        if self.direction == SearchDirection::Backward {
            edges.reverse();
        }

        Path { length, edges }
    }
}

/// Computes the shortest path that starts with the source edge and ends with the target edge.
/// Both edges are part of the returned path.
///
/// Returns None if the target cannot be reached, or if it cannot be reached within the settle
/// budget of the configuration: neither is an error.
pub fn shortest_path<G, P>(
    config: &ShortestPathConfig,
    graph: &G,
    profile: &P,
    source: DirectedEdge<G::EdgeId>,
    target: DirectedEdge<G::EdgeId>,
) -> Result<Option<Path<G::EdgeId>>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    debug!("Computing shortest path {source:?} -> {target:?} with {config:?}");

    if !source.is_traversable(graph, profile)? || !target.is_traversable(graph, profile)? {
        debug!("Source or target edge cannot be traversed");
        return Ok(None);
    }

    Search::new(config, graph, profile, source, SearchDirection::Forward)?
        .with_target(target)
        .settle(target)
}

/// Computes the shortest path between two candidate edges and rates its existence.
pub fn candidate_path<G, P>(
    config: &ShortestPathConfig,
    graph: &G,
    profile: &P,
    source: DirectedEdge<G::EdgeId>,
    target: DirectedEdge<G::EdgeId>,
) -> Result<CandidatePath<G::EdgeId>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let candidate = match shortest_path(config, graph, profile, source, target)? {
        Some(path) => CandidatePath::found(path),
        None => CandidatePath::not_found(),
    };

    Ok(candidate)
}
