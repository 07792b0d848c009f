use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::decoder::candidates::CandidateEdges;
use crate::decoder::route::{CandidatePair, CandidateRoute, CandidateRoutes, distance_deviation};
use crate::error::Component;
use crate::graph::path::{Path, is_path_connected, path_length};
use crate::routing::{CandidatePath, candidate_path};
use crate::{
    DecodeError, DecoderConfig, Length, RoadNetwork, Score, ShortestPathConfig, VehicleProfile,
};

/// Route accepted for a pair of consecutive LRPs.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute<VertexId, EdgeId> {
    pub route: CandidateRoute<VertexId, EdgeId>,
    /// Replaces the previous route, so that it ends where the accepted route starts.
    pub previous: Option<CandidateRoute<VertexId, EdgeId>>,
}

/// The decoder needs to compute a shortest-path between each pair of subsequent location reference
/// points. For each pair of location reference points suitable candidate edges must be chosen. The
/// candidate edge of the first LRP of this pair acts as start of the shortest-path calculation.
/// The candidate edge of the second location reference point of this pair is the end of the
/// shortest-path calculation. If the chosen edges are equal no shortest-path calculation needs to
/// be started.
///
/// If a different pair of candidates is tried it might happen that the start edge needs to be
/// changed. In such a case this also affects the end edge of the previous shortest-path and this
/// path also needs to be re-calculated. The number of candidate pairs tried is limited by the
/// number of retries of the configuration.
///
/// The length of each path is rated against the distance to next point of the first LRP of the
/// pair, the route with the best combined score is accepted.
pub fn resolve_routes<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    candidates: &[CandidateEdges<G::VertexId, G::EdgeId>],
) -> Result<CandidateRoutes<G::VertexId, G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    debug!("Resolving routes for {} candidates", candidates.len());

    let mut routes: Vec<CandidateRoute<_, _>> = Vec::with_capacity(candidates.len() - 1);
    let max_attempts = config.max_number_retries.saturating_add(1);

    for window in candidates.windows(2) {
        let [candidates_lrp1, candidates_lrp2] = [&window[0], &window[1]];
        let pairs = candidate_pairs(candidates_lrp1, candidates_lrp2);

        let previous = routes.last();
        let Some(resolved) = resolve_route(config, graph, profile, pairs, previous, max_attempts)?
        else {
            return Err(DecodeError::RouteNotFound((
                candidates_lrp1.lrp,
                candidates_lrp2.lrp,
            )));
        };

        if let Some(previous) = resolved.previous
            && let Some(last_route) = routes.last_mut()
        {
            *last_route = previous;
        }

        routes.push(resolved.route);
    }

    let routes = CandidateRoutes::from(routes);
    debug_assert!(
        routes
            .iter()
            .all(|route| is_path_connected(graph, &route.path.edges).unwrap_or(true))
    );

    Ok(routes)
}

/// Cross product of the candidates of two consecutive LRPs, best pair first.
pub fn candidate_pairs<VertexId, EdgeId>(
    candidates_lrp1: &CandidateEdges<VertexId, EdgeId>,
    candidates_lrp2: &CandidateEdges<VertexId, EdgeId>,
) -> Vec<CandidatePair<VertexId, EdgeId>>
where
    VertexId: Copy + PartialEq,
    EdgeId: Copy + PartialEq,
{
    let mut pairs = Vec::with_capacity(
        candidates_lrp1.candidates.len() * candidates_lrp2.candidates.len(),
    );

    for source in &candidates_lrp1.candidates {
        for target in &candidates_lrp2.candidates {
            pairs.push(CandidatePair {
                lrp1: candidates_lrp1.lrp,
                lrp2: candidates_lrp2.lrp,
                source: source.clone(),
                target: target.clone(),
            });
        }
    }

    // stable sort keeps the candidates order for pairs with the same score
    pairs.sort_by_cached_key(|pair| Reverse(pair.score().rank()));
    pairs
}

/// Walks the pairs (best first) and returns the route with the best score.
///
/// The walk stops at the first perfect route, when a pair cannot score higher than the best route
/// found so far, or after `max_attempts` pairs.
pub fn resolve_route<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    pairs: impl IntoIterator<Item = CandidatePair<G::VertexId, G::EdgeId>>,
    previous: Option<&CandidateRoute<G::VertexId, G::EdgeId>>,
    max_attempts: usize,
) -> Result<Option<ResolvedRoute<G::VertexId, G::EdgeId>>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let mut best: Option<ResolvedRoute<_, _>> = None;

    for (attempt, pair) in pairs.into_iter().enumerate() {
        if attempt >= max_attempts {
            debug!("Maximum number of attempts reached");
            break;
        }

        if let Some(best) = &best
            && pair.score().rank() <= best.route.score.rank()
        {
            trace!("No better route can be found");
            break;
        }

        let Some(route) = resolve_candidate_route(config, graph, profile, pair)? else {
            continue;
        };

        // if the previous route ends on an edge that is not the start of this new route
        // then the previous route needs to be re-computed
        let previous = match previous {
            Some(previous) if previous.target_edge() != route.source_edge() => {
                let pair = CandidatePair {
                    target: route.pair.source.clone(),
                    ..previous.pair.clone()
                };

                match resolve_candidate_route(config, graph, profile, pair)? {
                    Some(alternative) => Some(alternative),
                    None => {
                        debug!("Previous route cannot be connected to {route:?}");
                        continue;
                    }
                }
            }
            _ => None,
        };

        let is_perfect = route.score.is_perfect();

        if best
            .as_ref()
            .is_none_or(|best| route.score.rank() > best.route.score.rank())
        {
            debug!("Accepted route with score {}", route.score.ratio());
            best = Some(ResolvedRoute { route, previous });
        }

        if is_perfect {
            break;
        }
    }

    Ok(best)
}

/// Computes the shortest path between the candidates and rates it.
/// Returns None if there is no path between the candidates.
pub fn resolve_candidate_route<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    pair: CandidatePair<G::VertexId, G::EdgeId>,
) -> Result<Option<CandidateRoute<G::VertexId, G::EdgeId>>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let source = pair.source.edge;
    let target = pair.target.edge;

    let candidate = if source == target {
        let edges = if pair.lrp2.is_last() {
            vec![source]
        } else {
            vec![]
        };

        let length = path_length(graph, &edges)
            .map_err(DecodeError::graph_at_lrp(Component::Routing, pair.lrp1))?;
        CandidatePath::found(Path { length, edges })
    } else {
        let shortest_path = ShortestPathConfig {
            max_length: max_route_length(config, &pair),
            lowest_frc: if config.enforce_lfrcnp {
                pair.lrp1.lfrcnp().with_variance()
            } else {
                config.shortest_path.lowest_frc
            },
            ..config.shortest_path
        };

        let mut candidate = candidate_path(&shortest_path, graph, profile, source, target)
            .map_err(DecodeError::graph_at_lrp(Component::Routing, pair.lrp1))?;

        // the target edge starts the next route
        if !pair.lrp2.is_last()
            && let Some(path) = &mut candidate.path
            && let Some(last_edge) = path.edges.pop()
        {
            path.length -= graph
                .edge_length(last_edge.id)
                .map_err(DecodeError::graph_at_lrp(Component::Routing, pair.lrp1))?;
        }

        candidate
    };

    let CandidatePath {
        path: Some(path),
        score: route_score,
    } = candidate
    else {
        trace!("No route between {source:?} and {target:?}");
        return Ok(None);
    };

    let deviation = distance_deviation(path.length, pair.lrp1.dnp());
    let score = Score::product(
        "attempt",
        "candidates, route and length match",
        pair.score(),
        Score::product("path", "route and length match", route_score, deviation),
    );

    trace!("Route {:?} with score {}", path.edges, score.ratio());
    Ok(Some(CandidateRoute { path, pair, score }))
}

fn max_route_length<VertexId, EdgeId>(
    config: &DecoderConfig,
    pair: &CandidatePair<VertexId, EdgeId>,
) -> Length {
    let max_length = pair.lrp1.dnp() + config.next_point_variance;
    Length::from_meters(max_length.meters().ceil()).min(config.shortest_path.max_length)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;
    use crate::decoder::candidates::CandidateEdge;
    use crate::graph::tests::{
        EdgeId, NETWORK_GRAPH, NetworkError, NetworkGraph, TestProfile, VertexId,
    };
    use crate::{
        Bearing, Component, Coordinate, DirectedEdge, Fow, Frc, LineAttributes, PathAttributes,
        Point,
    };

    fn forward(id: u64) -> DirectedEdge<EdgeId> {
        DirectedEdge::forward(EdgeId(id))
    }

    fn lrp(lon: f64, dnp: Option<f64>) -> Point {
        Point {
            coordinate: Coordinate::new(lon, 49.6),
            line: LineAttributes {
                frc: Frc::Frc3,
                fow: Fow::SingleCarriageway,
                bearing: Bearing::from_degrees(90),
            },
            path: dnp.map(|dnp| PathAttributes {
                lfrcnp: Frc::Frc3,
                dnp: Length::from_meters(dnp),
            }),
        }
    }

    fn candidate(
        vertex: u64,
        edge: DirectedEdge<EdgeId>,
        score: f64,
    ) -> CandidateEdge<VertexId, EdgeId> {
        CandidateEdge {
            vertex: VertexId(vertex),
            edge,
            distance: Length::ZERO,
            score: Score::new("candidate", "candidate match", score, 1.0),
        }
    }

    #[test]
    fn decoder_resolve_route_best_attempt_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        // the best pair is connected by a path half as long as the distance to next point
        let (lrp1, lrp2) = (lrp(6.12, Some(144.2)), lrp(6.122, None));
        let pairs = vec![
            CandidatePair {
                lrp1,
                lrp2,
                source: candidate(1, forward(1), 1.0),
                target: candidate(2, forward(1), 0.9),
            },
            CandidatePair {
                lrp1,
                lrp2,
                source: candidate(1, forward(1), 1.0),
                target: candidate(3, forward(2), 0.8),
            },
        ];

        let resolved = resolve_route(&config, graph, &TestProfile, pairs.clone(), None, 9)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.route.path.edges, vec![forward(1), forward(2)]);
        assert!(!resolved.route.score.is_perfect());
        assert_relative_eq!(resolved.route.score.ratio(), 0.8, epsilon = 1e-9);
        assert_eq!(resolved.previous, None);

        // a single attempt keeps the first route
        let resolved = resolve_route(&config, graph, &TestProfile, pairs, None, 1)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.route.path.edges, vec![forward(1)]);
        assert_relative_eq!(resolved.route.score.ratio(), 0.45, epsilon = 1e-9);
    }

    #[test]
    fn decoder_resolve_route_previous_recomputed_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let lrp1 = lrp(6.12, Some(72.1));
        let lrp2 = lrp(6.121, Some(72.1));
        let lrp3 = lrp(6.123, None);

        // previous route stops at vertex 2, the next route would start with edge 2
        let previous = CandidatePair {
            lrp1,
            lrp2,
            source: candidate(1, forward(1), 1.0),
            target: candidate(2, forward(2), 1.0),
        };
        let previous = resolve_candidate_route(&config, graph, &TestProfile, previous)
            .unwrap()
            .unwrap();
        assert_eq!(previous.path.edges, vec![forward(1)]);

        // the accepted pair starts at vertex 3 instead
        let pairs = vec![CandidatePair {
            lrp1: lrp2,
            lrp2: lrp3,
            source: candidate(3, forward(3), 1.0),
            target: candidate(4, forward(3), 1.0),
        }];

        let resolved = resolve_route(&config, graph, &TestProfile, pairs, Some(&previous), 9)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.route.path.edges, vec![forward(3)]);

        let previous = resolved.previous.unwrap();
        assert_eq!(previous.path.edges, vec![forward(1), forward(2)]);
        assert_eq!(previous.source_edge(), forward(1));
        assert_eq!(previous.target_edge(), forward(3));
        assert_relative_eq!(previous.path.length.meters(), 144.2, epsilon = 1e-9);
    }

    #[test]
    fn decoder_resolve_candidate_route_graph_error_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let lrp1 = lrp(6.12, Some(72.1));
        let pair = CandidatePair {
            lrp1,
            lrp2: lrp(6.121, None),
            source: candidate(1, forward(999), 1.0),
            target: candidate(2, forward(999), 1.0),
        };

        assert_eq!(
            resolve_candidate_route(&config, graph, &TestProfile, pair).unwrap_err(),
            DecodeError::Graph {
                location: None,
                component: Component::Routing,
                lrp: Some(lrp1),
                source: NetworkError::UnknownEdge(EdgeId(999)),
            }
        );
    }
}
