use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::error::Component;
use crate::geometry::sample_bearing;
use crate::graph::{entering_edges, exiting_edges};
use crate::{
    DecodeError, DecoderConfig, DirectedEdge, Length, Point, RoadNetwork, Score, VehicleProfile,
};

/// Name of the attribute and distance match of a candidate, recoverable from its score.
pub const VERTEX_SCORE: &str = "vertex";
pub const ATTRIBUTES_SCORE: &str = "attributes";
pub const DISTANCE_SCORE: &str = "distance";
pub const BEARING_SCORE: &str = "bearing";

/// Graph vertex (and one of its edges) hypothesized to match a location reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEdge<VertexId, EdgeId> {
    pub vertex: VertexId,
    /// Exits the vertex, or enters it for the last LRP.
    pub edge: DirectedEdge<EdgeId>,
    /// Straight distance from the LRP to the vertex.
    pub distance: Length,
    pub score: Score,
}

/// Candidates of one location reference point, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEdges<VertexId, EdgeId> {
    pub lrp: Point,
    pub candidates: Vec<CandidateEdge<VertexId, EdgeId>>,
}

/// Finds the candidates of the LRP within the given radius.
///
/// Each vertex close to the LRP contributes its edges that leave the vertex (enter it for the last
/// LRP) and can be traversed by the profile in that direction. An edge is rated by:
/// - how well its attributes match the LRP road class and form of way,
/// - how close its vertex is to the LRP (linear decay over the radius),
/// - how close its bearing is to the LRP bearing.
///
/// Candidates whose attributes don't match enough or whose bearing differs too much are dropped.
pub fn find_candidates<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    lrp: &Point,
    radius: Length,
) -> Result<Vec<CandidateEdge<G::VertexId, G::EdgeId>>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    debug!("Finding candidates for {lrp:?} within {radius}");

    let vertices: Vec<_> = graph
        .vertices_within_distance(lrp.coordinate, radius)?
        .collect();

    let mut candidates = vec![];

    for (vertex, distance) in vertices {
        // only outgoing edges are accepted for the LRPs
        // except for the last LRP where only incoming edges are accepted
        let edges = if lrp.is_last() {
            entering_edges(graph, profile, vertex)?
        } else {
            exiting_edges(graph, profile, vertex)?
        };

        for edge in edges {
            let candidate =
                rate_candidate(config, graph, profile, lrp, radius, vertex, edge, distance)?;

            if let Some(candidate) = candidate {
                trace!("Accepted candidate: {candidate:?}");
                candidates.push(candidate);
            }
        }
    }

    candidates.sort_by_key(|candidate| {
        (
            Reverse(candidate.score.rank()),
            candidate.distance,
            candidate.edge,
        )
    });

    Ok(candidates)
}

/// Finds the candidates of the LRP, doubling the search radius until at least one is found or
/// the maximum radius has been searched.
pub fn find_candidates_with_expansion<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    lrp: &Point,
) -> Result<CandidateEdges<G::VertexId, G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let mut radius = config.search_radius.min(config.max_search_radius);

    loop {
        let candidates = find_candidates(config, graph, profile, lrp, radius)
            .map_err(DecodeError::graph_at_lrp(Component::CandidateSearch, *lrp))?;

        if !candidates.is_empty() {
            return Ok(CandidateEdges {
                lrp: *lrp,
                candidates,
            });
        }

        let Some(expanded) = expand_search_radius(config, radius) else {
            debug!("No candidates found for {lrp:?}");
            return Err(DecodeError::CandidatesNotFound(*lrp));
        };
        radius = expanded;
    }
}

/// Returns the radius to search after `radius`, or None once the maximum radius was searched.
///
/// The radius is doubled up to the maximum. A radius that cannot grow by doubling (zero, negative
/// or infinite) jumps straight to the maximum, so the expansion always ends.
pub(crate) fn expand_search_radius(config: &DecoderConfig, radius: Length) -> Option<Length> {
    if radius >= config.max_search_radius {
        return None;
    }

    let doubled = radius * 2.0;
    if doubled > radius {
        Some(doubled.min(config.max_search_radius))
    } else {
        Some(config.max_search_radius)
    }
}

#[allow(clippy::too_many_arguments)]
fn rate_candidate<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    lrp: &Point,
    radius: Length,
    vertex: G::VertexId,
    edge: DirectedEdge<G::EdgeId>,
    distance: Length,
) -> Result<Option<CandidateEdge<G::VertexId, G::EdgeId>>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let tags = graph.edge_tags(edge.id)?;

    let attributes = profile.match_arc(tags, lrp.line.fow, lrp.line.frc);
    if attributes.is_nan() || attributes < config.min_arc_score {
        trace!("Candidate {edge:?} attributes don't match: {attributes}");
        return Ok(None);
    }

    let geometry = edge.geometry(graph)?;
    let Some(bearing) = sample_bearing(&geometry, config.bearing_distance, lrp.is_last()) else {
        trace!("Candidate {edge:?} has no bearing");
        return Ok(None);
    };

    let bearing_difference = bearing.difference(&lrp.line.bearing);
    if bearing_difference > config.max_bearing_difference {
        trace!("Candidate {edge:?} bearing out of bounds: {bearing:?}");
        return Ok(None);
    }

    let distance_ratio = if radius > Length::ZERO {
        (distance.meters() / radius.meters()).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let vertex_score = Score::product(
        VERTEX_SCORE,
        "attribute and distance match",
        Score::new(ATTRIBUTES_SCORE, "road class and form of way match", attributes, 1.0),
        Score::new(DISTANCE_SCORE, "distance from the LRP", 1.0 - distance_ratio, 1.0),
    );

    let bearing_score = Score::new(
        BEARING_SCORE,
        "bearing deviation",
        1.0 - bearing_difference.degrees() as f64 / 180.0,
        1.0,
    );

    Ok(Some(CandidateEdge {
        vertex,
        edge,
        distance,
        score: Score::product("candidate", "candidate match", vertex_score, bearing_score),
    }))
}
