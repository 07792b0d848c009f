use std::ops::Deref;

use crate::decoder::candidates::CandidateEdge;
use crate::graph::path::Path;
use crate::location::MeasuredLine;
use crate::{DirectedEdge, Length, Offsets, Point, RoadNetwork, Score};

pub const PAIR_SCORE: &str = "pair";
pub const DEVIATION_SCORE: &str = "deviation";

/// Candidates of two consecutive LRPs, the source edge is the start of the shortest path and the
/// target edge is its end.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair<VertexId, EdgeId> {
    pub lrp1: Point,
    pub lrp2: Point,
    pub source: CandidateEdge<VertexId, EdgeId>,
    pub target: CandidateEdge<VertexId, EdgeId>,
}

impl<VertexId: PartialEq, EdgeId: PartialEq> CandidatePair<VertexId, EdgeId> {
    pub fn score(&self) -> Score {
        Score::product(
            PAIR_SCORE,
            "match of both candidates",
            self.source.score.clone(),
            self.target.score.clone(),
        )
    }

    pub fn is_same_vertex(&self) -> bool {
        self.source.vertex == self.target.vertex
    }
}

/// The shortest route between two (consecutive) LRPs.
///
/// If the second LRP is not the last one the route stops at its vertex, the target edge is the
/// first edge of the next route.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRoute<VertexId, EdgeId> {
    pub path: Path<EdgeId>,
    pub pair: CandidatePair<VertexId, EdgeId>,
    /// Pair, route existence and distance deviation scores.
    pub score: Score,
}

impl<VertexId, EdgeId: Copy> CandidateRoute<VertexId, EdgeId> {
    pub const fn source_edge(&self) -> DirectedEdge<EdgeId> {
        self.pair.source.edge
    }

    pub const fn target_edge(&self) -> DirectedEdge<EdgeId> {
        self.pair.target.edge
    }
}

/// The sequence of all the shortest routes that connect each consecutive LRP pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRoutes<VertexId, EdgeId>(Vec<CandidateRoute<VertexId, EdgeId>>);

impl<VertexId, EdgeId> From<Vec<CandidateRoute<VertexId, EdgeId>>>
    for CandidateRoutes<VertexId, EdgeId>
{
    fn from(routes: Vec<CandidateRoute<VertexId, EdgeId>>) -> Self {
        Self(routes)
    }
}

impl<VertexId, EdgeId> Deref for CandidateRoutes<VertexId, EdgeId> {
    type Target = Vec<CandidateRoute<VertexId, EdgeId>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<VertexId, EdgeId: Copy + PartialEq> CandidateRoutes<VertexId, EdgeId> {
    pub fn edges(&self) -> impl DoubleEndedIterator<Item = DirectedEdge<EdgeId>> {
        self.0.iter().flat_map(|route| &route.path.edges).copied()
    }

    pub fn path_length(&self) -> Length {
        self.0.iter().map(|route| route.path.length).sum()
    }

    /// Concatenates all the routes into a single line.
    ///
    /// The positive offset refers to the first route and the negative offset to the last route,
    /// both are converted into distances along the whole line.
    pub fn into_measured_line<G>(
        self,
        graph: &G,
        offsets: Offsets,
    ) -> Result<MeasuredLine<EdgeId>, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let head_length = self.first().map(|route| route.path.length);
        let tail_length = self.last().map(|route| route.path.length);

        let edges: Vec<_> = self.edges().collect();
        let lengths = edges
            .iter()
            .map(|edge| graph.edge_length(edge.id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MeasuredLine {
            edges,
            lengths,
            pos_offset: offsets.distance_from_start(head_length.unwrap_or(Length::ZERO)),
            neg_offset: offsets.distance_to_end(tail_length.unwrap_or(Length::ZERO)),
        })
    }
}

/// Rates how close the route length is to the distance to next point of the LRP.
pub fn distance_deviation(length: Length, dnp: Length) -> Score {
    let value = if dnp.is_zero() {
        if length.is_zero() { 1.0 } else { 0.0 }
    } else {
        let deviation = (length - dnp).meters().abs() / dnp.meters();
        1.0 - deviation.clamp(0.0, 1.0)
    };

    Score::new(DEVIATION_SCORE, "distance to next point deviation", value, 1.0)
}
