use std::ops::Range;

use tracing::{debug, trace, warn};

use crate::encoder::lrp::{LocRefPoint, LocRefPoints};
use crate::error::Component;
use crate::location::MeasuredLine;
use crate::routing::{Search, SearchDirection};
use crate::{
    DirectedEdge, EncodeError, EncoderConfig, Length, LocationError, Offset, Offsets,
    RoadNetwork, ShortestPathConfig, VehicleProfile,
};

/// Resolves all the LRPs that should be necessary to encode the given (expanded) line.
///
/// The location is split into segments that are each the shortest path between their first edge
/// and the first edge of the next segment, and shorter than the maximum LRP distance. Each segment
/// starts with an LRP, the last LRP is placed at the end of the location.
///
/// Leading and trailing segments that are fully covered by the offsets are not referenced.
pub fn resolve_lrps<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &MeasuredLine<G::EdgeId>,
) -> Result<LocRefPoints<G::EdgeId>, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    if line.edges.is_empty() {
        return Err(LocationError::Empty.into());
    }

    // Step – 3 Determine coverage of the location by a shortest-path.
    // Step – 4 Check whether the calculated shortest-path covers the location completely.
    // Step – 5 Determine the position of a new intermediate location reference point.
    // Step – 6 Restart shortest path calculation between the new intermediate location reference
    // point and the end of the location.
    let mut segments: Vec<Range<usize>> = vec![];
    let mut start = 0;

    while start < line.edges.len() {
        let covered = coverage(
            config,
            graph,
            profile,
            &line.edges[start..],
            &line.lengths[start..],
        )?;
        debug_assert!(covered > 0);

        trace!("Segment {start}..{} covered by a shortest path", start + covered);
        segments.push(start..start + covered);
        start += covered;
    }

    let segment_length = |range: &Range<usize>| -> Length {
        line.lengths[range.clone()].iter().copied().sum()
    };

    let mut pos_offset = line.pos_offset;
    let mut neg_offset = line.neg_offset;

    while segments.len() > 1
        && let Some(first) = segments.first()
        && pos_offset >= segment_length(first)
    {
        pos_offset -= segment_length(first);
        segments.remove(0);
    }

    while segments.len() > 1
        && let Some(last) = segments.last()
        && neg_offset >= segment_length(last)
    {
        neg_offset -= segment_length(last);
        segments.pop();
    }

    let mut lrps = Vec::with_capacity(segments.len() + 1);
    for range in &segments {
        let edges = line.edges[range.clone()].to_vec();
        lrps.push(LocRefPoint::from_edges(
            config,
            graph,
            profile,
            edges,
            range.start,
        )?);
    }

    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return Err(LocationError::Empty.into());
    };

    let last_index = last.end - 1;
    let last_lrp = LocRefPoint::from_last_edge(
        config,
        graph,
        profile,
        line.edges[last_index],
        last_index,
    )?;
    lrps.push(last_lrp);

    // Step – 8 Check validity of the location reference path.
    if let Some(lrp) = lrps
        .iter()
        .find(|lrp| lrp.point.dnp() > config.max_lrp_distance)
    {
        warn!("Maximum LRP distance exceeded by {lrp:?}");
        return Err(EncodeError::MaxDistanceExceeded);
    }

    let offsets = Offsets {
        pos: Offset::relative(pos_offset, segment_length(first)),
        neg: Offset::relative(neg_offset, segment_length(last)),
    };

    debug!("Resolved {} LRPs with {offsets:?}", lrps.len());
    Ok(LocRefPoints { lrps, offsets })
}

/// Returns the number of edges of the location, from its first edge, that are covered by the
/// shortest path starting at the first edge and that are within the maximum LRP distance.
///
/// An intermediate LRP is placed at the start of the returned edge index: if the shortest path
/// to an edge of the location deviates from the location, the next LRP is placed on the last
/// edge that is still on the shortest path, so that the next segment can route through it.
fn coverage<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    location: &[DirectedEdge<G::EdgeId>],
    lengths: &[Length],
) -> Result<usize, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let (Some(&origin), Some(&origin_length)) = (location.first(), lengths.first()) else {
        return Err(LocationError::Empty.into());
    };

    if origin_length > config.max_lrp_distance {
        warn!("{origin:?} is longer than the maximum LRP distance");
        return Err(EncodeError::MaxDistanceExceeded);
    }

    let search_config = ShortestPathConfig {
        max_length: config.max_lrp_distance,
        ..config.shortest_path
    };

    let mut search = Search::new(&search_config, graph, profile, origin, SearchDirection::Forward)
        .map_err(EncodeError::graph(Component::LineEncoder))?;

    // length of the location before the current edge
    let mut length = origin_length;

    for (index, (&edge, &edge_length)) in location.iter().zip(lengths).enumerate().skip(1) {
        let path = search
            .settle(edge)
            .map_err(EncodeError::graph(Component::LineEncoder))?;

        if path.is_none() || search.previous(&edge) != Some(location[index - 1]) {
            trace!("Location deviates from the shortest path at {edge:?}");
            return Ok((index - 1).max(1));
        }

        if length > config.max_lrp_distance {
            trace!("Segment exceeds max LRP distance at {edge:?}");
            return Ok((index - 1).max(1));
        }

        length += edge_length;
    }

    if length > config.max_lrp_distance {
        return Ok((location.len() - 1).max(1));
    }

    Ok(location.len())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;
    use crate::graph::tests::{EdgeId, NETWORK_GRAPH, NetworkError, NetworkGraph, TestProfile};
    use crate::{Coordinate, Frc, ReferencedLine};

    fn forward(id: u64) -> DirectedEdge<EdgeId> {
        DirectedEdge::forward(EdgeId(id))
    }

    fn backward(id: u64) -> DirectedEdge<EdgeId> {
        DirectedEdge::backward(EdgeId(id))
    }

    fn measured(edges: Vec<DirectedEdge<EdgeId>>, offsets: Offsets) -> MeasuredLine<EdgeId> {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        MeasuredLine::measure(graph, &ReferencedLine::new(edges, offsets)).unwrap()
    }

    fn resolve(
        config: &EncoderConfig,
        line: &MeasuredLine<EdgeId>,
    ) -> Result<LocRefPoints<EdgeId>, EncodeError<NetworkError>> {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        resolve_lrps(config, graph, &TestProfile, line)
    }

    #[test]
    fn encoder_resolve_lrps_001() {
        let config = EncoderConfig::default();
        let line = measured(vec![forward(1), forward(2), forward(3)], Offsets::default());

        let LocRefPoints { lrps, offsets } = resolve(&config, &line).unwrap();

        assert_eq!(lrps.len(), 2);
        assert_eq!(lrps[0].edges, vec![forward(1), forward(2), forward(3)]);
        assert_eq!(lrps[0].point.coordinate, Coordinate::new(6.12, 49.6));
        assert_relative_eq!(lrps[0].point.dnp().meters(), 216.3, epsilon = 1e-9);
        assert_eq!(lrps[0].point.lfrcnp(), Frc::Frc3);
        assert_eq!(lrps[1].point.coordinate, Coordinate::new(6.123, 49.6));
        assert!(lrps[1].point.is_last());
        assert_eq!(offsets, Offsets::default());
    }

    #[test]
    fn encoder_resolve_lrps_max_distance_001() {
        let config = EncoderConfig {
            max_lrp_distance: Length::from_meters(150.0),
            ..Default::default()
        };
        let line = measured(vec![forward(1), forward(2), forward(3)], Offsets::default());

        let LocRefPoints { lrps, .. } = resolve(&config, &line).unwrap();

        assert_eq!(lrps.len(), 3);
        assert_eq!(lrps[0].edges, vec![forward(1), forward(2)]);
        assert_eq!(lrps[1].edges, vec![forward(3)]);
        assert_eq!(lrps[1].point.coordinate, Coordinate::new(6.122, 49.6));
        assert_eq!(lrps[2].point.coordinate, Coordinate::new(6.123, 49.6));

        let config = EncoderConfig {
            max_lrp_distance: Length::from_meters(50.0),
            ..Default::default()
        };
        assert_eq!(
            resolve(&config, &line).unwrap_err(),
            EncodeError::MaxDistanceExceeded
        );
    }

    #[test]
    fn encoder_resolve_lrps_detour_001() {
        let config = EncoderConfig::default();

        // 1 -> 2 -> 6 -> 7 -> 3 -> 4 is not the shortest path to 4
        let line = measured(
            vec![forward(1), forward(8), forward(5), backward(9), forward(3)],
            Offsets::default(),
        );

        let LocRefPoints { lrps, .. } = resolve(&config, &line).unwrap();

        assert_eq!(lrps.len(), 3);
        assert_eq!(lrps[0].edges, vec![forward(1), forward(8), forward(5)]);
        assert_eq!(lrps[0].point.lfrcnp(), Frc::Frc5);
        assert_eq!(lrps[1].edges, vec![backward(9), forward(3)]);
        assert_eq!(lrps[1].point.coordinate, Coordinate::new(6.122, 49.601));
        assert_eq!(lrps[2].point.coordinate, Coordinate::new(6.123, 49.6));
    }

    #[test]
    fn encoder_resolve_lrps_offsets_001() {
        let config = EncoderConfig {
            max_lrp_distance: Length::from_meters(150.0),
            ..Default::default()
        };

        // the negative offset covers the whole last segment
        let mut line = measured(vec![forward(1), forward(2), forward(3)], Offsets::default());
        line.neg_offset = Length::from_meters(100.0);

        let LocRefPoints { lrps, offsets } = resolve(&config, &line).unwrap();

        assert_eq!(lrps.len(), 2);
        assert_eq!(lrps[0].edges, vec![forward(1), forward(2)]);
        assert_eq!(lrps[1].point.coordinate, Coordinate::new(6.122, 49.6));
        assert_relative_eq!(offsets.pos.range(), 0.0);
        assert_relative_eq!(offsets.neg.range(), (100.0 - 72.1) / 144.2, epsilon = 1e-9);
    }
}
