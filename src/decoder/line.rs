use tracing::{debug, info};

use crate::decoder::candidates::find_candidates_with_expansion;
use crate::decoder::resolver::resolve_routes;
use crate::error::Component;
use crate::{
    ClosedLine, DecodeError, DecoderConfig, Line, LocationError, Offsets, Point, ReferencedLine,
    RoadNetwork, VehicleProfile,
};

pub fn decode_line<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    line: Line,
) -> Result<ReferencedLine<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Decoding {line:?} with {config:?}");

    if line.points.len() < 2 {
        return Err(LocationError::Empty.into());
    }

    // Step – 2 For each location reference point find candidate vertices and rate their edges
    let candidates = line
        .points
        .iter()
        .map(|lrp| find_candidates_with_expansion(config, graph, profile, lrp))
        .collect::<Result<Vec<_>, _>>()?;
    debug_assert_eq!(candidates.len(), line.points.len());

    // Step – 3 Determine shortest-path(s) between all subsequent location reference points
    // Step – 4 Check validity of the calculated shortest-path(s)
    let routes = resolve_routes(config, graph, profile, &candidates)?;
    debug_assert_eq!(routes.len(), line.points.len() - 1);

    // Step – 5 Concatenate and trim path according to the offsets
    let location = routes
        .into_measured_line(graph, line.offsets)
        .map_err(DecodeError::graph(Component::LineDecoder))?
        .trim()?;

    debug!("Decoded line {:?}", location.edges);
    Ok(location.into_referenced())
}

/// Decodes a closed line as a line whose last LRP is back at the first one.
pub fn decode_closed_line<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    line: ClosedLine,
) -> Result<ReferencedLine<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let ClosedLine { mut points, last_line } = line;

    let Some(first) = points.first() else {
        return Err(LocationError::Empty.into());
    };

    let last = Point {
        coordinate: first.coordinate,
        line: last_line,
        path: None,
    };
    points.push(last);

    let line = Line {
        points,
        offsets: Offsets::default(),
    };

    decode_line(config, graph, profile, line)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;
    use crate::graph::tests::{EdgeId, NETWORK_GRAPH, NetworkGraph, TestProfile};
    use crate::{
        Bearing, Coordinate, DirectedEdge, Fow, Frc, Length, LineAttributes, Offset,
        PathAttributes, ShortestPathConfig,
    };

    fn lrp(lon: f64, lat: f64, frc: Frc, bearing: u16, dnp: Option<f64>) -> Point {
        Point {
            coordinate: Coordinate::new(lon, lat),
            line: LineAttributes {
                frc,
                fow: Fow::SingleCarriageway,
                bearing: Bearing::from_degrees(bearing),
            },
            path: dnp.map(|dnp| PathAttributes {
                lfrcnp: frc,
                dnp: Length::from_meters(dnp),
            }),
        }
    }

    fn forward(id: u64) -> DirectedEdge<EdgeId> {
        DirectedEdge::forward(EdgeId(id))
    }

    fn backward(id: u64) -> DirectedEdge<EdgeId> {
        DirectedEdge::backward(EdgeId(id))
    }

    #[test]
    fn decoder_decode_line_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let line = Line {
            points: vec![
                lrp(6.12, 49.6, Frc::Frc3, 90, Some(216.3)),
                lrp(6.123, 49.6, Frc::Frc3, 270, None),
            ],
            offsets: Offsets::default(),
        };

        let location = decode_line(&config, graph, &TestProfile, line).unwrap();
        assert_eq!(location.edges, vec![forward(1), forward(2), forward(3)]);
        assert_eq!(location.offsets, Offsets::default());
    }

    #[test]
    fn decoder_decode_line_intermediate_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let line = Line {
            points: vec![
                lrp(6.12, 49.6, Frc::Frc3, 90, Some(144.2)),
                lrp(6.122, 49.6, Frc::Frc3, 90, Some(72.1)),
                lrp(6.123, 49.6, Frc::Frc3, 270, None),
            ],
            offsets: Offsets::default(),
        };

        let location = decode_line(&config, graph, &TestProfile, line).unwrap();
        assert_eq!(location.edges, vec![forward(1), forward(2), forward(3)]);
    }

    #[test]
    fn decoder_decode_line_offsets_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let line = Line {
            points: vec![
                lrp(6.12, 49.6, Frc::Frc3, 90, Some(216.3)),
                lrp(6.123, 49.6, Frc::Frc3, 270, None),
            ],
            offsets: Offsets::positive(Offset::from_range(0.5)),
        };

        // the first edge is fully covered by the positive offset
        let location = decode_line(&config, graph, &TestProfile, line).unwrap();
        assert_eq!(location.edges, vec![forward(2), forward(3)]);
        assert_relative_eq!(location.offsets.pos.range(), 0.25, epsilon = 1e-9);
        assert_relative_eq!(location.offsets.neg.range(), 0.0);
    }

    #[test]
    fn decoder_decode_line_route_not_found_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig {
            shortest_path: ShortestPathConfig {
                max_settled: 1,
                ..Default::default()
            },
            ..Default::default()
        };

        let first = lrp(6.12, 49.6, Frc::Frc3, 90, Some(500.0));
        let last = lrp(6.127, 49.6, Frc::Frc3, 270, None);
        let line = Line {
            points: vec![first, last],
            offsets: Offsets::default(),
        };

        assert_eq!(
            decode_line(&config, graph, &TestProfile, line).unwrap_err(),
            DecodeError::RouteNotFound((first, last))
        );
    }

    #[test]
    fn decoder_decode_line_empty_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let line = Line {
            points: vec![lrp(6.12, 49.6, Frc::Frc3, 90, None)],
            offsets: Offsets::default(),
        };

        assert_eq!(
            decode_line(&config, graph, &TestProfile, line).unwrap_err(),
            DecodeError::InvalidLocation(LocationError::Empty)
        );
    }

    #[test]
    fn decoder_decode_closed_line_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        // 1 -> 2 -> 6 -> 5 -> 1
        let line = ClosedLine {
            points: vec![lrp(6.12, 49.6, Frc::Frc3, 90, Some(366.6))],
            last_line: LineAttributes {
                frc: Frc::Frc5,
                fow: Fow::SingleCarriageway,
                bearing: Bearing::from_degrees(0),
            },
        };

        let location = decode_closed_line(&config, graph, &TestProfile, line).unwrap();
        assert_eq!(
            location.edges,
            vec![forward(1), forward(8), backward(4), backward(7)]
        );
        assert!(location.is_closed(graph).unwrap());
    }
}
