use tracing::{debug, info};

use crate::decoder::candidates::{CandidateEdges, expand_search_radius, find_candidates};
use crate::decoder::resolver::{candidate_pairs, resolve_route};
use crate::decoder::route::CandidateRoute;
use crate::error::Component;
use crate::geometry::{point_along, polyline_length, project};
use crate::{
    Coordinate, DecodeError, DecoderConfig, DirectedEdge, Length, Offset, Point, PointAlongLine,
    Poi, ReferencedPoi, ReferencedPointAlongLine, RoadNetwork, SideOfRoad, VehicleProfile,
};

pub fn decode_point_along_line<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    point: PointAlongLine,
) -> Result<ReferencedPointAlongLine<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Decoding {point:?} with {config:?}");

    let route = resolve_point_route(config, graph, profile, &point.points)?;
    let geometry = RouteGeometry::new(graph, &route.path.edges)
        .map_err(DecodeError::graph(Component::PointDecoder))?;

    Ok(geometry.locate(&point))
}

/// Decodes the access point of the POI, then projects the POI onto the route for its side.
pub fn decode_poi<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    poi: Poi,
) -> Result<ReferencedPoi<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Decoding {poi:?} with {config:?}");

    let route = resolve_point_route(config, graph, profile, &poi.point.points)?;
    let geometry = RouteGeometry::new(graph, &route.path.edges)
        .map_err(DecodeError::graph(Component::PointDecoder))?;

    let side = project(&geometry.coordinates, poi.coordinate)
        .map(|projection| projection.side)
        .unwrap_or_default();

    Ok(ReferencedPoi {
        point: geometry.locate(&poi.point),
        coordinate: poi.coordinate,
        side,
    })
}

/// Point along line locations cannot have intermediate LRPs, the search radius of both LRPs is
/// expanded instead until a route is found. The first radius with a route wins.
///
/// Every candidate pair is tried at each radius: the retries limit of line locations does not
/// apply, the radius expansion takes its place.
fn resolve_point_route<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    points: &[Point; 2],
) -> Result<CandidateRoute<G::VertexId, G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let [lrp1, lrp2] = points;
    let mut radius = config.search_radius.min(config.max_search_radius);

    loop {
        let [candidates_lrp1, candidates_lrp2] = [lrp1, lrp2].map(|lrp| {
            find_candidates(config, graph, profile, lrp, radius).map(|candidates| {
                CandidateEdges {
                    lrp: *lrp,
                    candidates,
                }
            })
        });

        let candidates_lrp1 =
            candidates_lrp1.map_err(DecodeError::graph_at_lrp(Component::CandidateSearch, *lrp1))?;
        let candidates_lrp2 =
            candidates_lrp2.map_err(DecodeError::graph_at_lrp(Component::CandidateSearch, *lrp2))?;

        let pairs = candidate_pairs(&candidates_lrp1, &candidates_lrp2)
            .into_iter()
            .filter(|pair| !pair.is_same_vertex());

        if let Some(resolved) = resolve_route(config, graph, profile, pairs, None, usize::MAX)? {
            debug!("Point route found within {radius}");
            return Ok(resolved.route);
        }

        let Some(expanded) = expand_search_radius(config, radius) else {
            return Err(if candidates_lrp1.candidates.is_empty() {
                DecodeError::CandidatesNotFound(*lrp1)
            } else if candidates_lrp2.candidates.is_empty() {
                DecodeError::CandidatesNotFound(*lrp2)
            } else {
                DecodeError::RouteNotFound((*lrp1, *lrp2))
            });
        };

        radius = expanded;
        debug!("No point route found, expanding search radius to {radius}");
    }
}

/// Polyline of a route, with the section covered by each edge.
struct RouteGeometry<EdgeId> {
    edges: Vec<DirectedEdge<EdgeId>>,
    coordinates: Vec<Coordinate>,
    /// Edge length, distance along the polyline where the edge starts and its polyline length.
    sections: Vec<(Length, Length, Length)>,
}

impl<EdgeId: Copy + PartialEq> RouteGeometry<EdgeId> {
    fn new<G>(graph: &G, edges: &[DirectedEdge<EdgeId>]) -> Result<Self, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let mut coordinates: Vec<Coordinate> = vec![];
        let mut sections = Vec::with_capacity(edges.len());
        let mut start = Length::ZERO;

        for edge in edges {
            let geometry = edge.geometry(graph)?;
            let geometry_length = polyline_length(&geometry);
            sections.push((graph.edge_length(edge.id)?, start, geometry_length));
            start += geometry_length;

            let skip = match (coordinates.last(), geometry.first()) {
                (Some(last), Some(first)) if last.is_identical(first) => 1,
                _ => 0,
            };
            coordinates.extend(geometry.into_iter().skip(skip));
        }

        Ok(Self {
            edges: edges.to_vec(),
            coordinates,
            sections,
        })
    }

    fn length(&self) -> Length {
        self.sections
            .last()
            .map(|&(_, start, length)| start + length)
            .unwrap_or(Length::ZERO)
    }

    /// Positions the point on the route.
    ///
    /// The offset refers to the part of the route between the projections of the two LRPs, which
    /// might not be exactly at the start and the end of the route.
    fn locate(&self, point: &PointAlongLine) -> ReferencedPointAlongLine<EdgeId> {
        let [lrp1, lrp2] = &point.points;
        let length = self.length();

        let projection_lrp1 = project(&self.coordinates, lrp1.coordinate);
        let projection_lrp2 = project(&self.coordinates, lrp2.coordinate);

        let head = projection_lrp1
            .map(|projection| projection.distance_along)
            .unwrap_or(Length::ZERO);
        let tail = projection_lrp2
            .map(|projection| length - projection.distance_along)
            .unwrap_or(Length::ZERO);

        let available = (length - head - tail).max(Length::ZERO);
        let distance = (head + point.offset.distance(available)).clamp(Length::ZERO, length);

        let side = match point.side {
            SideOfRoad::OnRoadOrUnknown => projection_lrp1
                .map(|projection| projection.side)
                .unwrap_or_default(),
            side => side,
        };

        let (edge, distance_on_edge) = self.edge_at(distance);

        ReferencedPointAlongLine {
            edges: self.edges.clone(),
            edge,
            distance_on_edge,
            offset: Offset::relative(distance, length),
            coordinate: point_along(&self.coordinates, distance).unwrap_or(lrp1.coordinate),
            orientation: point.orientation,
            side,
        }
    }

    /// Edge at the given distance along the polyline, and the distance from the start of the edge
    /// measured with the edge length.
    fn edge_at(&self, distance: Length) -> (DirectedEdge<EdgeId>, Length) {
        let index = self
            .sections
            .iter()
            .position(|&(_, start, length)| distance <= start + length)
            .unwrap_or(self.sections.len().saturating_sub(1));

        let (edge_length, start, geometry_length) = self.sections[index];
        let ratio = if geometry_length > Length::ZERO {
            ((distance - start).meters() / geometry_length.meters()).clamp(0.0, 1.0)
        } else {
            0.0
        };

        (self.edges[index], edge_length * ratio)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use test_log::test;

    use super::*;
    use crate::graph::tests::{EdgeId, NETWORK_GRAPH, NetworkGraph, TestProfile};
    use crate::{Bearing, Fow, Frc, LineAttributes, Orientation, PathAttributes};

    fn point_along_line(lrp1: Coordinate, offset: f64, side: SideOfRoad) -> PointAlongLine {
        PointAlongLine {
            points: [
                Point {
                    coordinate: lrp1,
                    line: LineAttributes {
                        frc: Frc::Frc3,
                        fow: Fow::SingleCarriageway,
                        bearing: Bearing::from_degrees(90),
                    },
                    path: Some(PathAttributes {
                        lfrcnp: Frc::Frc3,
                        dnp: Length::from_meters(144.2),
                    }),
                },
                Point {
                    coordinate: Coordinate::new(6.122, 49.6),
                    line: LineAttributes {
                        frc: Frc::Frc3,
                        fow: Fow::SingleCarriageway,
                        bearing: Bearing::from_degrees(270),
                    },
                    path: None,
                },
            ],
            offset: Offset::from_range(offset),
            orientation: Orientation::Forward,
            side,
        }
    }

    #[test]
    fn decoder_decode_point_along_line_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let point = point_along_line(Coordinate::new(6.12, 49.6), 0.25, SideOfRoad::Right);
        let location = decode_point_along_line(&config, graph, &TestProfile, point).unwrap();

        assert_eq!(
            location.edges,
            vec![
                DirectedEdge::forward(EdgeId(1)),
                DirectedEdge::forward(EdgeId(2))
            ]
        );
        assert_eq!(location.edge, DirectedEdge::forward(EdgeId(1)));
        assert_relative_eq!(location.distance_on_edge.meters(), 36.05, epsilon = 1e-3);
        assert_relative_eq!(location.offset.range(), 0.25, epsilon = 1e-5);
        assert_relative_eq!(location.coordinate.lon, 6.1205, epsilon = 1e-6);
        assert_relative_eq!(location.coordinate.lat, 49.6, epsilon = 1e-6);
        assert_eq!(location.orientation, Orientation::Forward);
        assert_eq!(location.side, SideOfRoad::Right);
    }

    #[test]
    fn decoder_decode_point_along_line_side_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        // about 5 meters north of vertex 1, on the left of the route heading east
        let lrp1 = Coordinate::new(6.12, 49.60005);
        let point = point_along_line(lrp1, 0.75, SideOfRoad::OnRoadOrUnknown);
        let location = decode_point_along_line(&config, graph, &TestProfile, point).unwrap();

        assert_eq!(location.edge, DirectedEdge::forward(EdgeId(2)));
        assert_relative_eq!(location.distance_on_edge.meters(), 36.05, epsilon = 1e-3);
        assert_eq!(location.side, SideOfRoad::Left);
    }

    #[test]
    fn decoder_decode_poi_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig::default();

        let poi = Poi {
            point: point_along_line(Coordinate::new(6.12, 49.6), 0.5, SideOfRoad::Both),
            coordinate: Coordinate::new(6.1205, 49.5999),
        };

        let location = decode_poi(&config, graph, &TestProfile, poi).unwrap();
        assert_eq!(location.side, SideOfRoad::Right);
        assert_eq!(location.point.side, SideOfRoad::Both);
        assert_eq!(location.coordinate, Coordinate::new(6.1205, 49.5999));
    }

    #[test]
    fn decoder_decode_point_along_line_not_found_001() {
        let graph: &NetworkGraph = &NETWORK_GRAPH;
        let config = DecoderConfig {
            max_search_radius: Length::from_meters(200.0),
            ..Default::default()
        };

        let point = point_along_line(Coordinate::new(6.0, 49.0), 0.5, SideOfRoad::Right);
        let lrp1 = point.points[0];

        assert_eq!(
            decode_point_along_line(&config, graph, &TestProfile, point).unwrap_err(),
            DecodeError::CandidatesNotFound(lrp1)
        );
    }
}
