use tracing::{debug, info, warn};

use crate::encoder::expansion::line_location_expansion;
use crate::encoder::lrp::LocRefPoint;
use crate::error::Component;
use crate::geometry::project;
use crate::location::MeasuredLine;
use crate::routing::shortest_path;
use crate::{
    DirectedEdge, EncodeError, EncoderConfig, Length, LocationError, Offset, Offsets, Poi,
    PointAlongLine, ReferencedLine, ReferencedPoi, ReferencedPointAlongLine, RoadNetwork,
    VehicleProfile, ensure_edges_are_valid,
};

/// Largest offset that can be represented by the physical format.
const MAX_OFFSET: f64 = 255.0 / 256.0;

/// Encodes the point on its edge: the edge is expanded to valid vertices and the two LRPs are
/// placed at the ends of the expansion.
pub fn encode_point_along_line<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    point: ReferencedPointAlongLine<G::EdgeId>,
) -> Result<PointAlongLine, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Encoding {point:?} with {config:?}");
    encode_point(config, graph, profile, &point).map(|(location, _)| location)
}

/// Encodes the access point of the POI, its side of road is the side of the POI coordinate
/// relative to the referenced route.
pub fn encode_poi<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    poi: ReferencedPoi<G::EdgeId>,
) -> Result<Poi, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Encoding {poi:?} with {config:?}");

    let (mut point, edges) = encode_point(config, graph, profile, &poi.point)?;

    let coordinates = ReferencedLine::new(edges, Offsets::default())
        .coordinates(graph)
        .map_err(EncodeError::graph(Component::PointEncoder))?;

    if let Some(projection) = project(&coordinates, poi.coordinate) {
        point.side = projection.side;
    }

    Ok(Poi {
        point,
        coordinate: poi.coordinate,
    })
}

/// Returns the encoded point and the route between its LRPs.
fn encode_point<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    point: &ReferencedPointAlongLine<G::EdgeId>,
) -> Result<(PointAlongLine, Vec<DirectedEdge<G::EdgeId>>), EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    // Step – 1 Check validity of the location
    ensure_edges_are_valid(graph, profile, &[point.edge])?;

    let length = graph
        .edge_length(point.edge.id)
        .map_err(EncodeError::graph(Component::PointEncoder))?;
    let distance = point.distance_on_edge.clamp(Length::ZERO, length);

    let line = MeasuredLine {
        edges: vec![point.edge],
        lengths: vec![length],
        pos_offset: distance,
        neg_offset: length - distance,
    };

    // Step – 2 Adjust start and end node of the location to represent valid map nodes
    let line = line_location_expansion(config, graph, profile, &line)
        .map_err(EncodeError::graph(Component::ValidityAdjustment))?;

    let total = line.length();
    if total > config.max_lrp_distance {
        warn!("Point route of {total} exceeds the maximum LRP distance");
        return Err(EncodeError::MaxDistanceExceeded);
    }

    let (Some(&first), Some(&last)) = (line.edges.first(), line.edges.last()) else {
        return Err(LocationError::Empty.into());
    };

    // the decoder must be able to find the same route between the two LRPs
    let route = shortest_path(&config.shortest_path, graph, profile, first, last)
        .map_err(EncodeError::graph(Component::PointEncoder))?;
    if route.is_none_or(|route| route.edges != line.edges) {
        debug!("Expanded point route {:?} is not a shortest path", line.edges);
        return Err(EncodeError::RouteNotFound);
    }

    let lrp1 = LocRefPoint::from_edges(config, graph, profile, line.edges.clone(), 0)?;
    let lrp2 = LocRefPoint::from_last_edge(config, graph, profile, last, line.edges.len() - 1)?;

    let offset = Offset::relative(line.pos_offset, total).range().min(MAX_OFFSET);

    let location = PointAlongLine {
        points: [lrp1.point, lrp2.point],
        offset: Offset::from_range(offset),
        orientation: point.orientation,
        side: point.side,
    };

    Ok((location, line.edges))
}
