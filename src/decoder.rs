//! The decoder resolves a (map-dependent) location using its own map.
//! This map might differ from the one used during encoding.
//!
//! 1. Decode physical data and check its validity.
//! 2. For each location reference point find candidate vertices and rate their edges.
//! 3. Determine shortest-path(s) between two subsequent location reference points.
//! 4. Check validity of the calculated shortest-path(s).
//! 5. Concatenate shortest-path(s) to form the location and trim path according to the offsets.

pub mod candidates;
mod line;
mod point;
mod resolver;
mod route;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use tracing::info;

use crate::decoder::line::{decode_closed_line, decode_line};
use crate::decoder::point::{decode_point_along_line, decode_poi};
use crate::{
    Bearing, DecodeError, DeserializeError, Length, Location, LocationReference, RoadNetwork,
    ShortestPathConfig, VehicleProfile, deserialize_binary_openlr,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
    /// Initial distance from the LRP to the vertices of the graph that will be considered.
    pub search_radius: Length,
    /// The search radius is doubled (up to this distance) until candidates are found.
    pub max_search_radius: Length,
    /// The length of the segment used to compute the edges bearing (distance from the start of
    /// the segment to its end).
    pub bearing_distance: Length,
    /// Maximum bearing difference between the candidate edge bearing and the LRP bearing for the
    /// candidate to be accepted.
    pub max_bearing_difference: Bearing,
    /// Minimum attribute match for an edge to be accepted as candidate.
    pub min_arc_score: f64,
    /// Maximum number of additional candidate pairs tried for each pair of LRPs of a line.
    /// Point along line locations try every pair, then expand the search radius.
    pub max_number_retries: usize,
    /// Variance allowed when comparing the route length to the distance to the next LRP.
    pub next_point_variance: Length,
    /// Forbids routes using roads less important than the LRP lowest FRC to next point (with its
    /// variance). The bound is advisory by default.
    pub enforce_lfrcnp: bool,
    pub shortest_path: ShortestPathConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            search_radius: Length::from_meters(100.0),
            max_search_radius: Length::from_meters(1600.0),
            bearing_distance: Length::from_meters(20.0),
            max_bearing_difference: Bearing::from_degrees(90),
            min_arc_score: 0.1,
            max_number_retries: 8,
            next_point_variance: Length::from_meters(150.0),
            enforce_lfrcnp: false,
            shortest_path: ShortestPathConfig::default(),
        }
    }
}

/// Decodes an OpenLR Location Reference encoded in Base64.
pub fn decode_base64_openlr<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    data: impl AsRef<[u8]>,
) -> Result<Location<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let data = BASE64_STANDARD
        .decode(data)
        .map_err(DeserializeError::from)?;
    decode_binary_openlr(config, graph, profile, &data)
}

/// Decodes an OpenLR Location Reference encoded in binary.
pub fn decode_binary_openlr<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    data: &[u8],
) -> Result<Location<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    // Step – 1 Decode physical data and check its validity
    let location = deserialize_binary_openlr(data)?;
    decode_location(config, graph, profile, location)
}

/// Decodes an already deserialized OpenLR Location Reference.
/// Locations that are not bound to the road network are returned unchanged.
pub fn decode_location<G, P>(
    config: &DecoderConfig,
    graph: &G,
    profile: &P,
    location: LocationReference,
) -> Result<Location<G::EdgeId>, DecodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Decoding {location:?} with {config:?}");
    let location_type = location.location_type();

    let location = match location {
        LocationReference::Line(line) => {
            decode_line(config, graph, profile, line).map(Location::Line)
        }
        LocationReference::ClosedLine(line) => {
            decode_closed_line(config, graph, profile, line).map(Location::ClosedLine)
        }
        LocationReference::PointAlongLine(point) => {
            decode_point_along_line(config, graph, profile, point).map(Location::PointAlongLine)
        }
        LocationReference::Poi(poi) => decode_poi(config, graph, profile, poi).map(Location::Poi),
        LocationReference::GeoCoordinate(coordinate) => Ok(Location::GeoCoordinate(coordinate)),
        LocationReference::Circle(circle) => Ok(Location::Circle(circle)),
        LocationReference::Rectangle(rectangle) => Ok(Location::Rectangle(rectangle)),
        LocationReference::Grid(grid) => Ok(Location::Grid(grid)),
        LocationReference::Polygon(polygon) => Ok(Location::Polygon(polygon)),
    };

    location.map_err(|error| error.at(location_type))
}
