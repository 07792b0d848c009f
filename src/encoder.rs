//! The OpenLR encoder generates a map-independent location reference for a (map-dependent)
//! location.
//!
//! 1. Check validity of the location and offsets to be encoded.
//! 2. Adjust start and end vertices of the location to represent valid map vertices.
//! 3. Determine coverage of the location by shortest-paths, placing intermediate location
//!    reference points where the location leaves the shortest-path.
//! 4. Create the location reference points and their attributes.
//! 5. Check validity of the location reference path and compute the offsets.
//! 6. Create physical representation of the location reference.

mod expansion;
mod line;
mod lrp;
mod point;
mod resolver;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use tracing::info;

pub use crate::encoder::expansion::is_vertex_valid;
use crate::encoder::line::{encode_closed_line, encode_line};
use crate::encoder::point::{encode_point_along_line, encode_poi};
use crate::{
    Bearing, EncodeError, Length, Location, LocationReference, RoadNetwork, ShortestPathConfig,
    VehicleProfile, serialize_binary_openlr,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    /// The maximum distance allowed between consecutive LRPs.
    pub max_lrp_distance: Length,
    /// The length of the segment used to compute the lines bearing (distance from the start of
    /// the segment to its end).
    pub bearing_distance: Length,
    /// One-way edges of a divided road split differ less than this bearing, a vertex with such
    /// a split is not a valid LRP position.
    pub max_split_bearing_difference: Bearing,
    pub shortest_path: ShortestPathConfig,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        // The smaller the max LRP distance the higher the offsets precision, however a small
        // distance can also negatively affect the decoding step, since having multiple LRPs
        // on the same line will incur in the same line degradation when rating any possible
        // route where 2 LRPs are on the same edge.
        const DEFAULT_MAX_LRP_DISTANCE: Length = Length::from_meters(4000.0);
        debug_assert!(DEFAULT_MAX_LRP_DISTANCE <= Length::MAX_BINARY_LRP_DISTANCE);

        Self {
            max_lrp_distance: DEFAULT_MAX_LRP_DISTANCE,
            bearing_distance: Length::from_meters(20.0),
            max_split_bearing_difference: Bearing::from_degrees(45),
            shortest_path: ShortestPathConfig::default(),
        }
    }
}

/// Encodes an OpenLR Location Reference into Base64.
pub fn encode_base64_openlr<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    location: Location<G::EdgeId>,
) -> Result<String, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let data = encode_binary_openlr(config, graph, profile, location)?;
    Ok(BASE64_STANDARD.encode(data))
}

/// Encodes an OpenLR Location Reference into binary.
pub fn encode_binary_openlr<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    location: Location<G::EdgeId>,
) -> Result<Vec<u8>, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let location = encode_location(config, graph, profile, location)?;

    // Step – 6 Create physical representation of the location reference.
    Ok(serialize_binary_openlr(&location)?)
}

/// Encodes a location into a (not yet serialized) OpenLR Location Reference.
/// Locations that are not bound to the road network are returned unchanged.
pub fn encode_location<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    location: Location<G::EdgeId>,
) -> Result<LocationReference, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Encoding {location:?} with {config:?}");
    let location_type = location.location_type();

    let location = match location {
        Location::Line(line) => {
            encode_line(config, graph, profile, line).map(LocationReference::Line)
        }
        Location::ClosedLine(line) => {
            encode_closed_line(config, graph, profile, line).map(LocationReference::ClosedLine)
        }
        Location::PointAlongLine(point) => encode_point_along_line(config, graph, profile, point)
            .map(LocationReference::PointAlongLine),
        Location::Poi(poi) => encode_poi(config, graph, profile, poi).map(LocationReference::Poi),
        Location::GeoCoordinate(coordinate) => Ok(LocationReference::GeoCoordinate(coordinate)),
        Location::Circle(circle) => Ok(LocationReference::Circle(circle)),
        Location::Rectangle(rectangle) => Ok(LocationReference::Rectangle(rectangle)),
        Location::Grid(grid) => Ok(LocationReference::Grid(grid)),
        Location::Polygon(polygon) => Ok(LocationReference::Polygon(polygon)),
    };

    location.map_err(|error| error.at(location_type))
}
