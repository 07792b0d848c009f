#![doc = include_str!("../README.md")]

mod binary;
mod decoder;
mod encoder;
mod error;
mod geometry;
mod graph;
mod location;
mod model;
mod routing;
mod score;

pub use binary::{
    deserialize_base64_openlr, deserialize_binary_openlr, serialize_base64_openlr,
    serialize_binary_openlr,
};
pub use decoder::candidates::{
    ATTRIBUTES_SCORE, BEARING_SCORE, CandidateEdge, CandidateEdges, DISTANCE_SCORE, VERTEX_SCORE,
    find_candidates, find_candidates_with_expansion,
};
pub use decoder::{DecoderConfig, decode_base64_openlr, decode_binary_openlr, decode_location};
pub use encoder::{
    EncoderConfig, encode_base64_openlr, encode_binary_openlr, encode_location, is_vertex_valid,
};
pub use error::{
    Component, DecodeError, DeserializeError, EncodeError, LocationError, SerializeError,
};
pub use geometry::{
    Projection, bearing_along, distance, point_along, polyline_length, project, sample_bearing,
};
pub use graph::path::{Path, find_disconnection, is_path_connected, path_length, path_vertices};
pub use graph::{
    DirectedEdge, RoadNetwork, Traversal, VehicleProfile, entering_edges, exiting_edges,
};
pub use location::{
    Location, ReferencedLine, ReferencedPoi, ReferencedPointAlongLine, ensure_edges_are_valid,
    ensure_line_is_valid,
};
pub use model::{
    Bearing, Circle, ClosedLine, Coordinate, Fow, Frc, Grid, GridSize, Length, Line,
    LineAttributes, LocationReference, LocationType, Offset, Offsets, Orientation, PathAttributes,
    Poi, Point, PointAlongLine, Polygon, Rectangle, SideOfRoad,
};
pub use routing::{
    CandidatePath, Search, SearchDirection, ShortestPathConfig, candidate_path, shortest_path,
};
pub use score::{Composition, Score};
