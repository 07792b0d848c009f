use std::io::ErrorKind;

use strum::Display;
use thiserror::Error;

use crate::{Coordinate, Length, LocationType, Offsets, Point};

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum DeserializeError {
    #[error("OpenLR invalid Base 64")]
    InvalidBase64,
    #[error("OpenLR buffer I/O error: {0:?}")]
    IO(ErrorKind),
    #[error("OpenLR version {0} not supported")]
    VersionNotSupported(u8),
    #[error("OpenLR header is not valid: {0:08b}")]
    InvalidHeader(u8),
    #[error("OpenLR data length {1} is not valid for {0}")]
    InvalidLength(LocationType, usize),
    #[error("OpenLR FRC is not valid: {0}")]
    InvalidFrc(u8),
    #[error("OpenLR FOW is not valid: {0}")]
    InvalidFow(u8),
    #[error("OpenLR Orientation is not valid: {0}")]
    InvalidOrientation(u8),
    #[error("OpenLR Side of Road is not valid: {0}")]
    InvalidSideOfRoad(u8),
    #[error("OpenLR Coordinate is not valid: {0:?}")]
    InvalidCoordinate(Coordinate),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum SerializeError {
    #[error("OpenLR buffer I/O error: {0:?}")]
    IO(ErrorKind),
    #[error("OpenLR Bearing is not valid, expected [0, 360): {0}")]
    InvalidBearing(u16),
    #[error("OpenLR distance to next point is not valid, expected [0, 15000): {0}")]
    InvalidDistance(Length),
    #[error("OpenLR radius is not valid: {0}")]
    InvalidRadius(Length),
    #[error("OpenLR Offset is not valid, expected [0, 1): {0}")]
    InvalidOffset(f64),
    #[error("OpenLR Line consists of at least 2 LR-points")]
    InvalidLine,
    #[error("OpenLR Polygon consists of at least 3 LR-points")]
    InvalidPolygon,
    #[error("OpenLR Rectangle consists of 2 different coordinates")]
    InvalidRectangle,
    #[error("OpenLR Grid size must have number of columns and rows > 1")]
    InvalidGridSize,
    #[error("OpenLR Coordinate is not valid: {0:?}")]
    InvalidCoordinate(Coordinate),
}

/// Part of the engine that was running when the road network collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Component {
    #[strum(to_string = "candidate search")]
    CandidateSearch,
    #[strum(to_string = "shortest path search")]
    Routing,
    #[strum(to_string = "line decoder")]
    LineDecoder,
    #[strum(to_string = "point along line decoder")]
    PointDecoder,
    #[strum(to_string = "location validation")]
    Validation,
    #[strum(to_string = "validity adjustment")]
    ValidityAdjustment,
    #[strum(to_string = "attribute extraction")]
    AttributeExtraction,
    #[strum(to_string = "line encoder")]
    LineEncoder,
    #[strum(to_string = "point along line encoder")]
    PointEncoder,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum DecodeError<GraphError> {
    #[error("Graph failure in {component} while decoding {location:?} at {lrp:?}: {source}")]
    Graph {
        location: Option<LocationType>,
        component: Component,
        /// LRP whose candidates or route were being searched.
        lrp: Option<Point>,
        #[source]
        source: GraphError,
    },
    #[error("Cannot decode location: {0}")]
    InvalidLocation(#[from] LocationError),
    #[error("Cannot decode location: {0}")]
    DeserializeError(#[from] DeserializeError),
    #[error("Cannot find candidates for {0:?}")]
    CandidatesNotFound(Point),
    #[error("Cannot find route between LRPs {0:?}")]
    RouteNotFound((Point, Point)),
}

impl<GraphError> DecodeError<GraphError> {
    /// Wraps a failure of the road network collaborator.
    pub(crate) fn graph(component: Component) -> impl FnOnce(GraphError) -> Self {
        move |source| Self::Graph {
            location: None,
            component,
            lrp: None,
            source,
        }
    }

    /// Wraps a failure of the road network collaborator while matching the given LRP.
    pub(crate) fn graph_at_lrp(
        component: Component,
        lrp: Point,
    ) -> impl FnOnce(GraphError) -> Self {
        move |source| Self::Graph {
            location: None,
            component,
            lrp: Some(lrp),
            source,
        }
    }

    /// Names the location that was being decoded when the failure occurred.
    pub(crate) fn at(mut self, location_type: LocationType) -> Self {
        if let Self::Graph { location, .. } = &mut self {
            location.get_or_insert(location_type);
        }
        self
    }
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum EncodeError<GraphError> {
    #[error("Graph failure in {component} while encoding {location:?} at edge {edge:?}: {source}")]
    Graph {
        location: Option<LocationType>,
        component: Component,
        /// Index of the location edge being processed.
        edge: Option<usize>,
        #[source]
        source: GraphError,
    },
    #[error("Cannot encode location: {0}")]
    InvalidLocation(#[from] LocationError),
    #[error("Cannot encode location: {0}")]
    SerializeError(#[from] SerializeError),
    #[error("Cannot find route between LRPs")]
    RouteNotFound,
    #[error("Maximum distance between consecutive LRPs exceeded")]
    MaxDistanceExceeded,
}

impl<GraphError> EncodeError<GraphError> {
    /// Wraps a failure of the road network collaborator.
    pub(crate) fn graph(component: Component) -> impl FnOnce(GraphError) -> Self {
        move |source| Self::Graph {
            location: None,
            component,
            edge: None,
            source,
        }
    }

    /// Wraps a failure of the road network collaborator while processing the location edge at
    /// the given index.
    pub(crate) fn graph_at_edge(
        component: Component,
        index: usize,
    ) -> impl FnOnce(GraphError) -> Self {
        move |source| Self::Graph {
            location: None,
            component,
            edge: Some(index),
            source,
        }
    }

    /// Names the location that was being encoded when the failure occurred.
    pub(crate) fn at(mut self, location_type: LocationType) -> Self {
        if let Self::Graph { location, .. } = &mut self {
            location.get_or_insert(location_type);
        }
        self
    }
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum LocationError {
    #[error("Invalid offsets {0:?}")]
    InvalidOffsets(Offsets),
    #[error("Location is empty")]
    Empty,
    #[error("Location is not connected at edge {index}")]
    NotConnected { index: usize },
    #[error("Location edge {index} is not traversable")]
    NotTraversable { index: usize },
    #[error("Location edge {index} is traversed in the wrong direction")]
    WrongDirection { index: usize },
    #[error("Location edge {index} has no FRC/FOW mapping")]
    MissingAttributes { index: usize },
}

impl From<base64::DecodeError> for DeserializeError {
    fn from(_: base64::DecodeError) -> Self {
        Self::InvalidBase64
    }
}

impl From<std::io::Error> for DeserializeError {
    fn from(error: std::io::Error) -> Self {
        Self::IO(error.kind())
    }
}

impl From<std::io::Error> for SerializeError {
    fn from(error: std::io::Error) -> Self {
        Self::IO(error.kind())
    }
}
