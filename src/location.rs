use crate::error::Component;
use crate::graph::path::{find_disconnection, path_length, path_vertices};
use crate::{
    Circle, Coordinate, DirectedEdge, EncodeError, Grid, Length, LocationError, LocationType,
    Offset, Offsets, Orientation, Polygon, Rectangle, RoadNetwork, SideOfRoad, Traversal,
    VehicleProfile,
};

/// Defines a location (in a map) that can be encoded using the OpenLR encoder
/// and is also the result of the decoding process.
#[derive(Debug, Clone, PartialEq)]
pub enum Location<EdgeId> {
    Line(ReferencedLine<EdgeId>),
    GeoCoordinate(Coordinate),
    PointAlongLine(ReferencedPointAlongLine<EdgeId>),
    Poi(ReferencedPoi<EdgeId>),
    Circle(Circle),
    Rectangle(Rectangle),
    Grid(Grid),
    Polygon(Polygon),
    /// Line whose last vertex is its first vertex.
    ClosedLine(ReferencedLine<EdgeId>),
}

impl<EdgeId> Location<EdgeId> {
    pub const fn location_type(&self) -> LocationType {
        match self {
            Self::Line(_) => LocationType::Line,
            Self::GeoCoordinate(_) => LocationType::GeoCoordinate,
            Self::PointAlongLine(_) => LocationType::PointAlongLine,
            Self::Poi(_) => LocationType::PoiWithAccessPoint,
            Self::Circle(_) => LocationType::Circle,
            Self::Rectangle(_) => LocationType::Rectangle,
            Self::Grid(_) => LocationType::Grid,
            Self::Polygon(_) => LocationType::Polygon,
            Self::ClosedLine(_) => LocationType::ClosedLine,
        }
    }
}

/// Ordered sequence of directed edges of one specific graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedLine<EdgeId> {
    /// Complete list of edges that form the line, in the direction of travel.
    pub edges: Vec<DirectedEdge<EdgeId>>,
    /// Offsets as fractions of the whole line length.
    pub offsets: Offsets,
}

impl<EdgeId: Copy + PartialEq> ReferencedLine<EdgeId> {
    pub const fn new(edges: Vec<DirectedEdge<EdgeId>>, offsets: Offsets) -> Self {
        Self { edges, offsets }
    }

    pub fn length<G>(&self, graph: &G) -> Result<Length, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        path_length(graph, &self.edges)
    }

    /// Distances covered by the positive and the negative offsets.
    pub fn offset_lengths<G>(&self, graph: &G) -> Result<(Length, Length), G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let length = self.length(graph)?;
        Ok((
            self.offsets.distance_from_start(length),
            self.offsets.distance_to_end(length),
        ))
    }

    /// Vertices visited by the line, including the start and the end of the edges cut by offsets.
    pub fn vertices<G>(&self, graph: &G) -> Result<Vec<G::VertexId>, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        path_vertices(graph, &self.edges)
    }

    /// Polyline of the whole line (offsets are ignored).
    pub fn coordinates<G>(&self, graph: &G) -> Result<Vec<Coordinate>, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let mut coordinates: Vec<Coordinate> = vec![];

        for edge in &self.edges {
            let geometry = edge.geometry(graph)?;
            let skip = match (coordinates.last(), geometry.first()) {
                (Some(last), Some(first)) if last.is_identical(first) => 1,
                _ => 0,
            };
            coordinates.extend(geometry.into_iter().skip(skip));
        }

        Ok(coordinates)
    }

    /// Returns true if the line ends at the vertex it starts from.
    pub fn is_closed<G>(&self, graph: &G) -> Result<bool, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        match (self.edges.first(), self.edges.last()) {
            (Some(first), Some(last)) => Ok(first.start_vertex(graph)? == last.end_vertex(graph)?),
            _ => Ok(false),
        }
    }
}

/// Point location bound to a route of one specific graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedPointAlongLine<EdgeId> {
    /// Route between the two location reference points.
    pub edges: Vec<DirectedEdge<EdgeId>>,
    /// Edge of the route where the point is.
    pub edge: DirectedEdge<EdgeId>,
    /// Distance from the start of the edge to the point, in the direction of travel.
    pub distance_on_edge: Length,
    /// Distance from the start of the route to the point, as fraction of the route length.
    pub offset: Offset,
    pub coordinate: Coordinate,
    pub orientation: Orientation,
    pub side: SideOfRoad,
}

impl<EdgeId: Copy + PartialEq> ReferencedPointAlongLine<EdgeId> {
    /// Creates a point location on a single edge.
    pub fn on_edge(edge: DirectedEdge<EdgeId>, distance_on_edge: Length) -> Self {
        Self {
            edges: vec![edge],
            edge,
            distance_on_edge,
            offset: Offset::default(),
            coordinate: Coordinate::default(),
            orientation: Orientation::default(),
            side: SideOfRoad::default(),
        }
    }
}

/// Point of interest with its access point bound to a route of one specific graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencedPoi<EdgeId> {
    /// Access point on the route.
    pub point: ReferencedPointAlongLine<EdgeId>,
    /// Coordinate of the point of interest.
    pub coordinate: Coordinate,
    /// Side of the road where the point of interest is, relative to the route.
    pub side: SideOfRoad,
}

/// Returns an error if the edges cannot be encoded as a location.
///
/// Edges are valid if the following constraints are fulfilled:
/// - There is at least one edge.
/// - Each edge can be traversed by the vehicle in the direction of the location.
/// - Each edge can be mapped to a functional road class and a form of way.
/// - The edges form a connected path.
pub fn ensure_edges_are_valid<G, P>(
    graph: &G,
    profile: &P,
    edges: &[DirectedEdge<G::EdgeId>],
) -> Result<(), EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    if edges.is_empty() {
        return Err(LocationError::Empty.into());
    }

    for (index, edge) in edges.iter().enumerate() {
        let tags = graph
            .edge_tags(edge.id)
            .map_err(EncodeError::graph_at_edge(Component::Validation, index))?;

        match profile.traversal(tags) {
            Traversal::None => return Err(LocationError::NotTraversable { index }.into()),
            traversal if !traversal.allows(edge.forward) => {
                return Err(LocationError::WrongDirection { index }.into());
            }
            _ => {}
        }

        if profile.frc(tags).is_none() || profile.fow(tags).is_none() {
            return Err(LocationError::MissingAttributes { index }.into());
        }
    }

    let disconnection =
        find_disconnection(graph, edges).map_err(EncodeError::graph(Component::Validation))?;

    if let Some(index) = disconnection {
        return Err(LocationError::NotConnected { index }.into());
    }

    Ok(())
}

/// Returns an error if the Line location is not valid.
///
/// A line location is valid if its edges are valid and the sum of the positive and negative offset
/// is less than the whole line.
pub fn ensure_line_is_valid<G, P>(
    graph: &G,
    profile: &P,
    line: &ReferencedLine<G::EdgeId>,
) -> Result<(), EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    ensure_edges_are_valid(graph, profile, &line.edges)?;

    let Offsets { pos, neg } = line.offsets;
    let is_in_range = |offset: Offset| (0.0..1.0).contains(&offset.range());

    if !is_in_range(pos) || !is_in_range(neg) || pos.range() + neg.range() >= 1.0 {
        return Err(LocationError::InvalidOffsets(line.offsets).into());
    }

    Ok(())
}

/// Line whose edges and offsets are measured in meters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MeasuredLine<EdgeId> {
    pub edges: Vec<DirectedEdge<EdgeId>>,
    pub lengths: Vec<Length>,
    /// Distance from the start of the first edge to the beginning of the location.
    pub pos_offset: Length,
    /// Distance from the end of the last edge to the end of the location.
    pub neg_offset: Length,
}

impl<EdgeId: Copy + PartialEq> MeasuredLine<EdgeId> {
    pub fn measure<G>(graph: &G, line: &ReferencedLine<EdgeId>) -> Result<Self, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let lengths = line
            .edges
            .iter()
            .map(|edge| graph.edge_length(edge.id))
            .collect::<Result<Vec<_>, _>>()?;
        let length: Length = lengths.iter().copied().sum();

        Ok(Self {
            edges: line.edges.clone(),
            lengths,
            pos_offset: line.offsets.distance_from_start(length),
            neg_offset: line.offsets.distance_to_end(length),
        })
    }

    pub fn length(&self) -> Length {
        self.lengths.iter().copied().sum()
    }

    /// Removes the edges fully covered by the offsets.
    ///
    /// The offsets must fulfill the following constraints:
    /// - The sum of the positive and negative offset cannot be greater than the total length of the
    ///   location lines.
    /// - Positive offset value shall be less than the length of the first line:
    ///     - Otherwise the first line can be removed from the list of location lines and the offset
    ///       value must be reduced in the same way.
    ///     - This procedure shall be repeated until this constraint is fulfilled.
    /// - Negative offset value shall be less than the length of the last line:
    ///     - Otherwise the last line can be removed from the list of location lines and the offset
    ///       value must be reduced in the same way.
    ///     - This procedure shall be repeated until this constraint is fulfilled.
    pub fn trim(mut self) -> Result<Self, LocationError> {
        if self.edges.is_empty() {
            return Err(LocationError::Empty);
        }

        let length = self.length();
        if self.pos_offset + self.neg_offset >= length {
            return Err(LocationError::InvalidOffsets(self.offsets()));
        }

        while let Some(&first) = self.lengths.first()
            && self.pos_offset >= first
            && self.lengths.len() > 1
        {
            self.pos_offset -= first;
            self.lengths.remove(0);
            self.edges.remove(0);
        }

        while let Some(&last) = self.lengths.last()
            && self.neg_offset >= last
            && self.lengths.len() > 1
        {
            self.neg_offset -= last;
            self.lengths.pop();
            self.edges.pop();
        }

        Ok(self)
    }

    /// Offsets as fractions of the whole line.
    pub fn offsets(&self) -> Offsets {
        let length = self.length();
        Offsets {
            pos: Offset::relative(self.pos_offset, length),
            neg: Offset::relative(self.neg_offset, length),
        }
    }

    pub fn into_referenced(self) -> ReferencedLine<EdgeId> {
        let offsets = self.offsets();
        ReferencedLine {
            edges: self.edges,
            offsets,
        }
    }
}
