use std::borrow::Cow;
use std::fmt::Debug;
use std::hash::Hash;

use crate::{Coordinate, Fow, Frc, Length};

/// Road network the decoder and encoder run on.
/// Exposes the behavior of a Geospatial Index and of a Road Network Graph.
///
/// Edges are stored once, with a geometry going from their start vertex to their end vertex.
/// The direction(s) in which an edge can be traversed is decided by a [`VehicleProfile`].
pub trait RoadNetwork {
    /// Uniquely identify a vertex that belongs to the graph.
    type VertexId: Debug + Copy + Ord + Hash;
    /// Uniquely identify an edge that belongs to the graph.
    type EdgeId: Debug + Copy + Ord + Hash;
    /// Attributes of an edge, interpreted by the vehicle profile.
    type Tags: ?Sized;
    /// Failure of the underlying storage.
    type Error: std::error::Error + 'static;

    /// Gets the vertex coordinate.
    fn vertex_coordinate(&self, vertex: Self::VertexId) -> Result<Coordinate, Self::Error>;

    /// Gets the start and end vertices of the edge.
    fn edge_vertices(
        &self,
        edge: Self::EdgeId,
    ) -> Result<(Self::VertexId, Self::VertexId), Self::Error>;

    /// Gets the total length of the edge.
    fn edge_length(&self, edge: Self::EdgeId) -> Result<Length, Self::Error>;

    /// Gets the attribute tags of the edge.
    fn edge_tags(&self, edge: Self::EdgeId) -> Result<&Self::Tags, Self::Error>;

    /// Gets the polyline of the edge, from its start vertex to its end vertex.
    fn edge_geometry(&self, edge: Self::EdgeId) -> Result<Cow<'_, [Coordinate]>, Self::Error>;

    /// Gets all the edges connected to the vertex, regardless of their direction.
    /// Edges must be returned in a deterministic order.
    fn vertex_edges(
        &self,
        vertex: Self::VertexId,
    ) -> Result<impl Iterator<Item = Self::EdgeId>, Self::Error>;

    /// Gets an iterator over all the vertices that are within a max distance from the coordinate.
    /// For each vertex also returns the distance from the coordinate.
    /// Vertices must be returned sorted by their distance to the coordinate.
    fn vertices_within_distance(
        &self,
        coordinate: Coordinate,
        max_distance: Length,
    ) -> Result<impl Iterator<Item = (Self::VertexId, Length)>, Self::Error>;
}

/// Direction(s) in which an edge can be traversed, relative to its stored geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Traversal {
    #[default]
    None,
    Forward,
    Backward,
    Both,
}

impl Traversal {
    pub const fn allows(&self, forward: bool) -> bool {
        match self {
            Self::None => false,
            Self::Forward => forward,
            Self::Backward => !forward,
            Self::Both => true,
        }
    }
}

/// Vehicle (or other road user) the location refers to.
/// Interprets the edge tags of a [`RoadNetwork`].
pub trait VehicleProfile {
    type Tags: ?Sized;

    /// Direction(s) in which the vehicle can traverse an edge with the given tags.
    fn traversal(&self, tags: &Self::Tags) -> Traversal;

    /// Cost of traversing an edge, must be non-negative.
    fn weight(&self, length: Length, tags: &Self::Tags) -> f64;

    /// Rates in [0, 1] how well an edge matches the expected form of way and road class.
    fn match_arc(&self, tags: &Self::Tags, fow: Fow, frc: Frc) -> f64;

    /// Functional road class of an edge, None if the tags cannot be mapped.
    fn frc(&self, tags: &Self::Tags) -> Option<Frc>;

    /// Form of way of an edge, None if the tags cannot be mapped.
    fn fow(&self, tags: &Self::Tags) -> Option<Fow>;
}

/// Traversal of an edge in one direction.
/// Forward goes from the edge start vertex to its end vertex following the stored geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectedEdge<EdgeId> {
    pub id: EdgeId,
    pub forward: bool,
}

impl<EdgeId: Copy + PartialEq> DirectedEdge<EdgeId> {
    pub const fn forward(id: EdgeId) -> Self {
        Self { id, forward: true }
    }

    pub const fn backward(id: EdgeId) -> Self {
        Self { id, forward: false }
    }

    pub const fn reversed(&self) -> Self {
        Self {
            id: self.id,
            forward: !self.forward,
        }
    }

    /// Returns true if both traversals cover the same edge in opposite directions.
    pub fn is_opposite(&self, other: &Self) -> bool {
        self.id == other.id && self.forward != other.forward
    }

    pub fn start_vertex<G>(&self, graph: &G) -> Result<G::VertexId, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let (start, end) = graph.edge_vertices(self.id)?;
        Ok(if self.forward { start } else { end })
    }

    pub fn end_vertex<G>(&self, graph: &G) -> Result<G::VertexId, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let (start, end) = graph.edge_vertices(self.id)?;
        Ok(if self.forward { end } else { start })
    }

    /// Polyline of the edge in the direction of travel.
    pub fn geometry<G>(&self, graph: &G) -> Result<Vec<Coordinate>, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
    {
        let mut geometry = graph.edge_geometry(self.id)?.into_owned();
        if !self.forward {
            geometry.reverse();
        }
        Ok(geometry)
    }

    pub fn is_traversable<G, P>(&self, graph: &G, profile: &P) -> Result<bool, G::Error>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
        P: VehicleProfile<Tags = G::Tags>,
    {
        let tags = graph.edge_tags(self.id)?;
        Ok(profile.traversal(tags).allows(self.forward))
    }
}

/// Gets the traversable edges leaving the vertex.
pub fn exiting_edges<G, P>(
    graph: &G,
    profile: &P,
    vertex: G::VertexId,
) -> Result<Vec<DirectedEdge<G::EdgeId>>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    incident_edges(graph, profile, vertex, true)
}

/// Gets the traversable edges entering the vertex.
pub fn entering_edges<G, P>(
    graph: &G,
    profile: &P,
    vertex: G::VertexId,
) -> Result<Vec<DirectedEdge<G::EdgeId>>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    incident_edges(graph, profile, vertex, false)
}

fn incident_edges<G, P>(
    graph: &G,
    profile: &P,
    vertex: G::VertexId,
    exiting: bool,
) -> Result<Vec<DirectedEdge<G::EdgeId>>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let mut edges = vec![];

    for id in graph.vertex_edges(vertex)? {
        let (start, end) = graph.edge_vertices(id)?;
        let traversal = profile.traversal(graph.edge_tags(id)?);

        // a self loop both exits and enters the vertex in each direction
        for forward in [true, false] {
            let from = if forward { start } else { end };
            let to = if forward { end } else { start };
            let touches = if exiting { from == vertex } else { to == vertex };

            if touches && traversal.allows(forward) {
                edges.push(DirectedEdge { id, forward });
            }
        }
    }

    Ok(edges)
}

pub mod dijkstra;
pub mod path;

#[cfg(test)]
pub mod tests {
    #![allow(clippy::panic)]

    mod geojson;
    mod network;

    pub use geojson::GeojsonGraph;
    pub use network::{EdgeId, NETWORK_GRAPH, NetworkError, NetworkGraph, TestProfile, VertexId};
}
