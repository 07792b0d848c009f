//! In-memory road network built edge by edge, with a car profile over plain tags.

#![allow(dead_code)]

use std::borrow::Cow;

use geo::{Distance, Haversine, Point};
use openlr_match::{Coordinate, Fow, Frc, Length, RoadNetwork, Traversal, VehicleProfile};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GraphError {
    #[error("unknown vertex {0:?}")]
    UnknownVertex(VertexId),
    #[error("unknown edge {0:?}")]
    UnknownEdge(EdgeId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tags {
    pub frc: Frc,
    pub fow: Fow,
    pub traversal: Traversal,
}

impl Tags {
    pub const fn new(frc: Frc, fow: Fow, traversal: Traversal) -> Self {
        Self {
            frc,
            fow,
            traversal,
        }
    }
}

struct Vertex {
    coordinate: Coordinate,
    edges: Vec<EdgeId>,
}

struct Edge {
    vertices: (VertexId, VertexId),
    length: Length,
    tags: Tags,
    geometry: Vec<Coordinate>,
}

struct IndexedVertex {
    vertex: VertexId,
    coordinate: Coordinate,
}

impl RTreeObject for IndexedVertex {
    type Envelope = AABB<Point>;
    fn envelope(&self) -> Self::Envelope {
        Point::from(self.coordinate).envelope()
    }
}

impl PointDistance for IndexedVertex {
    fn distance_2(&self, destination: &Point) -> f64 {
        Haversine
            .distance(Point::from(self.coordinate), *destination)
            .powi(2)
    }
}

#[derive(Default)]
pub struct GraphBuilder {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn vertex(&mut self, lon: f64, lat: f64) -> VertexId {
        self.vertices.push(Vertex {
            coordinate: Coordinate::new(lon, lat),
            edges: vec![],
        });
        VertexId(self.vertices.len() - 1)
    }

    /// Adds a straight edge, its length is the distance between its vertices.
    pub fn edge(&mut self, start: VertexId, end: VertexId, tags: Tags) -> EdgeId {
        let geometry = vec![
            self.vertices[start.0].coordinate,
            self.vertices[end.0].coordinate,
        ];
        self.shaped_edge(start, end, tags, geometry)
    }

    /// Adds an edge with its own geometry, which does not need to start or end exactly at the
    /// vertices. Its length is the length of the geometry.
    pub fn shaped_edge(
        &mut self,
        start: VertexId,
        end: VertexId,
        tags: Tags,
        geometry: Vec<Coordinate>,
    ) -> EdgeId {
        let length = geometry
            .windows(2)
            .map(|pair| Haversine.distance(Point::from(pair[0]), Point::from(pair[1])))
            .sum();

        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            vertices: (start, end),
            length: Length::from_meters(length),
            tags,
            geometry,
        });

        self.vertices[start.0].edges.push(id);
        if start != end {
            self.vertices[end.0].edges.push(id);
        }

        id
    }

    pub fn build(self) -> Graph {
        let index = self
            .vertices
            .iter()
            .enumerate()
            .map(|(id, vertex)| IndexedVertex {
                vertex: VertexId(id),
                coordinate: vertex.coordinate,
            })
            .collect();

        Graph {
            vertices: self.vertices,
            edges: self.edges,
            index: RTree::bulk_load(index),
        }
    }
}

pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    index: RTree<IndexedVertex>,
}

impl Graph {
    fn edge(&self, edge: EdgeId) -> Result<&Edge, GraphError> {
        self.edges.get(edge.0).ok_or(GraphError::UnknownEdge(edge))
    }

    fn vertex(&self, vertex: VertexId) -> Result<&Vertex, GraphError> {
        self.vertices
            .get(vertex.0)
            .ok_or(GraphError::UnknownVertex(vertex))
    }
}

impl RoadNetwork for Graph {
    type VertexId = VertexId;
    type EdgeId = EdgeId;
    type Tags = Tags;
    type Error = GraphError;

    fn vertex_coordinate(&self, vertex: VertexId) -> Result<Coordinate, GraphError> {
        self.vertex(vertex).map(|vertex| vertex.coordinate)
    }

    fn edge_vertices(&self, edge: EdgeId) -> Result<(VertexId, VertexId), GraphError> {
        self.edge(edge).map(|edge| edge.vertices)
    }

    fn edge_length(&self, edge: EdgeId) -> Result<Length, GraphError> {
        self.edge(edge).map(|edge| edge.length)
    }

    fn edge_tags(&self, edge: EdgeId) -> Result<&Tags, GraphError> {
        self.edge(edge).map(|edge| &edge.tags)
    }

    fn edge_geometry(&self, edge: EdgeId) -> Result<Cow<'_, [Coordinate]>, GraphError> {
        self.edge(edge)
            .map(|edge| Cow::Borrowed(edge.geometry.as_slice()))
    }

    fn vertex_edges(&self, vertex: VertexId) -> Result<impl Iterator<Item = EdgeId>, GraphError> {
        self.vertex(vertex).map(|vertex| vertex.edges.iter().copied())
    }

    fn vertices_within_distance(
        &self,
        coordinate: Coordinate,
        max_distance: Length,
    ) -> Result<impl Iterator<Item = (VertexId, Length)>, GraphError> {
        let max_distance_2 = max_distance.meters().powi(2);

        let vertices = self
            .index
            .nearest_neighbor_iter_with_distance_2(&Point::from(coordinate))
            .take_while(move |(_, distance_2)| *distance_2 <= max_distance_2)
            .map(|(vertex, distance_2)| (vertex.vertex, Length::from_meters(distance_2.sqrt())));

        Ok(vertices)
    }
}

/// Car profile: edges are weighted by their length, attributes are compared exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Car;

impl VehicleProfile for Car {
    type Tags = Tags;

    fn traversal(&self, tags: &Tags) -> Traversal {
        tags.traversal
    }

    fn weight(&self, length: Length, _: &Tags) -> f64 {
        length.meters()
    }

    fn match_arc(&self, tags: &Tags, fow: Fow, frc: Frc) -> f64 {
        let frc_score = 1.0 - 0.25 * tags.frc.value().abs_diff(frc.value()) as f64;
        let fow_score = if tags.fow == fow { 1.0 } else { 0.5 };
        frc_score.max(0.0) * fow_score
    }

    fn frc(&self, tags: &Tags) -> Option<Frc> {
        Some(tags.frc)
    }

    fn fow(&self, tags: &Tags) -> Option<Fow> {
        Some(tags.fow)
    }
}
