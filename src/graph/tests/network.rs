use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use geo::{Distance, Haversine, Point};
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use thiserror::Error;

use crate::graph::tests::geojson::{GEOJSON_GRAPH, GeojsonGraph};
use crate::{Coordinate, Fow, Frc, Length, RoadNetwork, Traversal, VehicleProfile};

pub static NETWORK_GRAPH: LazyLock<NetworkGraph> =
    LazyLock::new(|| NetworkGraph::from_geojson_graph(&GEOJSON_GRAPH));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum NetworkError {
    #[error("unknown vertex {0:?}")]
    UnknownVertex(VertexId),
    #[error("unknown edge {0:?}")]
    UnknownEdge(EdgeId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTags {
    pub frc: Frc,
    pub fow: Fow,
    pub traversal: Traversal,
}

pub struct NetworkGraph {
    vertices: HashMap<VertexId, Vertex>,
    edges: HashMap<EdgeId, EdgeProperties>,
    geospatial_nodes: RTree<GeospatialNode>,
}

struct Vertex {
    coordinate: Coordinate,
    edges: Vec<EdgeId>,
}

struct EdgeProperties {
    length: Length,
    tags: EdgeTags,
    geometry: Vec<Coordinate>,
    vertices: (VertexId, VertexId),
}

#[derive(Debug)]
struct GeospatialNode {
    vertex: VertexId,
    coordinate: Coordinate,
}

impl RTreeObject for GeospatialNode {
    type Envelope = AABB<Point>;
    fn envelope(&self) -> Self::Envelope {
        Point::from(self.coordinate).envelope()
    }
}

impl PointDistance for GeospatialNode {
    fn distance_2(&self, destination: &Point) -> f64 {
        let origin = Point::from(self.coordinate);
        Haversine.distance(origin, *destination).powf(2.0)
    }
}

impl RoadNetwork for NetworkGraph {
    type VertexId = VertexId;
    type EdgeId = EdgeId;
    type Tags = EdgeTags;
    type Error = NetworkError;

    fn vertex_coordinate(&self, vertex: VertexId) -> Result<Coordinate, NetworkError> {
        self.vertices
            .get(&vertex)
            .map(|vertex| vertex.coordinate)
            .ok_or(NetworkError::UnknownVertex(vertex))
    }

    fn edge_vertices(&self, edge: EdgeId) -> Result<(VertexId, VertexId), NetworkError> {
        self.edge(edge).map(|properties| properties.vertices)
    }

    fn edge_length(&self, edge: EdgeId) -> Result<Length, NetworkError> {
        self.edge(edge).map(|properties| properties.length)
    }

    fn edge_tags(&self, edge: EdgeId) -> Result<&EdgeTags, NetworkError> {
        self.edge(edge).map(|properties| &properties.tags)
    }

    fn edge_geometry(&self, edge: EdgeId) -> Result<Cow<'_, [Coordinate]>, NetworkError> {
        self.edge(edge)
            .map(|properties| Cow::Borrowed(properties.geometry.as_slice()))
    }

    fn vertex_edges(
        &self,
        vertex: VertexId,
    ) -> Result<impl Iterator<Item = EdgeId>, NetworkError> {
        self.vertices
            .get(&vertex)
            .map(|vertex| vertex.edges.iter().copied())
            .ok_or(NetworkError::UnknownVertex(vertex))
    }

    fn vertices_within_distance(
        &self,
        coordinate: Coordinate,
        max_distance: Length,
    ) -> Result<impl Iterator<Item = (VertexId, Length)>, NetworkError> {
        let max_distance_2 = max_distance.meters() * max_distance.meters();
        let point = Point::from(coordinate);

        let vertices = self
            .geospatial_nodes
            .nearest_neighbor_iter_with_distance_2(&point)
            .take_while(move |(_, distance_2)| *distance_2 <= max_distance_2)
            .map(|(node, distance_2)| (node.vertex, Length::from_meters(distance_2.sqrt())));

        Ok(vertices)
    }
}

impl NetworkGraph {
    fn edge(&self, edge: EdgeId) -> Result<&EdgeProperties, NetworkError> {
        self.edges.get(&edge).ok_or(NetworkError::UnknownEdge(edge))
    }

    pub fn from_geojson_graph(graph: &GeojsonGraph) -> NetworkGraph {
        let mut vertices: HashMap<VertexId, Vertex> = graph
            .nodes
            .iter()
            .map(|(&id, &coordinate)| {
                let vertex = Vertex {
                    coordinate,
                    edges: vec![],
                };
                (VertexId(id), vertex)
            })
            .collect();

        let mut edges = HashMap::new();

        for (&id, line) in &graph.lines {
            let start = VertexId(line.start_node_id);
            let end = VertexId(line.end_node_id);

            vertices.get_mut(&start).unwrap().edges.push(EdgeId(id));
            if start != end {
                vertices.get_mut(&end).unwrap().edges.push(EdgeId(id));
            }

            let properties = EdgeProperties {
                length: line.length,
                tags: EdgeTags {
                    frc: line.frc,
                    fow: line.fow,
                    traversal: line.traversal,
                },
                geometry: line.geometry.clone(),
                vertices: (start, end),
            };
            edges.insert(EdgeId(id), properties);
        }

        // edges returned in a deterministic order
        for vertex in vertices.values_mut() {
            vertex.edges.sort();
        }

        let geospatial_nodes = vertices
            .iter()
            .map(|(&vertex, properties)| GeospatialNode {
                vertex,
                coordinate: properties.coordinate,
            })
            .collect();

        NetworkGraph {
            vertices,
            edges,
            geospatial_nodes: RTree::bulk_load(geospatial_nodes),
        }
    }
}

/// Car profile over the fixture tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestProfile;

impl VehicleProfile for TestProfile {
    type Tags = EdgeTags;

    fn traversal(&self, tags: &EdgeTags) -> Traversal {
        tags.traversal
    }

    fn weight(&self, length: Length, _: &EdgeTags) -> f64 {
        length.meters()
    }

    fn match_arc(&self, tags: &EdgeTags, fow: Fow, frc: Frc) -> f64 {
        let frc_score = 1.0 - 0.25 * tags.frc.value().abs_diff(frc.value()) as f64;
        let fow_score = if tags.fow == fow { 1.0 } else { 0.5 };
        frc_score.max(0.0) * fow_score
    }

    fn frc(&self, tags: &EdgeTags) -> Option<Frc> {
        Some(tags.frc)
    }

    fn fow(&self, tags: &EdgeTags) -> Option<Fow> {
        Some(tags.fow)
    }
}

#[test]
fn network_graph_vertices_within_distance() {
    let graph = &NETWORK_GRAPH;

    let vertices: Vec<_> = graph
        .vertices_within_distance(Coordinate::new(6.1201, 49.6), Length::from_meters(80.0))
        .unwrap()
        .map(|(vertex, _)| vertex)
        .collect();
    assert_eq!(vertices, vec![VertexId(1), VertexId(2)]);

    let vertices: Vec<_> = graph
        .vertices_within_distance(Coordinate::new(6.0, 49.0), Length::from_meters(100.0))
        .unwrap()
        .collect();
    assert!(vertices.is_empty());
}

#[test]
fn network_graph_unknown_ids() {
    let graph = &NETWORK_GRAPH;

    assert_eq!(
        graph.edge_length(EdgeId(999)).unwrap_err(),
        NetworkError::UnknownEdge(EdgeId(999))
    );
    assert_eq!(
        graph.vertex_coordinate(VertexId(999)).unwrap_err(),
        NetworkError::UnknownVertex(VertexId(999))
    );
}

#[test]
fn network_graph_vertex_edges() {
    let graph = &NETWORK_GRAPH;

    let edges: Vec<_> = graph.vertex_edges(VertexId(2)).unwrap().collect();
    assert_eq!(edges, vec![EdgeId(1), EdgeId(2), EdgeId(8)]);

    let edges: Vec<_> = graph.vertex_edges(VertexId(9)).unwrap().collect();
    assert_eq!(edges, vec![EdgeId(11), EdgeId(12), EdgeId(13)]);
}
