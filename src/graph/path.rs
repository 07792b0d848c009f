use tracing::debug;

use crate::{DirectedEdge, Length, RoadNetwork};

#[derive(Debug, Clone, PartialEq)]
pub struct Path<EdgeId> {
    pub length: Length,
    pub edges: Vec<DirectedEdge<EdgeId>>,
}

impl<EdgeId> Default for Path<EdgeId> {
    fn default() -> Self {
        Self {
            length: Length::ZERO,
            edges: vec![],
        }
    }
}

impl<EdgeId: Copy> Path<EdgeId> {
    pub fn first(&self) -> Option<DirectedEdge<EdgeId>> {
        self.edges.first().copied()
    }

    pub fn last(&self) -> Option<DirectedEdge<EdgeId>> {
        self.edges.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Returns the total length of the edges.
pub fn path_length<G: RoadNetwork>(
    graph: &G,
    edges: &[DirectedEdge<G::EdgeId>],
) -> Result<Length, G::Error> {
    edges.iter().map(|edge| graph.edge_length(edge.id)).sum()
}

/// Returns the index of the first edge that doesn't start where the previous edge ends.
pub fn find_disconnection<G: RoadNetwork>(
    graph: &G,
    edges: &[DirectedEdge<G::EdgeId>],
) -> Result<Option<usize>, G::Error> {
    for (index, window) in edges.windows(2).enumerate() {
        let [e1, e2] = [window[0], window[1]];

        if e1.end_vertex(graph)? != e2.start_vertex(graph)? {
            debug!("Path disconnected between {e1:?} and {e2:?}");
            return Ok(Some(index + 1));
        }
    }

    Ok(None)
}

/// Returns true only if all the edges of the path are sequentially connected in the given graph.
pub fn is_path_connected<G: RoadNetwork>(
    graph: &G,
    edges: &[DirectedEdge<G::EdgeId>],
) -> Result<bool, G::Error> {
    Ok(find_disconnection(graph, edges)?.is_none())
}

/// Gets the vertices visited by the path, in order.
pub fn path_vertices<G: RoadNetwork>(
    graph: &G,
    edges: &[DirectedEdge<G::EdgeId>],
) -> Result<Vec<G::VertexId>, G::Error> {
    let mut vertices = Vec::with_capacity(edges.len() + 1);

    if let Some(first) = edges.first() {
        vertices.push(first.start_vertex(graph)?);
    }

    for edge in edges {
        vertices.push(edge.end_vertex(graph)?);
    }

    Ok(vertices)
}
