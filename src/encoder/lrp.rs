use crate::error::Component;
use crate::geometry::sample_bearing;
use crate::graph::path::path_length;
use crate::{
    DirectedEdge, EncodeError, EncoderConfig, Frc, LineAttributes, LocationError, Offsets,
    PathAttributes, Point, RoadNetwork, VehicleProfile,
};

/// Location reference point and the edges it covers up to the next point.
#[derive(Debug, Clone, PartialEq)]
pub struct LocRefPoint<EdgeId> {
    /// Path from this LRP to the next one, empty for the last LRP.
    pub edges: Vec<DirectedEdge<EdgeId>>,
    pub point: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocRefPoints<EdgeId> {
    pub lrps: Vec<LocRefPoint<EdgeId>>,
    pub offsets: Offsets,
}

impl<EdgeId: Copy + PartialEq> LocRefPoint<EdgeId> {
    /// Creates the LRP at the start vertex of the first edge, with the path attributes of all
    /// the edges up to the next LRP.
    ///
    /// `index` is the position of the first edge in the location, to report missing attributes.
    pub fn from_edges<G, P>(
        config: &EncoderConfig,
        graph: &G,
        profile: &P,
        edges: Vec<DirectedEdge<EdgeId>>,
        index: usize,
    ) -> Result<Self, EncodeError<G::Error>>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
        P: VehicleProfile<Tags = G::Tags>,
    {
        let Some(&first) = edges.first() else {
            return Err(LocationError::Empty.into());
        };

        let coordinate = first
            .start_vertex(graph)
            .and_then(|vertex| graph.vertex_coordinate(vertex))
            .map_err(EncodeError::graph_at_edge(Component::AttributeExtraction, index))?;
        let line = line_attributes(config, graph, profile, first, false, index)?;

        let mut lfrcnp = Frc::Frc0;
        for (offset, edge) in edges.iter().enumerate() {
            let tags = graph.edge_tags(edge.id).map_err(EncodeError::graph_at_edge(
                Component::AttributeExtraction,
                index + offset,
            ))?;
            let frc = profile.frc(tags).ok_or(LocationError::MissingAttributes {
                index: index + offset,
            })?;
            lfrcnp = lfrcnp.max(frc);
        }

        let dnp = path_length(graph, &edges)
            .map_err(EncodeError::graph_at_edge(Component::AttributeExtraction, index))?;

        Ok(Self {
            edges,
            point: Point {
                coordinate,
                line,
                path: Some(PathAttributes { lfrcnp, dnp }),
            },
        })
    }

    /// Creates the last LRP at the end vertex of the last edge, its bearing looks backwards
    /// along the edge.
    pub fn from_last_edge<G, P>(
        config: &EncoderConfig,
        graph: &G,
        profile: &P,
        last: DirectedEdge<EdgeId>,
        index: usize,
    ) -> Result<Self, EncodeError<G::Error>>
    where
        G: RoadNetwork<EdgeId = EdgeId>,
        P: VehicleProfile<Tags = G::Tags>,
    {
        let coordinate = last
            .end_vertex(graph)
            .and_then(|vertex| graph.vertex_coordinate(vertex))
            .map_err(EncodeError::graph_at_edge(Component::AttributeExtraction, index))?;
        let line = line_attributes(config, graph, profile, last, true, index)?;

        Ok(Self {
            edges: vec![],
            point: Point {
                coordinate,
                line,
                path: None,
            },
        })
    }
}

fn line_attributes<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    edge: DirectedEdge<G::EdgeId>,
    at_end: bool,
    index: usize,
) -> Result<LineAttributes, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let tags = graph
        .edge_tags(edge.id)
        .map_err(EncodeError::graph_at_edge(Component::AttributeExtraction, index))?;

    let (Some(frc), Some(fow)) = (profile.frc(tags), profile.fow(tags)) else {
        return Err(LocationError::MissingAttributes { index }.into());
    };

    let geometry = edge
        .geometry(graph)
        .map_err(EncodeError::graph_at_edge(Component::AttributeExtraction, index))?;
    let bearing = sample_bearing(&geometry, config.bearing_distance, at_end).unwrap_or_default();

    Ok(LineAttributes { frc, fow, bearing })
}
