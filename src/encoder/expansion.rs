use tracing::{debug, trace};

use crate::geometry::sample_bearing;
use crate::graph::path::Path;
use crate::location::MeasuredLine;
use crate::routing::{Search, SearchDirection, shortest_path};
use crate::{
    DirectedEdge, EncoderConfig, Fow, Length, RoadNetwork, ShortestPathConfig, Traversal,
    VehicleProfile,
};

/// Returns the line expanded by backward and forward paths so that the start and the end of the
/// location are in valid vertices.
///
/// Data format rules recommend to place location reference points on valid vertices.
/// Valid vertices are such vertices where a shortest-path calculation needs to decide between
/// several different ways. Invalid vertices, on the contrary, are such vertices where a shortest
/// path calculation can step over.
///
/// Since the start and end of a location will become a location reference point these vertices
/// need to be adjusted to valid vertices if necessary (expansion of location). The expansion shall
/// take rules into account so that the maximum distance between two location reference points will
/// not be exceeded.
///
/// The real start and end of the location are then referenced using the offsets, which grow by the
/// length of the expansions.
pub fn line_location_expansion<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &MeasuredLine<G::EdgeId>,
) -> Result<MeasuredLine<G::EdgeId>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let prefix = edge_backward_expansion(config, graph, profile, line)?;
    let postfix = edge_forward_expansion(config, graph, profile, line)?;

    let edges: Vec<_> = prefix
        .edges
        .iter()
        .chain(&line.edges)
        .chain(&postfix.edges)
        .copied()
        .collect();

    let lengths = prefix
        .edges
        .iter()
        .map(|edge| graph.edge_length(edge.id))
        .chain(line.lengths.iter().copied().map(Ok))
        .chain(postfix.edges.iter().map(|edge| graph.edge_length(edge.id)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MeasuredLine {
        edges,
        lengths,
        pos_offset: line.pos_offset + prefix.length,
        neg_offset: line.neg_offset + postfix.length,
    })
}

/// Returns the expansion path in backward direction (from the line start), in the direction of
/// travel. The path is empty if the start vertex is valid or cannot be expanded.
pub fn edge_backward_expansion<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &MeasuredLine<G::EdgeId>,
) -> Result<Path<G::EdgeId>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let Some(&first) = line.edges.first() else {
        return Ok(Path::default());
    };

    if is_vertex_valid(config, graph, profile, first.start_vertex(graph)?)? {
        return Ok(Path::default());
    }

    let expansion = resolve_expansion(
        config,
        graph,
        profile,
        line,
        first,
        line.pos_offset,
        SearchDirection::Backward,
    )?;

    debug!("Backward expansion of {first:?}: {expansion:?}");
    Ok(expansion)
}

/// Returns the expansion path in forward direction (from the line end), in the direction of
/// travel. The path is empty if the end vertex is valid or cannot be expanded.
pub fn edge_forward_expansion<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &MeasuredLine<G::EdgeId>,
) -> Result<Path<G::EdgeId>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let Some(&last) = line.edges.last() else {
        return Ok(Path::default());
    };

    if is_vertex_valid(config, graph, profile, last.end_vertex(graph)?)? {
        return Ok(Path::default());
    }

    let expansion = resolve_expansion(
        config,
        graph,
        profile,
        line,
        last,
        line.neg_offset,
        SearchDirection::Forward,
    )?;

    debug!("Forward expansion of {last:?}: {expansion:?}");
    Ok(expansion)
}

/// Searches outwards from the boundary edge of the line for the closest valid vertex.
///
/// A vertex is only accepted if the path from it to the boundary edge is the unique shortest path,
/// otherwise the decoder would not follow the expansion. Rejected vertices are excluded and the
/// search goes on, until the maximum LRP distance is exceeded.
fn resolve_expansion<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: &MeasuredLine<G::EdgeId>,
    origin: DirectedEdge<G::EdgeId>,
    offset: Length,
    direction: SearchDirection,
) -> Result<Path<G::EdgeId>, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let origin_length = graph.edge_length(origin.id)?;
    let search_config = ShortestPathConfig {
        max_length: config.max_lrp_distance,
        ..config.shortest_path
    };

    let mut search = Search::new(&search_config, graph, profile, origin, direction)?;
    for &edge in &line.edges {
        // the expansion must not form a loop with the location
        if edge != origin {
            search.exclude(edge);
        }
        search.exclude(edge.reversed());
    }

    while let Some(element) = search.next_settled()? {
        if element.edge == origin {
            continue;
        }

        let expansion_length = element.length - origin_length;
        if offset + expansion_length > config.max_lrp_distance {
            trace!("Expansion exceeds max LRP distance at {:?}", element.edge);
            break;
        }

        let vertex = match direction {
            SearchDirection::Backward => element.edge.start_vertex(graph)?,
            SearchDirection::Forward => element.edge.end_vertex(graph)?,
        };

        if !is_vertex_valid(config, graph, profile, vertex)? {
            continue;
        }

        let path = search.path_to(element.edge, element.length);
        let (source, target) = match direction {
            SearchDirection::Backward => (element.edge, origin),
            SearchDirection::Forward => (origin, element.edge),
        };

        let shortest = shortest_path(&config.shortest_path, graph, profile, source, target)?;
        if shortest.is_none_or(|shortest| shortest.edges != path.edges) {
            trace!("Expansion to {vertex:?} is not the shortest path");
            continue;
        }

        let edges = match direction {
            SearchDirection::Backward => path.edges[..path.edges.len() - 1].to_vec(),
            SearchDirection::Forward => path.edges[1..].to_vec(),
        };

        return Ok(Path {
            length: expansion_length,
            edges,
        });
    }

    Ok(Path::default())
}

/// Returns true if a vertex is valid and therefore the path starting/ending from/into this vertex
/// will not be further expanded.
///
/// A vertex is invalid if it looks like the split of a divided carriageway rather than a real
/// junction: it has exactly three usable edges (one bidirectional, one inbound one-way and one
/// outbound one-way) of the same functional road class, and the bearings of the one-way edges
/// (seen from the vertex) differ less than the configured threshold. Roundabouts are always valid.
pub fn is_vertex_valid<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    vertex: G::VertexId,
) -> Result<bool, G::Error>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    let mut edges = vec![];
    for edge in graph.vertex_edges(vertex)? {
        let tags = graph.edge_tags(edge)?;
        let traversal = profile.traversal(tags);
        if traversal != Traversal::None {
            edges.push((edge, tags, traversal));
        }
    }

    if edges.len() != 3 {
        return Ok(true);
    }

    if edges
        .iter()
        .any(|&(_, tags, _)| profile.fow(tags) == Some(Fow::Roundabout))
    {
        return Ok(true);
    }

    let frc = profile.frc(edges[0].1);
    if edges.iter().any(|&(_, tags, _)| profile.frc(tags) != frc) {
        return Ok(true);
    }

    let mut bidirectional = 0;
    let mut inbound = None;
    let mut outbound = None;

    for &(edge, _, traversal) in &edges {
        let (start, end) = graph.edge_vertices(edge)?;
        if start == end {
            return Ok(true);
        }

        // direction of the edge when leaving the vertex
        let leaving = DirectedEdge {
            id: edge,
            forward: start == vertex,
        };

        match traversal {
            Traversal::Both => bidirectional += 1,
            _ if traversal.allows(leaving.forward) => outbound = Some(leaving),
            _ => inbound = Some(leaving),
        }
    }

    let (Some(inbound), Some(outbound)) = (inbound, outbound) else {
        return Ok(true);
    };

    if bidirectional != 1 {
        return Ok(true);
    }

    let bearing = |edge: DirectedEdge<G::EdgeId>| -> Result<_, G::Error> {
        Ok(sample_bearing(
            &edge.geometry(graph)?,
            config.bearing_distance,
            false,
        ))
    };

    match (bearing(inbound)?, bearing(outbound)?) {
        (Some(inbound), Some(outbound)) => {
            let difference = inbound.difference(&outbound);
            trace!("Vertex {vertex:?} one-way bearing difference: {difference:?}");
            Ok(difference >= config.max_split_bearing_difference)
        }
        _ => Ok(true),
    }
}
