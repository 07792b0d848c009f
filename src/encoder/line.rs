use tracing::{debug, info};

use crate::encoder::expansion::line_location_expansion;
use crate::encoder::lrp::{LocRefPoint, LocRefPoints};
use crate::encoder::resolver::resolve_lrps;
use crate::error::Component;
use crate::location::MeasuredLine;
use crate::{
    ClosedLine, EncodeError, EncoderConfig, Line, LocationError, Offsets, ReferencedLine,
    RoadNetwork, SerializeError, VehicleProfile, ensure_edges_are_valid, ensure_line_is_valid,
};

pub fn encode_line<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: ReferencedLine<G::EdgeId>,
) -> Result<Line, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Encoding {line:?} with {config:?}");

    // Step – 1 Check validity of the location and offsets to be encoded
    ensure_line_is_valid(graph, profile, &line)?;
    let line = MeasuredLine::measure(graph, &line)
        .map_err(EncodeError::graph(Component::LineEncoder))?
        .trim()?;

    // Step – 2 Adjust start and end node of the location to represent valid map nodes
    let line = line_location_expansion(config, graph, profile, &line)
        .map_err(EncodeError::graph(Component::ValidityAdjustment))?;
    debug!("Expanded line {:?}", line.edges);

    // Step – 3..8 Determine the location reference points and their attributes
    let LocRefPoints { lrps, offsets } = resolve_lrps(config, graph, profile, &line)?;

    Ok(Line {
        points: lrps.into_iter().map(|lrp| lrp.point).collect(),
        offsets,
    })
}

/// Encodes a line that ends at the vertex it starts from.
///
/// Closed lines are neither expanded nor trimmed, and need at least two LRPs besides the closing
/// one: a location covered by a single shortest path is split in the middle.
pub fn encode_closed_line<G, P>(
    config: &EncoderConfig,
    graph: &G,
    profile: &P,
    line: ReferencedLine<G::EdgeId>,
) -> Result<ClosedLine, EncodeError<G::Error>>
where
    G: RoadNetwork,
    P: VehicleProfile<Tags = G::Tags>,
{
    info!("Encoding closed {line:?} with {config:?}");

    ensure_edges_are_valid(graph, profile, &line.edges)?;

    let is_closed = line
        .is_closed(graph)
        .map_err(EncodeError::graph(Component::Validation))?;
    if !is_closed {
        return Err(LocationError::NotConnected { index: 0 }.into());
    }

    let line = ReferencedLine::new(line.edges, Offsets::default());
    let line = MeasuredLine::measure(graph, &line)
        .map_err(EncodeError::graph(Component::LineEncoder))?;

    let LocRefPoints { mut lrps, .. } = resolve_lrps(config, graph, profile, &line)?;

    if lrps.len() == 2 {
        let middle = line.edges.len() / 2;
        if middle == 0 {
            return Err(SerializeError::InvalidLine.into());
        }

        let last = lrps.split_off(1);
        lrps = vec![
            LocRefPoint::from_edges(config, graph, profile, line.edges[..middle].to_vec(), 0)?,
            LocRefPoint::from_edges(
                config,
                graph,
                profile,
                line.edges[middle..].to_vec(),
                middle,
            )?,
        ];
        lrps.extend(last);
    }

    let Some(last) = lrps.pop() else {
        return Err(LocationError::Empty.into());
    };

    Ok(ClosedLine {
        points: lrps.into_iter().map(|lrp| lrp.point).collect(),
        last_line: last.point.line,
    })
}
