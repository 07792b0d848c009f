mod graph;

use approx::assert_relative_eq;
use openlr_match::{
    Component, Coordinate, DirectedEdge, EncodeError, EncoderConfig, Fow, Frc, Length, Location,
    LocationError, LocationType, Offset, Offsets, ReferencedLine, Traversal, VehicleProfile,
    encode_location, ensure_edges_are_valid, ensure_line_is_valid,
};
use test_log::test;

use crate::graph::{Car, EdgeId, Graph, GraphBuilder, GraphError, Tags};

/// Car that cannot map the form of way of unknown roads.
struct StrictCar;

impl VehicleProfile for StrictCar {
    type Tags = Tags;

    fn traversal(&self, tags: &Tags) -> Traversal {
        Car.traversal(tags)
    }

    fn weight(&self, length: Length, tags: &Tags) -> f64 {
        Car.weight(length, tags)
    }

    fn match_arc(&self, tags: &Tags, fow: Fow, frc: Frc) -> f64 {
        Car.match_arc(tags, fow, frc)
    }

    fn frc(&self, tags: &Tags) -> Option<Frc> {
        Car.frc(tags)
    }

    fn fow(&self, tags: &Tags) -> Option<Fow> {
        Some(tags.fow).filter(|&fow| fow != Fow::Undefined)
    }
}

fn square() -> (Graph, [EdgeId; 4]) {
    let tags = Tags::new(Frc::Frc5, Fow::SingleCarriageway, Traversal::Both);

    let mut builder = GraphBuilder::default();
    let a = builder.vertex(13.45, 52.51);
    let b = builder.vertex(13.451, 52.51);
    let c = builder.vertex(13.451, 52.511);
    let d = builder.vertex(13.45, 52.511);

    let ab = builder.edge(a, b, tags);
    let bc = builder.edge(b, c, tags);
    let cd = builder.edge(c, d, Tags::new(Frc::Frc5, Fow::Undefined, Traversal::Forward));
    let da = builder.edge(d, a, Tags::new(Frc::Frc5, Fow::Other, Traversal::None));

    (builder.build(), [ab, bc, cd, da])
}

#[test]
fn referenced_line_utilities_001() {
    let (graph, [ab, bc, cd, _]) = square();

    let line = ReferencedLine::new(
        vec![
            DirectedEdge::forward(ab),
            DirectedEdge::forward(bc),
            DirectedEdge::forward(cd),
        ],
        Offsets {
            pos: Offset::from_range(0.1),
            neg: Offset::from_range(0.2),
        },
    );

    let length = line.length(&graph).unwrap();
    let (pos, neg) = line.offset_lengths(&graph).unwrap();
    assert_relative_eq!(pos.meters(), 0.1 * length.meters(), epsilon = 1e-9);
    assert_relative_eq!(neg.meters(), 0.2 * length.meters(), epsilon = 1e-9);

    assert_eq!(line.vertices(&graph).unwrap().len(), 4);
    assert_eq!(line.coordinates(&graph).unwrap().len(), 4);
    assert!(!line.is_closed(&graph).unwrap());
}

#[test]
fn ensure_edges_are_valid_001() {
    let (graph, [ab, bc, cd, da]) = square();
    let validate = |edges: &[DirectedEdge<EdgeId>]| {
        match ensure_edges_are_valid(&graph, &StrictCar, edges) {
            Ok(()) => Ok(()),
            Err(EncodeError::InvalidLocation(error)) => Err(error),
            Err(error) => panic!("unexpected {error:?}"),
        }
    };

    assert_eq!(
        validate(&[DirectedEdge::forward(ab), DirectedEdge::forward(bc)]),
        Ok(())
    );
    assert_eq!(
        validate(&[DirectedEdge::forward(ab), DirectedEdge::backward(bc)]),
        Err(LocationError::NotConnected { index: 1 })
    );
    assert_eq!(
        validate(&[DirectedEdge::backward(cd)]),
        Err(LocationError::WrongDirection { index: 0 })
    );
    assert_eq!(
        validate(&[DirectedEdge::forward(bc), DirectedEdge::forward(cd)]),
        Err(LocationError::MissingAttributes { index: 1 })
    );
    assert_eq!(
        validate(&[DirectedEdge::forward(da)]),
        Err(LocationError::NotTraversable { index: 0 })
    );
    assert_eq!(validate(&[]), Err(LocationError::Empty));
}

#[test]
fn ensure_line_is_valid_offsets_001() {
    let (graph, [ab, bc, _, _]) = square();
    let edges = vec![DirectedEdge::forward(ab), DirectedEdge::forward(bc)];

    let offsets = Offsets {
        pos: Offset::from_range(0.5),
        neg: Offset::from_range(0.5),
    };
    let line = ReferencedLine::new(edges.clone(), offsets);

    assert_eq!(
        ensure_line_is_valid(&graph, &Car, &line),
        Err(EncodeError::InvalidLocation(LocationError::InvalidOffsets(
            offsets
        )))
    );

    let line = ReferencedLine::new(edges, Offsets::positive(Offset::from_range(0.99)));
    assert_eq!(ensure_line_is_valid(&graph, &Car, &line), Ok(()));
}

#[test]
fn referenced_line_coordinates_shape_points_001() {
    let tags = Tags::new(Frc::Frc5, Fow::SingleCarriageway, Traversal::Both);

    let mut builder = GraphBuilder::default();
    let a = builder.vertex(6.12, 49.6);
    let b = builder.vertex(6.121, 49.6);
    let c = builder.vertex(6.122, 49.6);
    let ab = builder.edge(a, b, tags);
    // digitized about 70 centimeters after the vertex
    let shape = Coordinate::new(6.12101, 49.6);
    let bc = builder.shaped_edge(b, c, tags, vec![shape, Coordinate::new(6.122, 49.6)]);
    let graph = builder.build();

    let line = ReferencedLine::new(
        vec![DirectedEdge::forward(ab), DirectedEdge::forward(bc)],
        Offsets::default(),
    );

    let coordinates = line.coordinates(&graph).unwrap();
    assert_eq!(coordinates.len(), 4);
    assert!(coordinates[1].is_identical(&Coordinate::new(6.121, 49.6)));
    assert!(coordinates[2].is_identical(&shape));
}

#[test]
fn ensure_edges_are_valid_graph_error_001() {
    let (graph, [ab, ..]) = square();
    let unknown = EdgeId(99);

    assert_eq!(
        ensure_edges_are_valid(
            &graph,
            &Car,
            &[DirectedEdge::forward(ab), DirectedEdge::forward(unknown)]
        ),
        Err(EncodeError::Graph {
            location: None,
            component: Component::Validation,
            edge: Some(1),
            source: GraphError::UnknownEdge(unknown),
        })
    );

    let line = ReferencedLine::new(
        vec![DirectedEdge::forward(ab), DirectedEdge::forward(unknown)],
        Offsets::default(),
    );
    let config = EncoderConfig::default();

    assert_eq!(
        encode_location(&config, &graph, &Car, Location::Line(line)),
        Err(EncodeError::Graph {
            location: Some(LocationType::Line),
            component: Component::Validation,
            edge: Some(1),
            source: GraphError::UnknownEdge(unknown),
        })
    );
}
