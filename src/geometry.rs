use geo::{
    Bearing as _, Closest, Distance, Haversine, HaversineClosestPoint, InterpolatableLine,
    Length as _, LineString, Point, coord,
};

use crate::{Bearing, Coordinate, Length, SideOfRoad};

/// Points closer than this to a line are considered on the road.
const ON_ROAD_TOLERANCE: f64 = 0.5;

/// Closest point of a polyline to a given coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Distance from the start of the polyline to the projected point, following the polyline.
    pub distance_along: Length,
    /// Projected point.
    pub coordinate: Coordinate,
    /// Straight distance from the coordinate to the projected point.
    pub distance_to_line: Length,
    /// Side of the coordinate relative to the direction of the polyline.
    pub side: SideOfRoad,
}

pub fn distance(from: Coordinate, to: Coordinate) -> Length {
    Length::from_meters(Haversine.distance(Point::from(from), Point::from(to)))
}

pub fn polyline_length(coordinates: &[Coordinate]) -> Length {
    Length::from_meters(Haversine.length(&line_string(coordinates)))
}

/// Gets the coordinate at the given distance from the start of the polyline.
/// The distance is clamped within the polyline length.
pub fn point_along(coordinates: &[Coordinate], distance: Length) -> Option<Coordinate> {
    let geometry = line_string(coordinates);
    let length = Haversine.length(&geometry);

    if length <= 0.0 {
        return coordinates.first().copied();
    }

    let ratio = (distance.meters() / length).clamp(0.0, 1.0);
    geometry
        .point_at_ratio_from_start(&Haversine, ratio)
        .map(Coordinate::from)
}

/// Gets the bearing of the subsection A-B of the polyline, where A is at the given distance from
/// the start and B is at the given distance from A. The segment length can be negative, in which
/// case B comes before A.
pub fn bearing_along(
    coordinates: &[Coordinate],
    distance_from_start: Length,
    segment_length: Length,
) -> Option<Bearing> {
    let length = polyline_length(coordinates);
    let start = distance_from_start.clamp(Length::ZERO, length);
    let end = (start + segment_length).clamp(Length::ZERO, length);

    let a = point_along(coordinates, start)?;
    let b = point_along(coordinates, end)?;

    if a == b && start == end {
        return None;
    }

    let degrees = Haversine.bearing(Point::from(a), Point::from(b));
    Some(Bearing::from_compass_degrees(degrees))
}

/// Bearing of a polyline at its start (or at its end, looking backwards), sampled at the given
/// distance along the polyline.
pub fn sample_bearing(coordinates: &[Coordinate], distance: Length, at_end: bool) -> Option<Bearing> {
    if at_end {
        bearing_along(coordinates, polyline_length(coordinates), distance.reverse())
    } else {
        bearing_along(coordinates, Length::ZERO, distance)
    }
}

/// Projects the coordinate onto the closest segment of the polyline.
pub fn project(coordinates: &[Coordinate], coordinate: Coordinate) -> Option<Projection> {
    let point = Point::from(coordinate);
    let geometry = line_string(coordinates);

    let mut best: Option<Projection> = None;
    let mut distance_acc = 0.0;

    for line in geometry.lines() {
        let closest = match line.haversine_closest_point(&point) {
            Closest::SinglePoint(p) | Closest::Intersection(p) => p,
            Closest::Indeterminate => line.start_point(),
        };

        let distance_to_line = Haversine.distance(point, closest);

        if best.is_none_or(|best| distance_to_line < best.distance_to_line.meters()) {
            let distance_along = distance_acc + Haversine.distance(line.start_point(), closest);
            let side = if distance_to_line <= ON_ROAD_TOLERANCE {
                SideOfRoad::OnRoadOrUnknown
            } else {
                side_of_segment(line.start.into(), line.end.into(), coordinate)
            };

            best = Some(Projection {
                distance_along: Length::from_meters(distance_along),
                coordinate: closest.into(),
                distance_to_line: Length::from_meters(distance_to_line),
                side,
            });
        }

        distance_acc += Haversine.distance(line.start_point(), line.end_point());
    }

    best.or_else(|| {
        // single vertex polyline
        let first = *coordinates.first()?;
        Some(Projection {
            distance_along: Length::ZERO,
            coordinate: first,
            distance_to_line: distance(first, coordinate),
            side: SideOfRoad::OnRoadOrUnknown,
        })
    })
}

fn side_of_segment(start: Coordinate, end: Coordinate, coordinate: Coordinate) -> SideOfRoad {
    // local equirectangular frame: x to the east, y to the north
    let scale = start.lat.to_radians().cos();
    let (dx, dy) = ((end.lon - start.lon) * scale, end.lat - start.lat);
    let (px, py) = ((coordinate.lon - start.lon) * scale, coordinate.lat - start.lat);

    let cross = dx * py - dy * px;
    if cross > 0.0 {
        SideOfRoad::Left
    } else if cross < 0.0 {
        SideOfRoad::Right
    } else {
        SideOfRoad::OnRoadOrUnknown
    }
}

fn line_string(coordinates: &[Coordinate]) -> LineString {
    LineString::from_iter(
        coordinates
            .iter()
            .map(|coordinate| coord! { x: coordinate.lon, y: coordinate.lat }),
    )
}

impl From<geo::Coord> for Coordinate {
    fn from(coordinate: geo::Coord) -> Self {
        Self {
            lon: coordinate.x,
            lat: coordinate.y,
        }
    }
}
