use std::io::{Cursor, Write};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use crate::binary::encoding::EncodedAttributes;
use crate::{
    Circle, ClosedLine, Coordinate, Grid, GridSize, Length, Line, LocationReference, LocationType,
    Offset, Poi, Point, PointAlongLine, Polygon, Rectangle, SerializeError,
};

/// Serializes an OpenLR Location Reference into Base64.
pub fn serialize_base64_openlr(location: &LocationReference) -> Result<String, SerializeError> {
    let data = serialize_binary_openlr(location)?;
    Ok(BASE64_STANDARD.encode(data))
}

/// Serializes an OpenLR Location Reference into binary.
pub fn serialize_binary_openlr(location: &LocationReference) -> Result<Vec<u8>, SerializeError> {
    use LocationReference::*;

    let mut writer = OpenLrBinaryWriter::default();
    writer.write_header(location.location_type())?;

    match location {
        Line(line) => writer.write_line(line)?,
        GeoCoordinate(coordinate) => writer.write_coordinate(*coordinate).map(|_| ())?,
        PointAlongLine(point) => writer.write_point_along_line(point).map(|_| ())?,
        Poi(poi) => writer.write_poi(poi)?,
        Circle(circle) => writer.write_circle(circle)?,
        Rectangle(rectangle) => writer.write_rectangle(rectangle)?,
        Grid(grid) => writer.write_grid(grid)?,
        Polygon(polygon) => writer.write_polygon(polygon)?,
        ClosedLine(line) => writer.write_closed_line(line)?,
    };

    Ok(writer.cursor.into_inner())
}

#[derive(Debug, Default)]
struct OpenLrBinaryWriter {
    cursor: Cursor<Vec<u8>>,
}

impl OpenLrBinaryWriter {
    fn write_header(&mut self, location_type: LocationType) -> Result<(), SerializeError> {
        const VERSION: u8 = 3;

        let location_type = match location_type {
            LocationType::Circle => 0,
            LocationType::Line => 1,
            LocationType::Polygon => 2,
            LocationType::GeoCoordinate => 4,
            LocationType::PoiWithAccessPoint | LocationType::PointAlongLine => 5,
            LocationType::Grid | LocationType::Rectangle => 8,
            LocationType::ClosedLine => 11,
        };

        self.cursor.write_all(&[VERSION + (location_type << 3)])?;
        Ok(())
    }

    fn write_line(&mut self, line: &Line) -> Result<(), SerializeError> {
        let Line { points, offsets } = line;
        let (Some(first_point), Some(last_point)) = (points.first(), points.last()) else {
            return Err(SerializeError::InvalidLine);
        };
        if points.len() < 2 {
            return Err(SerializeError::InvalidLine);
        }

        let mut coordinate = self.write_coordinate(first_point.coordinate)?;
        self.write_path_attributes(first_point)?;

        for point in line.intermediates() {
            coordinate = self.write_relative_coordinate(point.coordinate, coordinate)?;
            self.write_path_attributes(point)?;
        }

        self.write_relative_coordinate(last_point.coordinate, coordinate)?;
        let attributes = EncodedAttributes::from(last_point.line).with_offsets(offsets);
        self.write_attributes(attributes)?;

        if attributes.pos_offset_flag() {
            self.write_offset(offsets.pos)?;
        }
        if attributes.neg_offset_flag() {
            self.write_offset(offsets.neg)?;
        }

        Ok(())
    }

    /// Writes the point along line and returns the coordinate of its first point
    /// as it will be read back.
    fn write_point_along_line(
        &mut self,
        point: &PointAlongLine,
    ) -> Result<Coordinate, SerializeError> {
        let PointAlongLine {
            points: [first_point, last_point],
            offset,
            orientation,
            side,
        } = point;

        let first = self.write_coordinate(first_point.coordinate)?;
        let path = first_point.path.unwrap_or_default();
        let attributes = EncodedAttributes::from(first_point.line)
            .with_lfrcnp(path.lfrcnp)
            .with_orientation(*orientation);
        self.write_attributes(attributes)?;
        self.write_dnp(path.dnp)?;

        self.write_relative_coordinate(last_point.coordinate, first)?;
        let attributes = EncodedAttributes::from(last_point.line)
            .with_positive_offset(*offset)
            .with_side(*side);
        self.write_attributes(attributes)?;

        if attributes.pos_offset_flag() {
            self.write_offset(*offset)?;
        }

        Ok(first)
    }

    fn write_poi(&mut self, poi: &Poi) -> Result<(), SerializeError> {
        let Poi { point, coordinate } = poi;
        let first = self.write_point_along_line(point)?;
        self.write_relative_coordinate(*coordinate, first)?;
        Ok(())
    }

    fn write_circle(&mut self, circle: &Circle) -> Result<(), SerializeError> {
        let Circle { center, radius } = circle;
        self.write_coordinate(*center)?;
        self.write_radius(*radius)
    }

    fn write_rectangle(&mut self, rectangle: &Rectangle) -> Result<(), SerializeError> {
        let Rectangle {
            lower_left,
            upper_right,
        } = rectangle;

        if lower_left == upper_right {
            return Err(SerializeError::InvalidRectangle);
        }

        let lower_left = self.write_coordinate(*lower_left)?;

        // standard rectangle when the upper right corner fits the relative format
        match self.write_relative_coordinate(*upper_right, lower_left) {
            Ok(_) => Ok(()),
            Err(SerializeError::InvalidCoordinate(_)) => {
                self.write_coordinate(*upper_right).map(|_| ())
            }
            Err(error) => Err(error),
        }
    }

    fn write_grid(&mut self, grid: &Grid) -> Result<(), SerializeError> {
        let Grid { rect, size } = grid;
        self.write_rectangle(rect)?;
        self.write_grid_size(*size)
    }

    fn write_polygon(&mut self, polygon: &Polygon) -> Result<(), SerializeError> {
        let Polygon { corners } = polygon;
        let [first, relative_corners @ ..] = corners.as_slice() else {
            return Err(SerializeError::InvalidPolygon);
        };
        if corners.len() < 3 {
            return Err(SerializeError::InvalidPolygon);
        }

        let mut coordinate = self.write_coordinate(*first)?;
        for corner in relative_corners {
            coordinate = self.write_relative_coordinate(*corner, coordinate)?;
        }

        Ok(())
    }

    fn write_closed_line(&mut self, line: &ClosedLine) -> Result<(), SerializeError> {
        let ClosedLine { points, last_line } = line;
        let [first_point, relative_points @ ..] = points.as_slice() else {
            return Err(SerializeError::InvalidLine);
        };
        if relative_points.is_empty() {
            return Err(SerializeError::InvalidLine);
        }

        let mut coordinate = self.write_coordinate(first_point.coordinate)?;
        self.write_path_attributes(first_point)?;

        for point in relative_points {
            coordinate = self.write_relative_coordinate(point.coordinate, coordinate)?;
            self.write_path_attributes(point)?;
        }

        self.write_attributes(EncodedAttributes::from(*last_line))
    }

    /// Writes the attributes and the distance to next point of an LRP that is not the last one.
    fn write_path_attributes(&mut self, point: &Point) -> Result<(), SerializeError> {
        let path = point.path.unwrap_or_default();
        let attributes = EncodedAttributes::from(point.line).with_lfrcnp(path.lfrcnp);
        self.write_attributes(attributes)?;
        self.write_dnp(path.dnp)
    }

    /// Writes the absolute coordinate and returns it as it will be read back.
    fn write_coordinate(&mut self, coordinate: Coordinate) -> Result<Coordinate, SerializeError> {
        if !coordinate.is_valid() {
            return Err(SerializeError::InvalidCoordinate(coordinate));
        }

        let lon = Coordinate::degrees_into_be_bytes(coordinate.lon);
        let lat = Coordinate::degrees_into_be_bytes(coordinate.lat);
        self.cursor.write_all(&lon)?;
        self.cursor.write_all(&lat)?;

        Ok(Coordinate::new(
            Coordinate::degrees_from_be_bytes(lon),
            Coordinate::degrees_from_be_bytes(lat),
        ))
    }

    /// Writes the coordinate relative to the previous one (as read back) and returns
    /// it as it will be read back. Nothing is written if it doesn't fit the relative format.
    fn write_relative_coordinate(
        &mut self,
        coordinate: Coordinate,
        previous: Coordinate,
    ) -> Result<Coordinate, SerializeError> {
        if !coordinate.is_valid() {
            return Err(SerializeError::InvalidCoordinate(coordinate));
        }

        let lon = Coordinate::degrees_into_be_bytes_relative(coordinate.lon, previous.lon);
        let lat = Coordinate::degrees_into_be_bytes_relative(coordinate.lat, previous.lat);
        let (Some(lon), Some(lat)) = (lon, lat) else {
            return Err(SerializeError::InvalidCoordinate(coordinate));
        };

        self.cursor.write_all(&lon)?;
        self.cursor.write_all(&lat)?;

        Ok(Coordinate::new(
            Coordinate::degrees_from_be_bytes_relative(lon, previous.lon),
            Coordinate::degrees_from_be_bytes_relative(lat, previous.lat),
        ))
    }

    fn write_attributes(&mut self, attributes: EncodedAttributes) -> Result<(), SerializeError> {
        let fow = attributes.line.fow.value();
        let frc = attributes.line.frc.value();
        let bearing = attributes.line.bearing.try_into_byte()?;

        let first_byte = fow + (frc << 3) + (attributes.orientation_or_side << 6);
        let second_byte = bearing + (attributes.lfrcnp_or_flags << 5);
        self.cursor.write_all(&[first_byte, second_byte])?;
        Ok(())
    }

    fn write_dnp(&mut self, dnp: Length) -> Result<(), SerializeError> {
        let dnp = dnp.dnp_try_into_byte()?;
        self.cursor.write_all(&[dnp])?;
        Ok(())
    }

    fn write_radius(&mut self, radius: Length) -> Result<(), SerializeError> {
        let radius = radius.radius_try_into_be_bytes()?;
        self.cursor.write_all(&radius)?;
        Ok(())
    }

    fn write_offset(&mut self, offset: Offset) -> Result<(), SerializeError> {
        let offset = offset.try_into_byte()?;
        self.cursor.write_all(&[offset])?;
        Ok(())
    }

    fn write_grid_size(&mut self, size: GridSize) -> Result<(), SerializeError> {
        let size = size.try_into_be_bytes()?;
        self.cursor.write_all(&size)?;
        Ok(())
    }
}
