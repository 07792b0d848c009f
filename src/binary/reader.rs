use std::io::{Cursor, ErrorKind, Read};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use crate::binary::encoding::EncodedAttributes;
use crate::{
    Bearing, Circle, ClosedLine, Coordinate, DeserializeError, Fow, Frc, Grid, GridSize, Length,
    Line, LineAttributes, LocationReference, LocationType, Offset, PathAttributes, Poi, Point,
    PointAlongLine, Polygon, Rectangle,
};

/// Deserializes an OpenLR Location Reference encoded in Base64.
pub fn deserialize_base64_openlr(
    data: impl AsRef<[u8]>,
) -> Result<LocationReference, DeserializeError> {
    let data = BASE64_STANDARD.decode(data)?;
    deserialize_binary_openlr(&data)
}

/// Deserializes a binary representation of an OpenLR Location Reference.
///
/// The data length is checked against the location type of the header before
/// any of the location is read, and trailing bytes are rejected.
pub fn deserialize_binary_openlr(data: &[u8]) -> Result<LocationReference, DeserializeError> {
    use LocationReference::*;

    let mut reader = OpenLrBinaryReader::new(data);
    let location_type = reader.read_header()?;
    let invalid_length = DeserializeError::InvalidLength(location_type, data.len());

    if !is_valid_length(location_type, data.len()) {
        return Err(invalid_length);
    }

    let location = match location_type {
        LocationType::Line => reader.read_line().map(Line),
        LocationType::GeoCoordinate => reader.read_coordinate().map(GeoCoordinate),
        LocationType::PointAlongLine => reader.read_point_along_line().map(PointAlongLine),
        LocationType::PoiWithAccessPoint => reader.read_poi().map(Poi),
        LocationType::Circle => reader.read_circle().map(Circle),
        LocationType::Rectangle => reader.read_rectangle().map(Rectangle),
        LocationType::Grid => reader.read_grid().map(Grid),
        LocationType::Polygon => reader.read_polygon().map(Polygon),
        LocationType::ClosedLine => reader.read_closed_line().map(ClosedLine),
    };

    let location = location.map_err(|error| match error {
        DeserializeError::IO(ErrorKind::UnexpectedEof) => invalid_length,
        error => error,
    })?;

    if !reader.is_consumed() {
        return Err(invalid_length);
    }

    Ok(location)
}

/// Returns true if the physical format allows a location of the given type with this length.
fn is_valid_length(location_type: LocationType, len: usize) -> bool {
    match location_type {
        LocationType::Line => len >= 16 && (len - 16) % 7 <= 2,
        LocationType::GeoCoordinate => len == 7,
        LocationType::PointAlongLine => matches!(len, 16 | 17),
        LocationType::PoiWithAccessPoint => matches!(len, 20 | 21),
        LocationType::Circle => (8..=11).contains(&len),
        LocationType::Rectangle => matches!(len, 11 | 13),
        LocationType::Grid => matches!(len, 15 | 17),
        LocationType::Polygon => len >= 15 && (len - 7) % 4 == 0,
        LocationType::ClosedLine => len >= 19 && (len - 12) % 7 == 0,
    }
}

#[derive(Debug)]
struct OpenLrBinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> OpenLrBinaryReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    const fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    fn is_consumed(&self) -> bool {
        self.cursor.position() as usize == self.len()
    }

    fn read_header(&mut self) -> Result<LocationType, DeserializeError> {
        let mut header = [0u8; 1];
        self.cursor.read_exact(&mut header)?;
        let header = header[0];

        let version = header & 0b111;
        if version != 3 {
            return Err(DeserializeError::VersionNotSupported(version));
        }

        let location_type = match (header >> 3) & 0b1111 {
            0 => LocationType::Circle,
            1 => LocationType::Line,
            2 => LocationType::Polygon,
            4 => LocationType::GeoCoordinate,
            5 if self.len() > 17 => LocationType::PoiWithAccessPoint,
            5 => LocationType::PointAlongLine,
            8 if self.len() > 13 => LocationType::Grid,
            8 => LocationType::Rectangle,
            11 => LocationType::ClosedLine,
            _ => return Err(DeserializeError::InvalidHeader(header)),
        };

        Ok(location_type)
    }

    fn read_line(&mut self) -> Result<Line, DeserializeError> {
        let relative_points_count = (self.len() - 9) / 7;
        let mut line = Line::with_capacity(1 + relative_points_count);

        let mut coordinate = self.read_coordinate()?;
        let mut attributes = self.read_attributes()?;

        for _ in 0..relative_points_count {
            line.points.push(self.read_path_point(coordinate, &attributes)?);
            coordinate = self.read_relative_coordinate(coordinate)?;
            attributes = self.read_attributes()?;
        }

        line.points.push(Point {
            coordinate,
            line: attributes.line,
            path: None,
        });

        if attributes.pos_offset_flag() {
            line.offsets.pos = self.read_offset()?;
        }
        if attributes.neg_offset_flag() {
            line.offsets.neg = self.read_offset()?;
        }

        Ok(line)
    }

    fn read_closed_line(&mut self) -> Result<ClosedLine, DeserializeError> {
        let relative_points_count = (self.len() - 12) / 7;
        let mut line = ClosedLine::with_capacity(1 + relative_points_count);

        let mut coordinate = self.read_coordinate()?;
        let attributes = self.read_attributes()?;
        line.points.push(self.read_path_point(coordinate, &attributes)?);

        for _ in 0..relative_points_count {
            coordinate = self.read_relative_coordinate(coordinate)?;
            let attributes = self.read_attributes()?;
            line.points.push(self.read_path_point(coordinate, &attributes)?);
        }

        line.last_line = self.read_attributes()?.line;

        Ok(line)
    }

    fn read_point_along_line(&mut self) -> Result<PointAlongLine, DeserializeError> {
        let coordinate = self.read_coordinate()?;
        let attributes = self.read_attributes()?;
        let orientation = attributes.orientation()?;
        let first = self.read_path_point(coordinate, &attributes)?;

        let coordinate = self.read_relative_coordinate(coordinate)?;
        let attributes = self.read_attributes()?;
        let side = attributes.side()?;
        let last = Point {
            coordinate,
            line: attributes.line,
            path: None,
        };

        let offset = if attributes.pos_offset_flag() {
            self.read_offset()?
        } else {
            Offset::default()
        };

        Ok(PointAlongLine {
            points: [first, last],
            offset,
            orientation,
            side,
        })
    }

    fn read_poi(&mut self) -> Result<Poi, DeserializeError> {
        let point = self.read_point_along_line()?;
        let coordinate = self.read_relative_coordinate(point.points[0].coordinate)?;
        Ok(Poi { point, coordinate })
    }

    fn read_circle(&mut self) -> Result<Circle, DeserializeError> {
        let center = self.read_coordinate()?;
        let radius = self.read_radius()?;
        Ok(Circle { center, radius })
    }

    fn read_rectangle(&mut self) -> Result<Rectangle, DeserializeError> {
        let lower_left = self.read_coordinate()?;

        let upper_right = if self.len() > 11 {
            self.read_coordinate()?
        } else {
            self.read_relative_coordinate(lower_left)?
        };

        Ok(Rectangle {
            lower_left,
            upper_right,
        })
    }

    fn read_grid(&mut self) -> Result<Grid, DeserializeError> {
        let lower_left = self.read_coordinate()?;

        let upper_right = if self.len() > 15 {
            self.read_coordinate()?
        } else {
            self.read_relative_coordinate(lower_left)?
        };

        let rect = Rectangle {
            lower_left,
            upper_right,
        };

        let size = self.read_grid_size()?;

        Ok(Grid { rect, size })
    }

    fn read_polygon(&mut self) -> Result<Polygon, DeserializeError> {
        let relative_corners_count = (self.len() - 7) / 4;
        let mut polygon = Polygon::with_capacity(1 + relative_corners_count);

        let mut coordinate = self.read_coordinate()?;
        polygon.corners.push(coordinate);

        for _ in 0..relative_corners_count {
            coordinate = self.read_relative_coordinate(coordinate)?;
            polygon.corners.push(coordinate);
        }

        Ok(polygon)
    }

    /// Reads the distance to the next point of an LRP that is not the last one.
    fn read_path_point(
        &mut self,
        coordinate: Coordinate,
        attributes: &EncodedAttributes,
    ) -> Result<Point, DeserializeError> {
        let dnp = self.read_dnp()?;

        Ok(Point {
            coordinate,
            line: attributes.line,
            path: Some(PathAttributes {
                lfrcnp: attributes.lfrcnp()?,
                dnp,
            }),
        })
    }

    fn read_coordinate(&mut self) -> Result<Coordinate, DeserializeError> {
        let mut read_degrees = || -> Result<f64, DeserializeError> {
            let mut c = [0u8; 3];
            self.cursor.read_exact(&mut c)?;
            Ok(Coordinate::degrees_from_be_bytes(c))
        };

        let lon = read_degrees()?;
        let lat = read_degrees()?;
        valid_coordinate(Coordinate::new(lon, lat))
    }

    fn read_relative_coordinate(
        &mut self,
        previous: Coordinate,
    ) -> Result<Coordinate, DeserializeError> {
        let mut read_degrees = |previous| -> Result<f64, DeserializeError> {
            let mut c = [0u8; 2];
            self.cursor.read_exact(&mut c)?;
            Ok(Coordinate::degrees_from_be_bytes_relative(c, previous))
        };

        let lon = read_degrees(previous.lon)?;
        let lat = read_degrees(previous.lat)?;
        valid_coordinate(Coordinate::new(lon, lat))
    }

    fn read_attributes(&mut self) -> Result<EncodedAttributes, DeserializeError> {
        let mut attributes = [0u8; 2];
        self.cursor.read_exact(&mut attributes)?;

        let fow = Fow::try_from_byte(attributes[0] & 0b111)?;
        let frc = Frc::try_from_byte((attributes[0] >> 3) & 0b111)?;
        let orientation_or_side = (attributes[0] >> 6) & 0b11;
        let bearing = Bearing::from_byte(attributes[1] & 0b11111);
        let lfrcnp_or_flags = (attributes[1] >> 5) & 0b111;

        Ok(EncodedAttributes {
            line: LineAttributes { frc, fow, bearing },
            lfrcnp_or_flags,
            orientation_or_side,
        })
    }

    fn read_dnp(&mut self) -> Result<Length, DeserializeError> {
        let mut dnp = [0u8; 1];
        self.cursor.read_exact(&mut dnp)?;
        Ok(Length::dnp_from_byte(dnp[0]))
    }

    fn read_offset(&mut self) -> Result<Offset, DeserializeError> {
        let mut offset = [0u8; 1];
        self.cursor.read_exact(&mut offset)?;
        Ok(Offset::from_byte(offset[0]))
    }

    fn read_radius(&mut self) -> Result<Length, DeserializeError> {
        let mut radius = [0u8; 4];
        let length = self.cursor.read(&mut radius)?;
        Ok(Length::radius_from_be_bytes(&radius[..length]))
    }

    fn read_grid_size(&mut self) -> Result<GridSize, DeserializeError> {
        let mut size = [0u8; 4];
        self.cursor.read_exact(&mut size)?;
        Ok(GridSize::from_be_bytes(size))
    }
}

fn valid_coordinate(coordinate: Coordinate) -> Result<Coordinate, DeserializeError> {
    if coordinate.is_valid() {
        Ok(coordinate)
    } else {
        Err(DeserializeError::InvalidCoordinate(coordinate))
    }
}
