use crate::{
    Bearing, Coordinate, DeserializeError, Fow, Frc, GridSize, Length, LineAttributes, Offset,
    Offsets, Orientation, SerializeError, SideOfRoad,
};

/// Attribute bytes of one LR-point, with the bits shared by different location kinds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodedAttributes {
    pub(crate) line: LineAttributes,
    pub(crate) lfrcnp_or_flags: u8,
    pub(crate) orientation_or_side: u8,
}

impl From<LineAttributes> for EncodedAttributes {
    fn from(line: LineAttributes) -> Self {
        Self {
            line,
            lfrcnp_or_flags: 0,
            orientation_or_side: 0,
        }
    }
}

impl EncodedAttributes {
    pub(crate) const fn with_lfrcnp(mut self, lfrcnp: Frc) -> Self {
        self.lfrcnp_or_flags = lfrcnp.value();
        self
    }

    pub(crate) const fn with_offsets(mut self, offsets: &Offsets) -> Self {
        self.lfrcnp_or_flags = offsets.into_byte();
        self
    }

    pub(crate) const fn with_positive_offset(mut self, offset: Offset) -> Self {
        self.lfrcnp_or_flags = Offsets::positive(offset).into_byte();
        self
    }

    pub(crate) const fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation_or_side = orientation as u8;
        self
    }

    pub(crate) const fn with_side(mut self, side: SideOfRoad) -> Self {
        self.orientation_or_side = side as u8;
        self
    }

    pub(crate) fn lfrcnp(&self) -> Result<Frc, DeserializeError> {
        Frc::try_from_byte(self.lfrcnp_or_flags)
    }

    pub(crate) const fn pos_offset_flag(&self) -> bool {
        self.lfrcnp_or_flags & 0b10 != 0
    }

    pub(crate) const fn neg_offset_flag(&self) -> bool {
        self.lfrcnp_or_flags & 0b01 != 0
    }

    pub(crate) fn orientation(&self) -> Result<Orientation, DeserializeError> {
        Orientation::from_repr(self.orientation_or_side)
            .ok_or(DeserializeError::InvalidOrientation(self.orientation_or_side))
    }

    pub(crate) fn side(&self) -> Result<SideOfRoad, DeserializeError> {
        SideOfRoad::from_repr(self.orientation_or_side)
            .ok_or(DeserializeError::InvalidSideOfRoad(self.orientation_or_side))
    }
}

impl Frc {
    pub(crate) fn try_from_byte(byte: u8) -> Result<Self, DeserializeError> {
        Self::from_value(byte).ok_or(DeserializeError::InvalidFrc(byte))
    }
}

impl Fow {
    pub(crate) fn try_from_byte(byte: u8) -> Result<Self, DeserializeError> {
        Self::from_value(byte).ok_or(DeserializeError::InvalidFow(byte))
    }
}

impl Coordinate {
    const RESOLUTION: usize = 24;
    const DECA_MICRO_DEG_FACTOR: f64 = 100000.0;

    /// Returns degrees from a big-endian degrees representation in a 24-bit resolution.
    pub(crate) fn degrees_from_be_bytes(bytes: [u8; 3]) -> f64 {
        let is_negative = bytes[0] & 0x80 != 0;
        let sign = if is_negative { 0xFF } else { 0 };
        let degrees = i32::from_be_bytes([sign, bytes[0], bytes[1], bytes[2]]) as f64;
        ((degrees - signum(degrees) * 0.5) * 360.0) / (1 << Self::RESOLUTION) as f64
    }

    /// Returns the big-endian representation of the given degrees in a 24-bit resolution.
    pub(crate) fn degrees_into_be_bytes(degrees: f64) -> [u8; 3] {
        let degrees = signum(degrees) * 0.5 + degrees * (1 << Self::RESOLUTION) as f64 / 360.0;
        let degrees = (degrees.round() as i32).to_be_bytes();
        [degrees[1], degrees[2], degrees[3]]
    }

    /// Returns degrees from a big-endian relative degrees representation in a 16-bit resolution.
    pub(crate) fn degrees_from_be_bytes_relative(bytes: [u8; 2], previous_degrees: f64) -> f64 {
        let degrees = i16::from_be_bytes(bytes) as f64;
        previous_degrees + degrees / Self::DECA_MICRO_DEG_FACTOR
    }

    /// Returns the relative degrees representation in a 16-bit resolution, if the difference
    /// from the previous degrees fits.
    pub(crate) fn degrees_into_be_bytes_relative(
        degrees: f64,
        previous_degrees: f64,
    ) -> Option<[u8; 2]> {
        let delta = (Self::DECA_MICRO_DEG_FACTOR * (degrees - previous_degrees)).round();
        if delta < i16::MIN as f64 || delta > i16::MAX as f64 {
            return None;
        }
        Some(i16::to_be_bytes(delta as i16))
    }
}

impl Length {
    /// This representation defines 256 intervals and each interval has a length of approximately 58.6 meters.
    /// Maximum length between two consecutive LR-points is limited by 15000m.
    const DISTANCE_PER_INTERVAL: f64 = 58.6;

    /// Returns the distance to next LR-point in meters from a byte.
    pub(crate) fn dnp_from_byte(byte: u8) -> Self {
        Self::from_meters(((byte as f64 + 0.5) * Self::DISTANCE_PER_INTERVAL).round())
    }

    /// Returns the distance to next LR-point interval.
    pub(crate) fn dnp_try_into_byte(self) -> Result<u8, SerializeError> {
        let meters = self.meters();
        if !(0.0..Self::MAX_BINARY_LRP_DISTANCE.meters()).contains(&meters) {
            return Err(SerializeError::InvalidDistance(self));
        }

        let interval = (meters / Self::DISTANCE_PER_INTERVAL - 0.5).round();
        Ok(interval.clamp(0.0, u8::MAX as f64) as u8)
    }

    /// Returns the length of a radius in meters from big-endian slice of (up to 4) bytes.
    pub(crate) fn radius_from_be_bytes(bytes: &[u8]) -> Self {
        let mut radius = [0u8; 4];
        radius[4 - bytes.len()..].copy_from_slice(bytes);
        Self::from_meters(u32::from_be_bytes(radius) as f64)
    }

    /// Returns the minimal big-endian representation of a radius (1 to 4 bytes).
    pub(crate) fn radius_try_into_be_bytes(self) -> Result<Vec<u8>, SerializeError> {
        let meters = self.meters().round();
        if !(0.0..=u32::MAX as f64).contains(&meters) {
            return Err(SerializeError::InvalidRadius(self));
        }

        let bytes = (meters as u32).to_be_bytes();
        let leading_zeros = bytes.iter().take(3).take_while(|&&byte| byte == 0).count();
        Ok(bytes[leading_zeros..].to_vec())
    }
}

impl Bearing {
    /// The bearing describes the angle between the true North and the road.
    /// The data format defines 32 sectors whereby each sector covers 11.25° of the circle.
    const BEAR_SECTOR: f64 = 11.25;

    pub(crate) fn from_byte(byte: u8) -> Self {
        let degrees = (byte as f64 * Self::BEAR_SECTOR + Self::BEAR_SECTOR / 2.0).round() as u16;
        Self::from_degrees(degrees)
    }

    pub(crate) fn try_into_byte(self) -> Result<u8, SerializeError> {
        let degrees = self.degrees();
        if degrees >= 360 {
            return Err(SerializeError::InvalidBearing(degrees));
        }

        Ok((degrees as f64 / Self::BEAR_SECTOR).floor() as u8)
    }
}

impl Offset {
    /// The value used here is the relation of the offset length to the length of the path
    /// between the first two location reference points (last two location reference points
    /// for the negative offset). The length between these two LR-points shall be called LRP length.
    /// The relative value (or percentage) will then be equally distributed over the available
    /// 256 buckets so that every bucket covers 0.390625% of the LRP length.
    /// Returns the offset in [0, 1] range.
    pub(crate) fn from_byte(bucket: u8) -> Self {
        Self::from_range((bucket as f64 + 0.5) / 256.0)
    }

    /// Returns the bucket index corresponding to the given offset.
    pub(crate) fn try_into_byte(self) -> Result<u8, SerializeError> {
        let range = self.range();
        if !(0.0..1.0).contains(&range) {
            return Err(SerializeError::InvalidOffset(range));
        }

        Ok((range * 256.0).floor() as u8)
    }
}

impl Offsets {
    pub(crate) const fn into_byte(self) -> u8 {
        let pos = ((self.pos.range() > 0.0) as u8) << 1;
        let neg = (self.neg.range() > 0.0) as u8;
        pos + neg
    }
}

impl GridSize {
    pub(crate) fn from_be_bytes(bytes: [u8; 4]) -> Self {
        let [c1, c2, r1, r2] = bytes;
        let columns = u16::from_be_bytes([c1, c2]);
        let rows = u16::from_be_bytes([r1, r2]);
        Self { columns, rows }
    }

    pub(crate) fn try_into_be_bytes(self) -> Result<[u8; 4], SerializeError> {
        if self.columns < 2 || self.rows < 2 {
            return Err(SerializeError::InvalidGridSize);
        }

        let columns = u16::to_be_bytes(self.columns);
        let rows = u16::to_be_bytes(self.rows);
        Ok([columns[0], columns[1], rows[0], rows[1]])
    }
}

const fn signum(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value.signum() }
}
