//! Conversion between signed decimal degrees and the EXIF GPS encoding:
//! three unsigned rationals (degrees, minutes, seconds) plus a one-letter
//! hemisphere reference.

use serde::{Deserialize, Serialize};

use super::error::{MetadataError, Result};

/// Denominator used for the seconds component (four decimal digits).
pub const SECONDS_DENOMINATOR: u32 = 10_000;

/// Which coordinate a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Largest magnitude accepted for this axis, in degrees.
    pub fn limit(self) -> f64 {
        match self {
            Self::Latitude => 90.0,
            Self::Longitude => 180.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }
}

/// Hemisphere reference letter. `S` and `W` carry the negative sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Pick the reference for a signed value. The sign bit decides, so `-0.0`
    /// maps to the negative hemisphere.
    pub fn for_value(value: f64, axis: Axis) -> Self {
        match (axis, value.is_sign_negative()) {
            (Axis::Latitude, false) => Self::North,
            (Axis::Latitude, true) => Self::South,
            (Axis::Longitude, false) => Self::East,
            (Axis::Longitude, true) => Self::West,
        }
    }

    /// Parse a stored reference for the given axis. Trailing NUL padding and
    /// whitespace are ignored; case is not significant.
    pub fn parse(reference: &str, axis: Axis) -> Option<Self> {
        let letter = reference.trim_end_matches('\0').trim().to_ascii_uppercase();
        match (axis, letter.as_str()) {
            (Axis::Latitude, "N") => Some(Self::North),
            (Axis::Latitude, "S") => Some(Self::South),
            (Axis::Longitude, "E") => Some(Self::East),
            (Axis::Longitude, "W") => Some(Self::West),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::North => 'N',
            Self::South => 'S',
            Self::East => 'E',
            Self::West => 'W',
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Self::South | Self::West)
    }
}

/// A coordinate as stored in the GPS group: `(numerator, denominator)` for
/// degrees, minutes and seconds, plus the hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsCoordinate {
    pub components: [(u32, u32); 3],
    pub hemisphere: Hemisphere,
}

impl GpsCoordinate {
    /// Signed decimal degrees, or `None` when a denominator is zero.
    pub fn to_decimal(&self) -> Option<f64> {
        let mut parts = [0.0f64; 3];
        for (part, &(num, den)) in parts.iter_mut().zip(self.components.iter()) {
            if den == 0 {
                return None;
            }
            *part = num as f64 / den as f64;
        }

        let magnitude = parts[0] + parts[1] / 60.0 + parts[2] / 3600.0;
        if !magnitude.is_finite() {
            return None;
        }

        Some(if self.hemisphere.is_negative() { -magnitude } else { magnitude })
    }
}

/// A latitude/longitude pair in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoords {
    pub latitude: f64,
    pub longitude: f64,
}

/// Decode a stored coordinate. Both halves must be present: a value without a
/// reference, or a reference without a value, is absent rather than zero.
pub fn decode_coordinate(
    value: Option<&[(u32, u32)]>,
    reference: Option<&str>,
    axis: Axis,
) -> Option<f64> {
    let (value, reference) = (value?, reference?);
    let components: [(u32, u32); 3] = value.try_into().ok()?;
    let hemisphere = Hemisphere::parse(reference, axis)?;
    GpsCoordinate { components, hemisphere }.to_decimal()
}

/// Encode signed decimal degrees. The magnitude is split into whole degrees,
/// whole minutes and seconds scaled by [`SECONDS_DENOMINATOR`]; every step
/// truncates.
pub fn encode_coordinate(value: f64, axis: Axis) -> Result<GpsCoordinate> {
    if !value.is_finite() {
        return Err(MetadataError::Validation(format!(
            "{} must be a finite number, got {value}",
            axis.name()
        )));
    }
    if value.abs() > axis.limit() {
        return Err(MetadataError::Validation(format!(
            "{} {value} is outside -{limit}..={limit}",
            axis.name(),
            limit = axis.limit()
        )));
    }

    let hemisphere = Hemisphere::for_value(value, axis);
    let magnitude = value.abs();

    let degrees = magnitude.trunc() as u32;
    let minutes = ((magnitude - degrees as f64) * 60.0).trunc() as u32;
    // `as` saturates, so float noise just below zero lands on 0.
    let seconds = ((magnitude - degrees as f64 - minutes as f64 / 60.0)
        * 3600.0
        * SECONDS_DENOMINATOR as f64)
        .trunc() as u32;

    Ok(GpsCoordinate {
        components: [(degrees, 1), (minutes, 1), (seconds, SECONDS_DENOMINATOR)],
        hemisphere,
    })
}
