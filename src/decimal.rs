//! Fixed-point coordinates
//!
//! Coordinates are persisted as decimals with scale 7. Values are converted
//! from their decimal text, never by scaling a binary float, so a value such
//! as `47.1234567` is stored as exactly `471234567 * 10^-7`.

use crate::error::{Error, Result};
use std::fmt;

/// Number of fractional digits kept for coordinates
pub const COORDINATE_SCALE: i8 = 7;

/// Decimal precision of latitude columns
pub const LAT_PRECISION: u8 = 9;

/// Decimal precision of longitude columns
pub const LON_PRECISION: u8 = 10;

const UNITS_PER_DEGREE: i64 = 10_000_000;

/// Axis of a coordinate, which bounds its valid range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Largest magnitude in whole degrees
    pub fn limit_degrees(self) -> i64 {
        match self {
            Axis::Latitude => 90,
            Axis::Longitude => 180,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => write!(f, "latitude"),
            Axis::Longitude => write!(f, "longitude"),
        }
    }
}

/// A coordinate in units of 1e-7 degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Coordinate(i64);

impl Coordinate {
    /// Create from raw 1e-7 degree units
    pub const fn from_units(units: i64) -> Self {
        Self(units)
    }

    /// Raw 1e-7 degree units
    pub const fn units(self) -> i64 {
        self.0
    }

    /// Unscaled value for a `Decimal128(_, 7)` column
    pub fn to_decimal128(self) -> i128 {
        i128::from(self.0)
    }

    /// Check that the value lies within the range of `axis`
    pub fn is_within(self, axis: Axis) -> bool {
        self.0.unsigned_abs() <= (axis.limit_degrees() * UNITS_PER_DEGREE).unsigned_abs()
    }

    /// Convert from floating-point degrees
    ///
    /// Goes through the shortest decimal representation that round-trips to
    /// `degrees`. Readers that hold the decimal text use [`Coordinate::parse`].
    pub fn from_degrees(degrees: f64) -> Result<Self> {
        if !degrees.is_finite() {
            return Err(Error::decode(format!("Invalid coordinate: {degrees}")));
        }
        Self::parse(&degrees.to_string())
    }

    /// Parse decimal text such as `-122.1234567`
    ///
    /// Digits beyond the seventh fractional place are rounded half away
    /// from zero.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::decode(format!("Invalid coordinate: '{text}'"));

        let trimmed = text.trim();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let mut units: i64 = 0;
        for digit in int_part.bytes() {
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(i64::from(digit - b'0')))
                .ok_or_else(invalid)?;
        }
        units = units.checked_mul(UNITS_PER_DEGREE).ok_or_else(invalid)?;

        let scale = COORDINATE_SCALE as usize;
        let mut frac_units: i64 = 0;
        for (i, digit) in frac_part.bytes().take(scale).enumerate() {
            frac_units += i64::from(digit - b'0') * 10_i64.pow((scale - 1 - i) as u32);
        }
        if frac_part.len() > scale && frac_part.as_bytes()[scale] >= b'5' {
            frac_units += 1;
        }

        units = units.checked_add(frac_units).ok_or_else(invalid)?;
        Ok(Self(if negative { -units } else { units }))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_degree = UNITS_PER_DEGREE as u64;
        write!(f, "{sign}{}.{:07}", abs / per_degree, abs % per_degree)
    }
}
