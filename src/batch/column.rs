//! Fixed-length scalar columns
//!
//! Each column holds one slot per row of the batch. Slots are overwritten
//! on reuse after a reset; storage is never released.

use crate::error::Result;
use crate::schema::TIMESTAMP_TZ;
use arrow::array::{
    ArrayRef, BooleanArray, Decimal128Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use std::sync::Arc;

/// A nullable column with a fixed number of row slots
#[derive(Debug, Clone)]
pub struct Column<T> {
    values: Vec<Option<T>>,
}

impl<T> Column<T> {
    /// Create a column with `capacity` null slots
    pub fn new(capacity: usize) -> Self {
        Self {
            values: std::iter::repeat_with(|| None).take(capacity).collect(),
        }
    }

    pub fn set(&mut self, row: usize, value: T) {
        self.values[row] = Some(value);
    }

    pub fn set_null(&mut self, row: usize) {
        self.values[row] = None;
    }

    pub fn set_opt(&mut self, row: usize, value: Option<T>) {
        self.values[row] = value;
    }

    pub fn get(&self, row: usize) -> Option<&T> {
        self.values.get(row).and_then(Option::as_ref)
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.get(row).is_none()
    }

    /// Number of row slots
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// The first `len` slots
    pub fn rows(&self, len: usize) -> &[Option<T>] {
        &self.values[..len]
    }
}

impl Column<String> {
    /// Set a string, reusing the slot's previous allocation
    pub fn set_str(&mut self, row: usize, value: &str) {
        match &mut self.values[row] {
            Some(existing) => {
                existing.clear();
                existing.push_str(value);
            }
            slot => *slot = Some(value.to_owned()),
        }
    }

    /// Set or clear a string slot
    pub fn set_opt_str(&mut self, row: usize, value: Option<&str>) {
        match value {
            Some(v) => self.set_str(row, v),
            None => self.set_null(row),
        }
    }
}

impl Column<i64> {
    pub fn to_int64_array(&self, len: usize) -> ArrayRef {
        Arc::new(self.rows(len).iter().collect::<Int64Array>())
    }

    /// Interpret the slots as UTC milliseconds since the epoch
    pub fn to_timestamp_array(&self, len: usize) -> ArrayRef {
        let array = self
            .rows(len)
            .iter()
            .collect::<TimestampMillisecondArray>()
            .with_timezone(TIMESTAMP_TZ);
        Arc::new(array)
    }
}

impl Column<bool> {
    pub fn to_boolean_array(&self, len: usize) -> ArrayRef {
        Arc::new(self.rows(len).iter().collect::<BooleanArray>())
    }
}

impl<T: AsRef<str>> Column<T> {
    pub fn to_string_array(&self, len: usize) -> ArrayRef {
        Arc::new(
            self.rows(len)
                .iter()
                .map(|v| v.as_ref().map(T::as_ref))
                .collect::<StringArray>(),
        )
    }
}

/// A decimal column with fixed precision and scale
///
/// Slots hold unscaled values; `47.1234567` at scale 7 is `471234567`.
#[derive(Debug, Clone)]
pub struct DecimalColumn {
    precision: u8,
    scale: i8,
    values: Column<i128>,
}

impl DecimalColumn {
    pub fn new(capacity: usize, precision: u8, scale: i8) -> Self {
        Self {
            precision,
            scale,
            values: Column::new(capacity),
        }
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> i8 {
        self.scale
    }

    pub fn set(&mut self, row: usize, unscaled: i128) {
        self.values.set(row, unscaled);
    }

    pub fn set_null(&mut self, row: usize) {
        self.values.set_null(row);
    }

    pub fn set_opt(&mut self, row: usize, unscaled: Option<i128>) {
        self.values.set_opt(row, unscaled);
    }

    pub fn get(&self, row: usize) -> Option<i128> {
        self.values.get(row).copied()
    }

    /// Build the Arrow array, rejecting values that exceed the precision
    pub fn to_array(&self, len: usize) -> Result<ArrayRef> {
        let array = self
            .values
            .rows(len)
            .iter()
            .collect::<Decimal128Array>()
            .with_precision_and_scale(self.precision, self.scale)?;
        array.validate_decimal_precision(self.precision)?;
        Ok(Arc::new(array))
    }
}
