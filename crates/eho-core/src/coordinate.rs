use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::constants::{COORDINATE_DIM, EPSILON, PAYLOAD_SLOTS};
use crate::error::{CoreError, Result};

/// A point in the 40-dimensional retrieval space.
///
/// Length is fixed by the type. Slots 20, 21, 23, 24 and 25 carry metadata
/// written by the dimension extender; the rest carry compressed payload.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Coordinate([f64; COORDINATE_DIM]);

impl Coordinate {
    pub fn new(values: [f64; COORDINATE_DIM]) -> Self {
        Self(values)
    }

    /// All components set to `value`.
    pub fn splat(value: f64) -> Self {
        Self([value; COORDINATE_DIM])
    }

    pub fn zeros() -> Self {
        Self::splat(0.0)
    }

    /// Build from a slice, rejecting anything that is not exactly 40 long.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let arr: [f64; COORDINATE_DIM] =
            values.try_into().map_err(|_| CoreError::InputShape {
                expected: COORDINATE_DIM,
                actual: values.len(),
            })?;
        Ok(Self(arr))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_array(&self) -> &[f64; COORDINATE_DIM] {
        &self.0
    }

    pub fn len(&self) -> usize {
        COORDINATE_DIM
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Payload components in `PAYLOAD_SLOTS` order.
    pub fn payload(&self) -> [f64; PAYLOAD_SLOTS.len()] {
        let mut out = [0.0; PAYLOAD_SLOTS.len()];
        for (o, &slot) in out.iter_mut().zip(PAYLOAD_SLOTS.iter()) {
            *o = self.0[slot];
        }
        out
    }

    /// Copy of `self` with payload slots replaced, metadata untouched.
    pub fn with_payload(&self, payload: &[f64]) -> Self {
        let mut out = *self;
        for (&slot, &v) in PAYLOAD_SLOTS.iter().zip(payload.iter()) {
            out.0[slot] = v;
        }
        out
    }

    /// True when every component is within `tolerance` of `other`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Little-endian byte image, 8 bytes per component.
    pub fn to_le_bytes(&self) -> [u8; COORDINATE_DIM * 8] {
        let mut out = [0u8; COORDINATE_DIM * 8];
        for (chunk, v) in out.chunks_exact_mut(8).zip(self.0.iter()) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Inverse of [`Coordinate::to_le_bytes`].
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COORDINATE_DIM * 8 {
            return Err(CoreError::InputShape {
                expected: COORDINATE_DIM * 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0.0; COORDINATE_DIM];
        for (v, chunk) in arr.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *v = f64::from_le_bytes(raw);
        }
        Ok(Self(arr))
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, EPSILON)
    }
}

impl Index<usize> for Coordinate {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

impl IndexMut<usize> for Coordinate {
    fn index_mut(&mut self, idx: usize) -> &mut f64 {
        &mut self.0[idx]
    }
}

impl TryFrom<Vec<f64>> for Coordinate {
    type Error = CoreError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_slice(&values)
    }
}

impl From<Coordinate> for Vec<f64> {
    fn from(c: Coordinate) -> Self {
        c.0.to_vec()
    }
}
