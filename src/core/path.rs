//! Path Decoding
//!
//! A path is the raw byte sequence a client submits: an ordered run of
//! 2-byte samples. This module owns the shape checks and the two ways a
//! sample pair can be read.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Bytes per sample.
pub const SAMPLE_SIZE: usize = 2;

/// Shape errors for submitted paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// Path has zero length.
    #[error("path is empty")]
    Empty,
    /// Path length is not a whole number of samples.
    #[error("path length {0} is not a multiple of 2")]
    OddLength(usize),
}

/// How a 2-byte sample is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleLayout {
    /// Whole big-endian `u16`; step is the absolute difference.
    #[default]
    Scalar,
    /// `(x, y)` byte pair; step is the floored Euclidean distance.
    Planar,
}

impl SampleLayout {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Planar => "planar",
        }
    }
}

impl fmt::Display for SampleLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Self::Scalar),
            "planar" | "xy" => Ok(Self::Planar),
            other => Err(format!("unknown sample layout '{}'", other)),
        }
    }
}

/// One positional sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sample(pub [u8; SAMPLE_SIZE]);

impl Sample {
    /// Sample as a big-endian scalar.
    #[inline]
    pub fn value(self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    /// Sample as an `(x, y)` grid point.
    #[inline]
    pub fn point(self) -> (u8, u8) {
        (self.0[0], self.0[1])
    }

    /// Step magnitude from `self` to `next` under `layout`.
    pub fn step_to(self, next: Sample, layout: SampleLayout) -> u32 {
        match layout {
            SampleLayout::Scalar => self.value().abs_diff(next.value()) as u32,
            SampleLayout::Planar => {
                let (x0, y0) = self.point();
                let (x1, y1) = next.point();
                let dx = x0.abs_diff(x1) as u32;
                let dy = y0.abs_diff(y1) as u32;
                isqrt(dx * dx + dy * dy)
            }
        }
    }
}

/// Floor of the integer square root.
///
/// Newton iteration; exact for every `u32`, no floating point.
pub fn isqrt(n: u32) -> u32 {
    if n < 2 {
        return n;
    }
    let n = n as u64;
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x as u32
}

/// A shape-checked path: non-empty, whole samples only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Path<'a> {
    bytes: &'a [u8],
}

impl<'a> Path<'a> {
    /// Check the shape of `bytes` and wrap it.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, PathError> {
        if bytes.is_empty() {
            return Err(PathError::Empty);
        }
        if bytes.len() % SAMPLE_SIZE != 0 {
            return Err(PathError::OddLength(bytes.len()));
        }
        Ok(Self { bytes })
    }

    /// Raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; an empty path cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of samples.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / SAMPLE_SIZE
    }

    /// Samples in submission order.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + 'a {
        self.bytes
            .chunks_exact(SAMPLE_SIZE)
            .map(|pair| Sample([pair[0], pair[1]]))
    }
}

impl<'a> TryFrom<&'a [u8]> for Path<'a> {
    type Error = PathError;

    fn try_from(bytes: &'a [u8]) -> Result<Self, Self::Error> {
        Self::parse(bytes)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(Path::parse(&[]), Err(PathError::Empty));
        assert_eq!(Path::parse(&[0, 1, 2]), Err(PathError::OddLength(3)));

        let path = Path::parse(&[0, 1, 0, 2]).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.sample_count(), 2);
        assert!(!path.is_empty());
    }

    #[test]
    fn test_samples_are_big_endian() {
        let bytes = [0x01, 0x02, 0x00, 0xFF];
        let path = Path::parse(&bytes).unwrap();
        let values: Vec<u16> = path.samples().map(Sample::value).collect();
        assert_eq!(values, vec![0x0102, 0x00FF]);
    }

    #[test]
    fn test_scalar_step_is_absolute() {
        let a = Sample([0, 10]);
        let b = Sample([0, 7]);
        assert_eq!(a.step_to(b, SampleLayout::Scalar), 3);
        assert_eq!(b.step_to(a, SampleLayout::Scalar), 3);

        // Carry across the high byte counts as one unit.
        let c = Sample([0, 255]);
        let d = Sample([1, 0]);
        assert_eq!(c.step_to(d, SampleLayout::Scalar), 1);
    }

    #[test]
    fn test_planar_step_is_floored_distance() {
        let origin = Sample([0, 0]);
        assert_eq!(origin.step_to(Sample([0, 1]), SampleLayout::Planar), 1);
        assert_eq!(origin.step_to(Sample([1, 1]), SampleLayout::Planar), 1);
        assert_eq!(origin.step_to(Sample([0, 2]), SampleLayout::Planar), 2);
        assert_eq!(origin.step_to(Sample([3, 4]), SampleLayout::Planar), 5);

        // Carry across the high byte is a large jump on the grid.
        assert_eq!(Sample([0, 255]).step_to(Sample([1, 0]), SampleLayout::Planar), 255);
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(3), 1);
        assert_eq!(isqrt(4), 2);
        assert_eq!(isqrt(24), 4);
        assert_eq!(isqrt(25), 5);
        assert_eq!(isqrt(2 * 255 * 255), 360);
        assert_eq!(isqrt(u32::MAX), 65535);
    }

    #[test]
    fn test_layout_parsing() {
        assert_eq!("planar".parse::<SampleLayout>(), Ok(SampleLayout::Planar));
        assert_eq!("Scalar".parse::<SampleLayout>(), Ok(SampleLayout::Scalar));
        assert!("polar".parse::<SampleLayout>().is_err());
        assert_eq!(SampleLayout::default(), SampleLayout::Scalar);
    }
}
