use thiserror::Error;

use crate::storage::GridPoint;

///
/// Errors raised at the API boundary of the grid core. Every variant aborts the
/// current operation and names the offending point, sequence number or dimension.
///
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SGError
{
    /// Malformed grid point (even index, index out of range, level 0 without boundary, ...).
    #[error("invalid grid point {point} in dimension {dim}: {reason}")]
    InvalidPoint
    {
        point: GridPoint,
        dim: usize,
        reason: &'static str,
    },

    /// Grid point has a different number of dimensions than the storage.
    #[error("grid point has {actual} dimensions, storage expects {expected}")]
    PointDimensionMismatch
    {
        expected: usize,
        actual: usize,
    },

    /// Sequence number does not refer to a stored point.
    #[error("sequence number {seq} out of range for storage of size {len}")]
    SequenceOutOfRange
    {
        seq: usize,
        len: usize,
    },

    /// Grid point is not stored.
    #[error("grid point {point} not found in storage")]
    PointNotFound
    {
        point: GridPoint,
    },

    /// Coefficient vector length differs from the number of grid points.
    #[error("coefficient vector has length {actual}, expected {expected}")]
    DimensionMismatch
    {
        expected: usize,
        actual: usize,
    },

    /// Operator or sweep dimension out of range.
    #[error("dimension {dim} out of range for {num_dims}-dimensional grid")]
    InvalidDimension
    {
        dim: usize,
        num_dims: usize,
    },

    /// Generator does not match the boundary mode of the storage it fills.
    #[error("generator requires a storage with has_boundary = {expected}")]
    BoundaryMismatch
    {
        expected: bool,
    },

    /// Bounding box with an empty, inverted or infinite interval.
    #[error("bounding box interval in dimension {dim} is empty or unbounded")]
    InvalidBoundingBox
    {
        dim: usize,
    },

    #[error("point outside of the bounding box")]
    OutOfDomain,
}

///
/// Returns `DimensionMismatch` unless `len == expected`.
///
#[inline]
pub(crate) fn check_len(expected: usize, len: usize) -> Result<(), SGError>
{
    if expected != len
    {
        Err(SGError::DimensionMismatch { expected, actual: len })
    }
    else
    {
        Ok(())
    }
}
