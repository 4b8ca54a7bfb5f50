use std::{fmt::Display, hash::{Hash, Hasher}};
use bitfield_struct::bitfield;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

use crate::errors::SGError;

/// Deepest level a grid point may have in any dimension. Keeps `2^level`, and the
/// indices of children, representable as `u32`.
pub const MAX_LEVEL: u8 = 31;

#[bitfield(u8, new = false)]
#[derive(Serialize, Deserialize, PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    pub _empty: u8
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
}

///
/// One grid point: a (level, index) pair per dimension. The 1D coordinate of a
/// pair is `index / 2^level`; level 0 holds the boundary anchors 0 and 1.
///
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint{}

impl Display for GridPoint
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (d, (l, i)) in self.level.iter().zip(self.index.iter()).enumerate()
        {
            if d > 0
            {
                write!(f, ", ")?;
            }
            write!(f, "({l},{i})")?;
        }
        write!(f, "]")
    }
}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32]) -> Self
    {
        Self { level: level.to_vec(), index: index.to_vec() }
    }

    ///
    /// The point at level one, index one in every dimension.
    ///
    pub fn root(num_inputs: usize) -> Self
    {
        Self { level: vec![1; num_inputs], index: vec![1; num_inputs] }
    }

    ///
    /// The left anchor (level 0, index 0) in every dimension.
    ///
    pub fn zero_index(num_inputs: usize) -> Self
    {
        Self { level: vec![0; num_inputs], index: vec![0; num_inputs] }
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.level.len()
    }

    #[inline]
    pub fn get(&self, dim: usize) -> (u8, u32)
    {
        (self.level[dim], self.index[dim])
    }

    #[inline]
    pub fn set(&mut self, dim: usize, level: u8, index: u32)
    {
        self.level[dim] = level;
        self.index[dim] = index;
    }

    ///
    /// This is an inner point if no level is zero...
    ///
    pub fn is_inner_point(&self) -> bool
    {
        !self.level.contains(&0)
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }
    pub fn level_min(&self) -> u8
    {
        *self.level.iter().min().unwrap_or(&0)
    }

    ///
    /// Left child in direction `dim`. The child of an anchor is the level-one root.
    ///
    pub fn left_child(&self, dim: usize) -> GridPoint
    {
        let mut r = self.clone();
        let (level, index) = self.get(dim);
        if level == 0
        {
            r.set(dim, 1, 1);
        }
        else
        {
            r.set(dim, level + 1, 2 * index - 1);
        }
        r
    }

    ///
    /// Right child in direction `dim`. Anchors only have one child, returned by `left_child`.
    ///
    pub fn right_child(&self, dim: usize) -> Option<GridPoint>
    {
        let (level, index) = self.get(dim);
        if level == 0
        {
            return None;
        }
        let mut r = self.clone();
        r.set(dim, level + 1, 2 * index + 1);
        Some(r)
    }

    ///
    /// Hierarchical parents in direction `dim`: one for level >= 2, the two
    /// anchors for level 1 on boundary grids, none otherwise.
    ///
    pub fn parents(&self, dim: usize, has_boundary: bool) -> Vec<GridPoint>
    {
        let (level, index) = self.get(dim);
        let mut r = self.clone();
        match level
        {
            0 => vec![],
            1 if has_boundary =>
            {
                r.set(dim, 0, 0);
                let mut right = self.clone();
                right.set(dim, 0, 1);
                vec![r, right]
            }
            1 => vec![],
            _ =>
            {
                r.set(dim, level - 1, (index >> 1) | 1);
                vec![r]
            }
        }
    }

    ///
    /// Points that must be stored whenever this point is stored: the parents
    /// in direction `dim` and, for an anchor, the opposite anchor.
    ///
    pub fn required_relatives(&self, dim: usize, has_boundary: bool) -> Vec<GridPoint>
    {
        let (level, index) = self.get(dim);
        if level == 0
        {
            let mut r = self.clone();
            r.set(dim, 0, 1 - index.min(1));
            vec![r]
        }
        else
        {
            self.parents(dim, has_boundary)
        }
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(self.index.iter()).map(|(&l, &i)| i as f64 / (1_u64 << l) as f64).collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub lower: Vec<f64>,
    pub upper: Vec<f64>
}

impl BoundingBox
{
    pub fn new(lower: &[f64], upper: &[f64]) -> Result<Self, SGError>
    {
        let bounding_box = Self { lower: lower.to_vec(), upper: upper.to_vec() };
        bounding_box.validate()?;
        Ok(bounding_box)
    }

    ///
    /// Both corners must have the same dimension and every interval a positive, finite width.
    ///
    pub fn validate(&self) -> Result<(), SGError>
    {
        if self.lower.len() != self.upper.len()
        {
            return Err(SGError::PointDimensionMismatch { expected: self.lower.len(), actual: self.upper.len() });
        }
        match (0..self.lower.len()).find(|&d| !(self.lower[d] < self.upper[d] && self.width(d).is_finite()))
        {
            Some(dim) => Err(SGError::InvalidBoundingBox { dim }),
            None => Ok(()),
        }
    }

    pub fn with_dim(num_inputs: usize) -> Self
    {
        Self { lower: vec![0.0; num_inputs], upper: vec![1.0; num_inputs] }
    }
    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    ///
    /// Volume of hypercube (width(dim1)*...*width(dim_n))
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        (0..self.lower.len()).map(|d| self.width(d)).product()
    }
    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(i, &x)| (x - self.lower[i]) / self.width(i)).collect()
    }
    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(i, &x)| self.lower[i] + self.width(i) * x).collect()
    }
    #[inline]
    pub fn contains(&self, point: &[f64]) -> bool
    {
        point.len() == self.lower.len() &&
            point.iter().enumerate().all(|(d, &x)| self.lower[d] <= x && x <= self.upper[d])
    }
}

type PointMap = IndexMap<GridPoint, GridPointFlags, FxBuildHasher>;

///
/// Owns every grid point of a grid. Points live in a dense arena; the position
/// of a point is its sequence number, and the value-keyed map resolves a point
/// back to it. Sequence numbers are stable until a point is deleted, which
/// moves the last point into the freed slot.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridStorage
{
    num_inputs: usize,
    has_boundary: bool,
    bounding_box: BoundingBox,
    points: PointMap,
}

impl GridStorage
{
    pub fn new(num_inputs: usize, has_boundary: bool) -> Self
    {
        Self { num_inputs, has_boundary, bounding_box: BoundingBox::with_dim(num_inputs), points: PointMap::default() }
    }

    pub fn with_bounding_box(bounding_box: BoundingBox, has_boundary: bool) -> Result<Self, SGError>
    {
        bounding_box.validate()?;
        Ok(Self { num_inputs: bounding_box.lower.len(), has_boundary, bounding_box, points: PointMap::default() })
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.points.is_empty()
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }

    ///
    /// Checks that `point` is a well-formed point of this storage.
    ///
    pub fn validate(&self, point: &GridPoint) -> Result<(), SGError>
    {
        if point.level.len() != self.num_inputs || point.index.len() != self.num_inputs
        {
            return Err(SGError::PointDimensionMismatch { expected: self.num_inputs, actual: point.level.len().max(point.index.len()) });
        }
        let invalid = |dim: usize, reason: &'static str| Err(SGError::InvalidPoint { point: point.clone(), dim, reason });
        for dim in 0..self.num_inputs
        {
            let (level, index) = point.get(dim);
            if level > MAX_LEVEL
            {
                return invalid(dim, "level exceeds maximum level");
            }
            if level == 0
            {
                if !self.has_boundary
                {
                    return invalid(dim, "level 0 on a grid without boundary");
                }
                if index > 1
                {
                    return invalid(dim, "level-0 index must be 0 or 1");
                }
            }
            else
            {
                if index % 2 == 0
                {
                    return invalid(dim, "index must be odd");
                }
                if index >= (1_u32 << level)
                {
                    return invalid(dim, "index exceeds 2^level - 1");
                }
            }
        }
        Ok(())
    }

    ///
    /// Inserts `point` and returns its sequence number. Inserting a stored point
    /// returns its existing sequence number. Leaf flags of the point and its
    /// parents are kept up-to-date; ancestors are *not* created here.
    ///
    pub fn insert(&mut self, point: GridPoint) -> Result<usize, SGError>
    {
        self.validate(&point)?;
        if let Some(seq) = self.points.get_index_of(&point)
        {
            return Ok(seq);
        }
        let is_leaf = !self.has_children(&point);
        for dim in 0..self.num_inputs
        {
            for parent in point.parents(dim, self.has_boundary)
            {
                if let Some(flags) = self.points.get_mut(&parent)
                {
                    flags.set_is_leaf(false);
                }
            }
        }
        let flags = GridPointFlags::new(&point.level, is_leaf);
        let (seq, _) = self.points.insert_full(point, flags);
        Ok(seq)
    }

    #[inline]
    pub fn find(&self, point: &GridPoint) -> Option<usize>
    {
        self.points.get_index_of(point)
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.points.contains_key(point)
    }

    pub fn get(&self, seq: usize) -> Result<&GridPoint, SGError>
    {
        self.points.get_index(seq).map(|(point, _)| point).ok_or(SGError::SequenceOutOfRange { seq, len: self.len() })
    }

    ///
    /// Point with sequence number `seq`. Panics if `seq` is out of range.
    ///
    #[inline]
    pub fn point(&self, seq: usize) -> &GridPoint
    {
        match self.points.get_index(seq)
        {
            Some((point, _)) => point,
            None => panic!("sequence number {seq} out of range for storage of size {}", self.len()),
        }
    }

    #[inline]
    pub fn flags(&self, seq: usize) -> GridPointFlags
    {
        self.points[seq]
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.points[seq].is_leaf()
    }

    #[inline(always)]
    pub fn level(&self, seq: usize, dim: usize) -> u8
    {
        self.point(seq).level[dim]
    }

    #[inline]
    pub fn index(&self, seq: usize, dim: usize) -> u32
    {
        self.point(seq).index[dim]
    }

    ///
    /// Removes the point with sequence number `seq`. The last point takes over
    /// `seq`, so the sequence number previously held by the last point is
    /// invalidated. Parents that lose their last child become leaves.
    ///
    pub fn delete_sequence(&mut self, seq: usize) -> Result<GridPoint, SGError>
    {
        let len = self.len();
        let (point, _) = self.points.swap_remove_index(seq).ok_or(SGError::SequenceOutOfRange { seq, len })?;
        for dim in 0..self.num_inputs
        {
            for parent in point.parents(dim, self.has_boundary)
            {
                if self.contains(&parent)
                {
                    let is_leaf = !self.has_children(&parent);
                    if let Some(flags) = self.points.get_mut(&parent)
                    {
                        flags.set_is_leaf(is_leaf);
                    }
                }
            }
        }
        Ok(point)
    }

    ///
    /// True if any child of `point`, in any dimension, is stored.
    ///
    pub fn has_children(&self, point: &GridPoint) -> bool
    {
        (0..self.num_inputs).any(|dim| self.has_children_in(point, dim))
    }

    ///
    /// True if a child of `point` in direction `dim` is stored.
    ///
    pub fn has_children_in(&self, point: &GridPoint, dim: usize) -> bool
    {
        self.contains(&point.left_child(dim)) || point.right_child(dim).is_some_and(|child| self.contains(&child))
    }

    ///
    /// Recomputes the leaf flag of every point.
    ///
    pub fn recalc_leaf_property(&mut self)
    {
        let leaves: Vec<bool> = self.points.keys().map(|point| !self.has_children(point)).collect();
        for (flags, is_leaf) in self.points.values_mut().zip(leaves)
        {
            flags.set_is_leaf(is_leaf);
        }
    }

    ///
    /// Points in sequence order.
    ///
    pub fn points(&self) -> impl ExactSizeIterator<Item = &GridPoint> + '_
    {
        self.points.keys()
    }

    ///
    /// Points with their flags, in sequence order.
    ///
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&GridPoint, GridPointFlags)> + '_
    {
        self.points.iter().map(|(point, flags)| (point, *flags))
    }

    ///
    /// Exports `2^level` and `index` of every point as two row-major arrays
    /// with one row of `num_inputs` entries per sequence number.
    ///
    pub fn level_index_arrays(&self) -> (Vec<f64>, Vec<f64>)
    {
        let mut level = Vec::with_capacity(self.len() * self.num_inputs);
        let mut index = Vec::with_capacity(self.len() * self.num_inputs);
        for point in self.points()
        {
            level.extend(point.level.iter().map(|&l| (1_u64 << l) as f64));
            index.extend(point.index.iter().map(|&i| i as f64));
        }
        (level, index)
    }

    pub fn unit_coordinate(&self, seq: usize) -> Vec<f64>
    {
        self.point(seq).unit_coordinate()
    }

    ///
    /// Coordinate of a point in the bounding box.
    ///
    pub fn coordinate(&self, seq: usize) -> Vec<f64>
    {
        self.bounding_box.to_real_coordinate(&self.unit_coordinate(seq))
    }

    pub fn max_level(&self) -> u8
    {
        self.points().map(|point| point.level_max()).max().unwrap_or(0)
    }

    pub fn num_inner_points(&self) -> usize
    {
        self.points.values().filter(|flags| flags.is_inner()).count()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn three_point_storage() -> GridStorage
    {
        let mut storage = GridStorage::new(1, false);
        storage.insert(GridPoint::new(&[1], &[1])).unwrap();
        storage.insert(GridPoint::new(&[2], &[1])).unwrap();
        storage.insert(GridPoint::new(&[2], &[3])).unwrap();
        storage
    }

    #[test]
    fn insert_find_get()
    {
        let mut storage = GridStorage::new(2, false);
        let p = GridPoint::new(&[1, 2], &[1, 3]);
        let seq = storage.insert(p.clone()).unwrap();
        assert_eq!(storage.find(&p), Some(seq));
        assert_eq!(storage.get(seq).unwrap(), &p);
        // idempotent
        assert_eq!(storage.insert(p.clone()).unwrap(), seq);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn structural_errors()
    {
        let mut storage = GridStorage::new(2, false);
        assert!(matches!(storage.insert(GridPoint::new(&[2, 1], &[2, 1])), Err(SGError::InvalidPoint { dim: 0, .. })));
        assert!(matches!(storage.insert(GridPoint::new(&[1, 2], &[1, 5])), Err(SGError::InvalidPoint { dim: 1, .. })));
        assert!(matches!(storage.insert(GridPoint::new(&[0, 1], &[0, 1])), Err(SGError::InvalidPoint { dim: 0, .. })));
        assert!(matches!(storage.insert(GridPoint::new(&[1], &[1])), Err(SGError::PointDimensionMismatch { expected: 2, actual: 1 })));
        let mut boundary = GridStorage::new(1, true);
        assert!(boundary.insert(GridPoint::new(&[0], &[1])).is_ok());
        assert!(boundary.insert(GridPoint::new(&[0], &[2])).is_err());
        assert!(boundary.insert(GridPoint::new(&[32], &[1])).is_err());
    }

    #[test]
    fn leaf_flags_follow_inserts_and_deletes()
    {
        let mut storage = three_point_storage();
        assert!(!storage.is_leaf(0));
        assert!(storage.is_leaf(1));
        assert!(storage.is_leaf(2));
        storage.delete_sequence(1).unwrap();
        assert!(!storage.is_leaf(0));
        storage.delete_sequence(1).unwrap();
        assert!(storage.is_leaf(0));
    }

    #[test]
    fn delete_swaps_last_into_slot()
    {
        let mut storage = three_point_storage();
        let last = storage.point(2).clone();
        let removed = storage.delete_sequence(0).unwrap();
        assert_eq!(removed, GridPoint::new(&[1], &[1]));
        assert_eq!(storage.find(&last), Some(0));
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.delete_sequence(5), Err(SGError::SequenceOutOfRange { seq: 5, len: 2 }));
    }

    #[test]
    fn level_index_export()
    {
        let storage = three_point_storage();
        let (level, index) = storage.level_index_arrays();
        assert_eq!(level, vec![2.0, 4.0, 4.0]);
        assert_eq!(index, vec![1.0, 1.0, 3.0]);
    }

    #[test]
    fn display_lists_pairs()
    {
        assert_eq!(GridPoint::new(&[1, 0], &[1, 1]).to_string(), "[(1,1), (0,1)]");
    }

    #[test]
    fn serde_round_trip()
    {
        let storage = three_point_storage();
        let bytes = bincode::serde::encode_to_vec(&storage, bincode::config::standard()).unwrap();
        let (decoded, _): (GridStorage, usize) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(decoded.len(), 3);
        for (seq, point) in storage.points().enumerate()
        {
            assert_eq!(decoded.find(point), Some(seq));
            assert_eq!(decoded.is_leaf(seq), storage.is_leaf(seq));
        }
    }

    #[test]
    fn recalc_leaf_property_restores_flags()
    {
        let mut storage = GridStorage::new(3, true);
        crate::generators::regular_with_boundaries(&mut storage, &[2, 2, 2], None).unwrap();
        let expected: Vec<bool> = (0..storage.len()).map(|seq| storage.is_leaf(seq)).collect();
        for flags in storage.points.values_mut()
        {
            flags.set_is_leaf(false);
        }
        storage.recalc_leaf_property();
        for seq in 0..storage.len()
        {
            assert_eq!(storage.is_leaf(seq), !storage.has_children(storage.point(seq)));
            assert_eq!(storage.is_leaf(seq), expected[seq]);
        }
    }

    #[test]
    fn boundary_grid_statistics()
    {
        let bounding_box = BoundingBox::new(&[0.0, -1.0], &[2.0, 1.0]).unwrap();
        let mut storage = GridStorage::with_bounding_box(bounding_box, true).unwrap();
        crate::generators::regular_with_boundaries(&mut storage, &[2, 2], None).unwrap();
        assert_eq!(storage.len(), 21);
        assert_eq!(storage.max_level(), 2);
        assert_eq!(storage.num_inner_points(), 5);
        assert_eq!(storage.iter().filter(|(point, flags)| flags.is_inner() == point.is_inner_point()).count(), 21);

        let seq = storage.find(&GridPoint::new(&[1, 2], &[1, 3])).unwrap();
        assert_eq!(storage.unit_coordinate(seq), vec![0.5, 0.75]);
        assert_eq!(storage.coordinate(seq), vec![1.0, 0.5]);
        let anchor = storage.find(&GridPoint::new(&[0, 0], &[1, 0])).unwrap();
        assert_eq!(storage.coordinate(anchor), vec![2.0, -1.0]);

        assert_eq!(GridStorage::new(2, false).max_level(), 0);
    }

    #[test]
    fn lookup_errors()
    {
        let storage = three_point_storage();
        assert_eq!(storage.get(3), Err(SGError::SequenceOutOfRange { seq: 3, len: 3 }));
        assert!(storage.get(2).is_ok());
        assert_eq!(storage.find(&GridPoint::new(&[3], &[1])), None);
    }

    #[test]
    fn bounding_box_rejects_degenerate_intervals()
    {
        assert_eq!(BoundingBox::new(&[0.0, 0.0], &[1.0]), Err(SGError::PointDimensionMismatch { expected: 2, actual: 1 }));
        assert_eq!(BoundingBox::new(&[0.0, 1.0], &[1.0, 1.0]), Err(SGError::InvalidBoundingBox { dim: 1 }));
        assert_eq!(BoundingBox::new(&[2.0], &[1.0]), Err(SGError::InvalidBoundingBox { dim: 0 }));
        assert_eq!(BoundingBox::new(&[f64::NAN], &[1.0]), Err(SGError::InvalidBoundingBox { dim: 0 }));
        assert_eq!(BoundingBox::new(&[0.0], &[f64::INFINITY]), Err(SGError::InvalidBoundingBox { dim: 0 }));
        let inverted = BoundingBox { lower: vec![1.0], upper: vec![0.0] };
        assert!(GridStorage::with_bounding_box(inverted, false).is_err());
        let unit = BoundingBox::new(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(unit, BoundingBox::with_dim(2));
        assert_eq!(unit.volume(), 1.0);
    }
}
