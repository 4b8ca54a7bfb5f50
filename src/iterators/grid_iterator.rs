use crate::storage::{GridPoint, GridStorage};

///
/// Cursor over the implicit per-dimension binary trees of a grid. Navigation
/// only rewrites the (level, index) pair of the current point; presence is
/// always resolved by a storage lookup, so a cursor may sit on an absent point.
///
#[derive(Clone)]
pub struct GridIterator<'a>
{
    pub(crate) storage: &'a GridStorage,
    point: GridPoint,
    seq: Option<usize>,
}

impl<'a> GridIterator<'a>
{
    ///
    /// Creates a cursor on the top of the grid: the all-anchor point for
    /// boundary grids and the level-one root otherwise.
    ///
    pub fn new(storage: &'a GridStorage) -> Self
    {
        let point = if storage.has_boundary()
        {
            GridPoint::zero_index(storage.num_inputs())
        }
        else
        {
            GridPoint::root(storage.num_inputs())
        };
        let seq = storage.find(&point);
        Self { storage, point, seq }
    }

    pub fn set_point(&mut self, point: GridPoint)
    {
        self.point = point;
        self.resolve();
    }

    #[inline(always)]
    fn resolve(&mut self) -> bool
    {
        self.seq = self.storage.find(&self.point);
        self.seq.is_some()
    }

    #[inline(always)]
    pub fn point(&self) -> &GridPoint
    {
        &self.point
    }

    #[inline(always)]
    pub fn seq(&self) -> Option<usize>
    {
        self.seq
    }

    #[inline(always)]
    pub fn get(&self, dim: usize) -> (u8, u32)
    {
        self.point.get(dim)
    }

    ///
    /// Moves to the left child in `dim`. The child of an anchor is the level-one root.
    ///
    pub fn left_child(&mut self, dim: usize) -> bool
    {
        let (level, index) = self.point.get(dim);
        if level == 0
        {
            self.point.set(dim, 1, 1);
        }
        else
        {
            self.point.set(dim, level + 1, 2 * index - 1);
        }
        self.resolve()
    }

    pub fn right_child(&mut self, dim: usize) -> bool
    {
        let (level, index) = self.point.get(dim);
        self.point.set(dim, level + 1, 2 * index + 1);
        self.resolve()
    }

    ///
    /// Moves to the right sibling: same level, same parent.
    ///
    pub fn step_right(&mut self, dim: usize) -> bool
    {
        let (level, index) = self.point.get(dim);
        self.point.set(dim, level, index + 2);
        self.resolve()
    }

    ///
    /// Moves to the parent. The level-one root goes back to the left anchor,
    /// undoing `left_child`; anchors have no parent and leave the cursor unresolved.
    ///
    pub fn up(&mut self, dim: usize) -> bool
    {
        let (level, index) = self.point.get(dim);
        match level
        {
            0 =>
            {
                self.seq = None;
                return false;
            }
            1 => self.point.set(dim, 0, 0),
            _ => self.point.set(dim, level - 1, (index >> 1) | 1),
        }
        self.resolve()
    }

    pub fn reset_to_left_level_zero(&mut self, dim: usize) -> bool
    {
        self.point.set(dim, 0, 0);
        self.resolve()
    }

    pub fn reset_to_right_level_zero(&mut self, dim: usize) -> bool
    {
        self.point.set(dim, 0, 1);
        self.resolve()
    }

    pub fn reset_to_level_one(&mut self, dim: usize) -> bool
    {
        self.point.set(dim, 1, 1);
        self.resolve()
    }

    ///
    /// Moves to the left anchor in every dimension.
    ///
    pub fn reset_to_level_zero(&mut self) -> bool
    {
        self.point.level.fill(0);
        self.point.index.fill(0);
        self.resolve()
    }

    ///
    /// True iff the current point has no stored child in `dim`. Absent points are leaves.
    ///
    pub fn hint(&self, dim: usize) -> bool
    {
        match self.seq
        {
            Some(seq) => self.storage.is_leaf(seq) || !self.storage.has_children_in(&self.point, dim),
            None => true,
        }
    }

    ///
    /// True iff the current point has no stored child in any dimension.
    ///
    pub fn is_leaf(&self) -> bool
    {
        self.seq.map_or(true, |seq| self.storage.is_leaf(seq))
    }
}
