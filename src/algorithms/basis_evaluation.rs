use crate::{basis::base::Basis, errors::{check_len, SGError}, iterators::grid_iterator::GridIterator, storage::GridStorage};

///
/// Evaluates `Σ alpha_j φ_j(x)` by descending, per dimension, only into the
/// subtree whose support contains `x`.
///
pub struct BasisEvaluation<'a, B: Basis>
{
    storage: &'a GridStorage,
    basis: B,
}

impl<'a, B: Basis> BasisEvaluation<'a, B>
{
    pub fn new(storage: &'a GridStorage, basis: B) -> Self
    {
        Self { storage, basis }
    }

    fn start(&self, iterator: &mut GridIterator, dim: usize) -> bool
    {
        if self.storage.has_boundary()
        {
            iterator.reset_to_left_level_zero(dim)
        }
        else
        {
            iterator.reset_to_level_one(dim)
        }
    }

    fn next(&self, unit: &[f64], dim: usize, value: f64, iterator: &mut GridIterator, alpha: &[f64]) -> f64
    {
        if dim + 1 == unit.len()
        {
            iterator.seq().map_or(0.0, |seq| alpha[seq] * value)
        }
        else
        {
            self.recursive_eval(unit, dim + 1, value, iterator, alpha)
        }
    }

    fn recursive_eval(&self, unit: &[f64], dim: usize, value: f64, iterator: &mut GridIterator, alpha: &[f64]) -> f64
    {
        let x = unit[dim];
        let mut sum = 0.0;
        if self.storage.has_boundary()
        {
            if iterator.reset_to_left_level_zero(dim)
            {
                sum += self.next(unit, dim, value * self.basis.eval(0, 0, x), iterator, alpha);
            }
            if iterator.reset_to_right_level_zero(dim)
            {
                sum += self.next(unit, dim, value * self.basis.eval(0, 1, x), iterator, alpha);
            }
            iterator.reset_to_level_one(dim);
        }
        while iterator.seq().is_some()
        {
            let (level, index) = iterator.get(dim);
            let phi = self.basis.eval(level as u32, index, x);
            if phi != 0.0
            {
                sum += self.next(unit, dim, value * phi, iterator, alpha);
            }
            if iterator.hint(dim)
            {
                break;
            }
            if x * ((1_u64 << level) as f64) < index as f64
            {
                iterator.left_child(dim);
            }
            else
            {
                iterator.right_child(dim);
            }
        }
        self.start(iterator, dim);
        sum
    }

    ///
    /// Evaluates the interpolant at `x` (coordinates in the bounding box).
    ///
    pub fn eval(&self, alpha: &[f64], x: &[f64]) -> Result<f64, SGError>
    {
        check_len(self.storage.len(), alpha.len())?;
        if !self.storage.bounding_box().contains(x)
        {
            return Err(SGError::OutOfDomain);
        }
        if self.storage.is_empty() || self.storage.num_inputs() == 0
        {
            return Ok(0.0);
        }
        let unit = self.storage.bounding_box().to_unit_coordinate(x);
        let mut iterator = GridIterator::new(self.storage);
        Ok(self.recursive_eval(&unit, 0, 1.0, &mut iterator, alpha))
    }
}
