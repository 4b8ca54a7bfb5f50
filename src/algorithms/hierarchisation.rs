use crate::{algorithms::sweep::{self, SweepFunction}, errors::{check_len, SGError}, iterators::grid_iterator::GridIterator, storage::GridStorage};

pub trait HierarchisationOperation : Copy
{
    ///
    /// Converts nodal values into hierarchical surpluses, in place.
    ///
    fn hierarchize(&self, storage: &GridStorage, node_values: &mut [f64]) -> Result<(), SGError>;
    ///
    /// Converts hierarchical surpluses back into nodal values, in place.
    ///
    fn dehierarchize(&self, storage: &GridStorage, alpha: &mut [f64]) -> Result<(), SGError>;
}

pub struct LinearHierarchisation;

impl LinearHierarchisation
{
    fn recurse(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, left: f64, right: f64)
    {
        if let Some(seq) = iterator.seq()
        {
            let mid = source[seq];
            if !iterator.hint(dim)
            {
                if iterator.left_child(dim)
                {
                    Self::recurse(source, result, iterator, dim, left, mid);
                }
                if iterator.step_right(dim)
                {
                    Self::recurse(source, result, iterator, dim, mid, right);
                }
                iterator.up(dim);
            }
            result[seq] = mid - 0.5 * (left + right);
        }
    }
}

impl SweepFunction for LinearHierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        Self::recurse(source, result, iterator, dim, 0.0, 0.0);
    }
}

///
/// Boundary variant: the anchors of a line are kept and serve as the left
/// and right values of the level-one root.
///
pub struct LinearBoundaryHierarchisation;

impl SweepFunction for LinearBoundaryHierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        let left = iterator.seq().map_or(0.0, |seq| source[seq]);
        let right = if iterator.reset_to_right_level_zero(dim) { iterator.seq().map_or(0.0, |seq| source[seq]) } else { 0.0 };
        if iterator.reset_to_level_one(dim)
        {
            LinearHierarchisation::recurse(source, result, iterator, dim, left, right);
        }
        iterator.reset_to_left_level_zero(dim);
    }
}

pub struct LinearDehierarchisation;

impl LinearDehierarchisation
{
    fn recurse(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, left: f64, right: f64)
    {
        if let Some(seq) = iterator.seq()
        {
            let mid = source[seq] + 0.5 * (left + right);
            result[seq] = mid;
            if !iterator.hint(dim)
            {
                if iterator.left_child(dim)
                {
                    Self::recurse(source, result, iterator, dim, left, mid);
                }
                if iterator.step_right(dim)
                {
                    Self::recurse(source, result, iterator, dim, mid, right);
                }
                iterator.up(dim);
            }
        }
    }
}

impl SweepFunction for LinearDehierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        Self::recurse(source, result, iterator, dim, 0.0, 0.0);
    }
}

pub struct LinearBoundaryDehierarchisation;

impl SweepFunction for LinearBoundaryDehierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        let left = iterator.seq().map_or(0.0, |seq| source[seq]);
        let right = if iterator.reset_to_right_level_zero(dim) { iterator.seq().map_or(0.0, |seq| source[seq]) } else { 0.0 };
        if iterator.reset_to_level_one(dim)
        {
            LinearDehierarchisation::recurse(source, result, iterator, dim, left, right);
        }
        iterator.reset_to_left_level_zero(dim);
    }
}

fn sweep_all<F: SweepFunction>(function: &F, storage: &GridStorage, values: &mut [f64]) -> Result<(), SGError>
{
    check_len(storage.len(), values.len())?;
    for d in 0..storage.num_inputs()
    {
        let source = values.to_vec();
        sweep::sweep_1d(function, storage, &source, values, d)?;
    }
    Ok(())
}

///
/// Hierarchisation for piecewise linear hats, with or without boundary anchors.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearHierarchisationOperation;

impl HierarchisationOperation for LinearHierarchisationOperation
{
    fn hierarchize(&self, storage: &GridStorage, node_values: &mut [f64]) -> Result<(), SGError>
    {
        if storage.has_boundary()
        {
            sweep_all(&LinearBoundaryHierarchisation, storage, node_values)
        }
        else
        {
            sweep_all(&LinearHierarchisation, storage, node_values)
        }
    }

    fn dehierarchize(&self, storage: &GridStorage, alpha: &mut [f64]) -> Result<(), SGError>
    {
        if storage.has_boundary()
        {
            sweep_all(&LinearBoundaryDehierarchisation, storage, alpha)
        }
        else
        {
            sweep_all(&LinearDehierarchisation, storage, alpha)
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators;
    use approx::assert_abs_diff_eq;

    fn sample(storage: &GridStorage, f: impl Fn(&[f64]) -> f64) -> Vec<f64>
    {
        (0..storage.len()).map(|seq| f(&storage.unit_coordinate(seq))).collect()
    }

    #[test]
    fn one_dimensional_surpluses()
    {
        let mut storage = GridStorage::new(1, false);
        generators::regular(&mut storage, &[2], None).unwrap();
        // (1,1), (2,1), (2,3)
        let mut values = vec![1.0, 0.5, 0.5];
        LinearHierarchisationOperation.hierarchize(&storage, &mut values).unwrap();
        assert_abs_diff_eq!(values[0], 1.0);
        assert_abs_diff_eq!(values[1], 0.0);
        assert_abs_diff_eq!(values[2], 0.0);
    }

    #[test]
    fn linear_function_has_no_inner_surplus_on_boundary_grid()
    {
        let mut storage = GridStorage::new(2, true);
        generators::regular_with_boundaries(&mut storage, &[3, 3], None).unwrap();
        let mut values = sample(&storage, |x| 1.0 + 2.0 * x[0] - x[1]);
        LinearHierarchisationOperation.hierarchize(&storage, &mut values).unwrap();
        for seq in 0..storage.len()
        {
            if storage.point(seq).level_max() > 0
            {
                assert_abs_diff_eq!(values[seq], 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn round_trip_restores_values()
    {
        for has_boundary in [false, true]
        {
            let mut storage = GridStorage::new(3, has_boundary);
            if has_boundary
            {
                generators::regular_with_boundaries(&mut storage, &[3, 3, 3], None).unwrap();
            }
            else
            {
                generators::regular(&mut storage, &[4, 4, 4], None).unwrap();
            }
            let nodal = sample(&storage, |x| (x[0] * 3.0).sin() * x[1] * x[1] + (x[2] - 0.3).exp());
            let mut values = nodal.clone();
            LinearHierarchisationOperation.hierarchize(&storage, &mut values).unwrap();
            LinearHierarchisationOperation.dehierarchize(&storage, &mut values).unwrap();
            for (a, b) in values.iter().zip(&nodal)
            {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn length_is_checked()
    {
        let mut storage = GridStorage::new(2, false);
        generators::regular(&mut storage, &[2, 2], None).unwrap();
        let mut values = vec![0.0; 3];
        assert_eq!(LinearHierarchisationOperation.hierarchize(&storage, &mut values), Err(SGError::DimensionMismatch { expected: 5, actual: 3 }));
    }
}
