use crate::{errors::{check_len, SGError}, iterators::grid_iterator::GridIterator, storage::GridStorage};

///
/// One-dimensional operation applied to every line of the grid in the sweep
/// dimension. `execute` is called with the cursor on the line start: the
/// level-one root of the line, or its left anchor on boundary grids. The
/// cursor must be restored to that position before returning.
///
pub trait SweepFunction
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize);
}

fn sweep_recursive<F: SweepFunction + ?Sized>(function: &F, source: &[f64], result: &mut [f64], iterator: &mut GridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize)
{
    function.execute(source, result, iterator, dim_sweep);
    for d in 0..dim_rem
    {
        let cur_dim = dim_list[d];
        if iterator.hint(cur_dim)
        {
            continue;
        }
        if iterator.left_child(cur_dim)
        {
            sweep_recursive(function, source, result, iterator, dim_list, d + 1, dim_sweep);
        }
        if iterator.step_right(cur_dim)
        {
            sweep_recursive(function, source, result, iterator, dim_list, d + 1, dim_sweep);
        }
        iterator.up(cur_dim);
    }
}

fn sweep_boundary_recursive<F: SweepFunction + ?Sized>(function: &F, source: &[f64], result: &mut [f64], iterator: &mut GridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize)
{
    if dim_rem == 0
    {
        function.execute(source, result, iterator, dim_sweep);
        return;
    }
    let d = dim_list[dim_rem - 1];
    let (level, _) = iterator.get(d);
    if level > 0
    {
        sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep);
        if !iterator.hint(d)
        {
            if iterator.left_child(d)
            {
                sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep);
            }
            if iterator.step_right(d)
            {
                sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep);
            }
            iterator.up(d);
        }
    }
    else
    {
        sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep);
        if iterator.reset_to_right_level_zero(d)
        {
            sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep);
        }
        if iterator.reset_to_level_one(d)
        {
            sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep);
        }
        iterator.reset_to_left_level_zero(d);
    }
}

///
/// Applies `function` to every line of `storage` in direction `dim_sweep`,
/// reading `source` and writing `result` (both indexed by sequence number).
///
pub fn sweep_1d<F: SweepFunction + ?Sized>(function: &F, storage: &GridStorage, source: &[f64], result: &mut [f64], dim_sweep: usize) -> Result<(), SGError>
{
    let ndim = storage.num_inputs();
    if dim_sweep >= ndim
    {
        return Err(SGError::InvalidDimension { dim: dim_sweep, num_dims: ndim });
    }
    check_len(storage.len(), source.len())?;
    check_len(storage.len(), result.len())?;
    let dim_list: Vec<usize> = (0..ndim).filter(|&d| d != dim_sweep).collect();
    let mut iterator = GridIterator::new(storage);
    if iterator.seq().is_none()
    {
        return Ok(());
    }
    if storage.has_boundary()
    {
        sweep_boundary_recursive(function, source, result, &mut iterator, &dim_list, ndim - 1, dim_sweep);
    }
    else
    {
        sweep_recursive(function, source, result, &mut iterator, &dim_list, ndim - 1, dim_sweep);
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators;
    use std::cell::RefCell;

    struct LineStarts(RefCell<Vec<usize>>);

    impl SweepFunction for LineStarts
    {
        fn execute(&self, _source: &[f64], result: &mut [f64], iterator: &mut GridIterator, _dim: usize)
        {
            if let Some(seq) = iterator.seq()
            {
                result[seq] += 1.0;
                self.0.borrow_mut().push(seq);
            }
        }
    }

    #[test]
    fn every_line_visited_once()
    {
        let mut storage = GridStorage::new(3, false);
        generators::regular(&mut storage, &[3, 3, 3], None).unwrap();
        let source = vec![0.0; storage.len()];
        for dim in 0..3
        {
            let function = LineStarts(RefCell::new(Vec::new()));
            let mut result = vec![0.0; storage.len()];
            sweep_1d(&function, &storage, &source, &mut result, dim).unwrap();
            let expected: Vec<usize> = (0..storage.len()).filter(|&seq| storage.level(seq, dim) == 1).collect();
            let mut visited = function.0.into_inner();
            visited.sort();
            assert_eq!(visited, expected);
        }
    }

    #[test]
    fn boundary_lines_start_at_left_anchor()
    {
        let mut storage = GridStorage::new(2, true);
        generators::regular_with_boundaries(&mut storage, &[2, 2], None).unwrap();
        let source = vec![0.0; storage.len()];
        let function = LineStarts(RefCell::new(Vec::new()));
        let mut result = vec![0.0; storage.len()];
        sweep_1d(&function, &storage, &source, &mut result, 1).unwrap();
        let mut visited = function.0.into_inner();
        visited.sort();
        let expected: Vec<usize> = (0..storage.len()).filter(|&seq| storage.point(seq).get(1) == (0, 0)).collect();
        assert_eq!(visited, expected);
    }

    #[test]
    fn sweep_checks_arguments()
    {
        let mut storage = GridStorage::new(2, false);
        generators::regular(&mut storage, &[2, 2], None).unwrap();
        let source = vec![0.0; storage.len()];
        let mut result = vec![0.0; 2];
        let function = LineStarts(RefCell::new(Vec::new()));
        assert_eq!(sweep_1d(&function, &storage, &source, &mut result, 2), Err(SGError::InvalidDimension { dim: 2, num_dims: 2 }));
        assert_eq!(sweep_1d(&function, &storage, &source, &mut result, 0), Err(SGError::DimensionMismatch { expected: 5, actual: 2 }));
    }
}
