use crate::{errors::SGError, storage::{GridPoint, GridStorage}};

fn check_storage(storage: &GridStorage, levels: &[usize], has_boundary: bool) -> Result<(), SGError>
{
    if storage.has_boundary() != has_boundary
    {
        return Err(SGError::BoundaryMismatch { expected: has_boundary });
    }
    if levels.len() != storage.num_inputs()
    {
        return Err(SGError::PointDimensionMismatch { expected: storage.num_inputs(), actual: levels.len() });
    }
    Ok(())
}

///
/// Writes the generated points into the storage. Leaf flags are derived on
/// insertion, so the order of `points` does not matter.
///
fn insert_all(storage: &mut GridStorage, points: Vec<GridPoint>) -> Result<(), SGError>
{
    let before = storage.len();
    for point in points
    {
        storage.insert(point)?;
    }
    tracing::trace!(added = storage.len() - before, total = storage.len(), "generated grid points");
    Ok(())
}

///
/// Generate a regular sparse grid iteratively without grid points on the boundary.
///
#[allow(non_snake_case)]
fn regular_iterative(num_inputs: usize, levels: &[usize], T: Option<f64>) -> Vec<GridPoint>
{
    let mut list = Vec::new();
    if num_inputs == 0
    {
        return list;
    }
    let mut point = GridPoint::root(num_inputs);
    // default to zero (sparse grid)
    let t = T.unwrap_or(0.0);
    for l in 1..=levels[0]
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            point.set(0, l as u8, i);
            list.push(point.clone());
        }
    }
    // Loop over the intermediate grid once per remaining dimension and
    // expand every point in dimension d.
    for d in 1..num_inputs
    {
        let ngrids = list.len();
        let n = levels[d];
        for g in 0..ngrids
        {
            let mut first = true;
            let mut point = list[g].clone();
            let level_sum = point.level_sum() as usize - 1;
            let level_max = point.level_max() as usize;
            let mut l = 1;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= (n + num_inputs - 1) as f64 - t * n as f64 && l.max(level_max) <= n
            {
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    if first
                    {
                        list[g] = point.clone();
                        first = false;
                    }
                    else
                    {
                        list.push(point.clone());
                    }
                }
                l += 1;
            }
        }
    }
    list
}

///
/// Generates a regular sparse grid of level `levels` without boundaries.
/// For details about T, see pages 8-9 of Griebel and Knapek's "Optimized
/// Tensor-Product Approximation Spaces". `T = 0` gives the classical sparse grid.
///
#[allow(non_snake_case)]
pub fn regular(storage: &mut GridStorage, levels: &[usize], T: Option<f64>) -> Result<(), SGError>
{
    check_storage(storage, levels, false)?;
    let points = regular_iterative(storage.num_inputs(), levels, T);
    insert_all(storage, points)
}

///
/// Generates a full grid of level `level` (every level combination up to
/// `level`) without boundaries.
///
pub fn full(storage: &mut GridStorage, level: usize) -> Result<(), SGError>
{
    check_storage(storage, &vec![level; storage.num_inputs()], false)?;
    let points = full_iterative(storage.num_inputs(), level, false);
    insert_all(storage, points)
}

///
/// Generates a full grid of level `level` including both anchors of every dimension.
///
pub fn full_with_boundaries(storage: &mut GridStorage, level: usize) -> Result<(), SGError>
{
    check_storage(storage, &vec![level; storage.num_inputs()], true)?;
    let points = full_iterative(storage.num_inputs(), level, true);
    insert_all(storage, points)
}

fn full_iterative(num_inputs: usize, level: usize, with_boundary: bool) -> Vec<GridPoint>
{
    let mut one_d = Vec::new();
    if with_boundary
    {
        one_d.push((0, 0));
        one_d.push((0, 1));
    }
    for l in 1..=level
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            one_d.push((l as u8, i));
        }
    }
    if num_inputs == 0 || one_d.is_empty()
    {
        return Vec::new();
    }
    let mut list = vec![GridPoint::root(num_inputs)];
    for d in 0..num_inputs
    {
        let mut next = Vec::with_capacity(list.len() * one_d.len());
        for point in &list
        {
            for &(l, i) in &one_d
            {
                let mut p = point.clone();
                p.set(d, l, i);
                next.push(p);
            }
        }
        list = next;
    }
    list
}

///
/// Generates a regular sparse grid of level `levels` with boundaries. A point
/// with `k` anchor dimensions is kept while its level sum stays within the
/// bound of the `D - k` dimensional interior grid, so every boundary face
/// carries the full sparse grid of its dimension.
///
#[allow(non_snake_case)]
pub fn regular_with_boundaries(storage: &mut GridStorage, levels: &[usize], T: Option<f64>) -> Result<(), SGError>
{
    check_storage(storage, levels, true)?;
    let points = regular_with_boundaries_iterative(storage.num_inputs(), levels, T);
    insert_all(storage, points)
}

#[allow(non_snake_case)]
fn regular_with_boundaries_iterative(num_inputs: usize, levels: &[usize], T: Option<f64>) -> Vec<GridPoint>
{
    let mut list = Vec::new();
    if num_inputs == 0
    {
        return list;
    }
    let mut point = GridPoint::root(num_inputs);
    let t = T.unwrap_or(0.0);
    point.set(0, 0, 0);
    list.push(point.clone());
    point.set(0, 0, 1);
    list.push(point.clone());
    for l in 1..=levels[0]
    {
        for i in (1..(1_u32 << l)).step_by(2)
        {
            point.set(0, l as u8, i);
            list.push(point.clone());
        }
    }
    for d in 1..num_inputs
    {
        let ngrids = list.len();
        let n = levels[d];
        for g in 0..ngrids
        {
            let mut point = list[g].clone();
            let level_sum: usize = point.level[..d].iter().map(|&l| l as usize).sum();
            let num_zero_levels = point.level[..d].iter().filter(|&&l| l == 0).count();

            // Anchors in d add one more zero level.
            let mut first = true;
            if level_sum + num_zero_levels < n + d || num_zero_levels == d
            {
                point.set(d, 0, 0);
                list[g] = point.clone();
                point.set(d, 0, 1);
                list.push(point.clone());
                first = false;
            }
            let upper_bound = (n + d - num_zero_levels) as f64 - t * n as f64;
            let level_max = point.level_max() as usize;
            let mut l = 1;
            while (l + level_sum) as f64 - t * l.max(level_max) as f64 <= upper_bound && l.max(level_max) <= n
            {
                for i in (1..(1_u32 << l)).step_by(2)
                {
                    point.set(d, l as u8, i);
                    if first
                    {
                        list[g] = point.clone();
                        first = false;
                    }
                    else
                    {
                        list.push(point.clone());
                    }
                }
                l += 1;
            }
        }
    }
    list
}

#[test]
fn check_regular_counts()
{
    let mut storage = GridStorage::new(1, false);
    regular(&mut storage, &[3], None).unwrap();
    assert_eq!(storage.len(), 7);

    let mut storage = GridStorage::new(2, false);
    regular(&mut storage, &[2, 2], None).unwrap();
    assert_eq!(storage.len(), 5);

    let mut storage = GridStorage::new(2, false);
    regular(&mut storage, &[3, 3], None).unwrap();
    assert_eq!(storage.len(), 17);
}

#[test]
fn check_full_counts()
{
    let mut storage = GridStorage::new(2, false);
    full(&mut storage, 2).unwrap();
    assert_eq!(storage.len(), 9);

    let mut storage = GridStorage::new(2, true);
    full_with_boundaries(&mut storage, 1).unwrap();
    assert_eq!(storage.len(), 9);
}

#[test]
fn check_boundary_counts()
{
    let mut storage = GridStorage::new(1, true);
    regular_with_boundaries(&mut storage, &[2], None).unwrap();
    assert_eq!(storage.len(), 5);

    let mut storage = GridStorage::new(2, true);
    regular_with_boundaries(&mut storage, &[1, 1], None).unwrap();
    assert_eq!(storage.len(), 9);

    let mut storage = GridStorage::new(2, true);
    regular_with_boundaries(&mut storage, &[2, 2], None).unwrap();
    assert_eq!(storage.len(), 21);

    let mut storage = GridStorage::new(2, true);
    regular_with_boundaries(&mut storage, &[3, 3], None).unwrap();
    assert_eq!(storage.len(), 49);
}

#[test]
fn generated_leaves_match_children()
{
    let mut storage = GridStorage::new(3, false);
    regular(&mut storage, &[3, 3, 3], None).unwrap();
    for seq in 0..storage.len()
    {
        assert_eq!(storage.is_leaf(seq), !storage.has_children(storage.point(seq)));
        assert!(storage.point(seq).level_sum() <= 5);
    }
}

#[test]
fn generator_rejects_wrong_storage()
{
    let mut storage = GridStorage::new(2, true);
    assert_eq!(regular(&mut storage, &[2, 2], None), Err(SGError::BoundaryMismatch { expected: false }));
    let mut storage = GridStorage::new(2, false);
    assert_eq!(regular(&mut storage, &[2], None), Err(SGError::PointDimensionMismatch { expected: 2, actual: 1 }));
}

#[cfg(test)]
fn is_complete(storage: &GridStorage) -> bool
{
    storage.points().all(|point|
        (0..storage.num_inputs()).all(|dim| point.required_relatives(dim, storage.has_boundary()).iter().all(|r| storage.contains(r))))
}

#[test]
fn generated_grids_are_complete()
{
    for num_inputs in 1..=4
    {
        for level in 1..=4
        {
            let levels = vec![level; num_inputs];
            let mut storage = GridStorage::new(num_inputs, false);
            regular(&mut storage, &levels, None).unwrap();
            assert!(is_complete(&storage));

            let mut storage = GridStorage::new(num_inputs, true);
            regular_with_boundaries(&mut storage, &levels, None).unwrap();
            assert!(is_complete(&storage));

            let mut storage = GridStorage::new(num_inputs, true);
            full_with_boundaries(&mut storage, level.min(2)).unwrap();
            assert!(is_complete(&storage));
        }
    }
    let mut storage = GridStorage::new(3, true);
    regular_with_boundaries(&mut storage, &[2, 4, 3], None).unwrap();
    assert!(is_complete(&storage));
}

#[test]
fn boundary_grids_interpolate_at_their_points()
{
    use crate::algorithms::{basis_evaluation::BasisEvaluation, hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation}};
    use crate::basis::linear::LinearBasis;
    let f = |x: &[f64]| (x[0] * 3.0).sin() + x[1] * x[1] * (1.0 + x[0]);
    for level in 1..=4
    {
        let mut storage = GridStorage::new(2, true);
        regular_with_boundaries(&mut storage, &[level, level], None).unwrap();
        let values: Vec<f64> = (0..storage.len()).map(|seq| f(&storage.unit_coordinate(seq))).collect();
        let mut alpha = values.clone();
        LinearHierarchisationOperation.hierarchize(&storage, &mut alpha).unwrap();
        let evaluation = BasisEvaluation::new(&storage, LinearBasis);
        for (seq, value) in values.iter().enumerate()
        {
            let x = storage.coordinate(seq);
            approx::assert_abs_diff_eq!(evaluation.eval(&alpha, &x).unwrap(), *value, epsilon = 1e-12);
        }
    }
}
