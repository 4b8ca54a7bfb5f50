use rustc_hash::FxHashSet;

use crate::{errors::SGError, iterators::grid_iterator::GridIterator, storage::{GridPoint, GridStorage}};

///
/// Decides which leaves may be removed. Only leaves whose priority is below
/// the threshold are candidates; lower priorities are removed first.
///
pub trait CoarseningFunctor
{
    fn priority(&self, storage: &GridStorage, seq: usize) -> f64;

    ///
    /// Maximum number of points removed by a single `SparseGrid::coarsen` call.
    ///
    fn removements_num(&self) -> usize;

    fn threshold(&self) -> f64;

    fn validate(&self, _storage: &GridStorage) -> Result<(), SGError>
    {
        Ok(())
    }
}

///
/// True if a stored point outside `removed` requires `point` to be present.
///
fn is_required(storage: &GridStorage, point: &GridPoint, removed: &FxHashSet<usize>) -> bool
{
    let kept = |p: &GridPoint| storage.find(p).is_some_and(|seq| !removed.contains(&seq));
    (0..storage.num_inputs()).any(|dim|
    {
        let (level, index) = point.get(dim);
        if kept(&point.left_child(dim)) || point.right_child(dim).is_some_and(|child| kept(&child))
        {
            return true;
        }
        if level == 0
        {
            let mut partner = point.clone();
            partner.set(dim, 0, 1 - index.min(1));
            return kept(&partner);
        }
        false
    })
}

///
/// Removes up to `max_points` leaves with the lowest priority below the
/// functor's threshold. Returns the removed sequence numbers in the order the
/// deletions were applied (descending); replaying `swap_remove` with them on a
/// coefficient vector keeps it aligned with the storage, see
/// [`compact_coefficients`].
///
pub fn coarsen(storage: &mut GridStorage, functor: &dyn CoarseningFunctor, max_points: usize) -> Result<Vec<usize>, SGError>
{
    functor.validate(storage)?;
    let top = GridIterator::new(storage).seq();
    let threshold = functor.threshold();
    let mut candidates: Vec<(usize, f64)> = (0..storage.len())
        .filter(|&seq| storage.is_leaf(seq) && Some(seq) != top)
        .map(|seq| (seq, functor.priority(storage, seq)))
        .filter(|&(_, p)| p < threshold)
        .collect();
    let num_candidates = candidates.len();
    candidates.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    candidates.truncate(max_points);

    // Anchor pairs are removed together or not at all.
    let mut removed: FxHashSet<usize> = candidates.iter().map(|&(seq, _)| seq).collect();
    loop
    {
        let blocked: Vec<usize> = removed.iter().copied().filter(|&seq| is_required(storage, storage.point(seq), &removed)).collect();
        if blocked.is_empty()
        {
            break;
        }
        for seq in blocked
        {
            removed.remove(&seq);
        }
    }
    if removed.len() == storage.len()
    {
        if let Some(&last) = removed.iter().min()
        {
            removed.remove(&last);
        }
    }

    let mut order: Vec<usize> = removed.into_iter().collect();
    order.sort_unstable_by(|a, b| b.cmp(a));
    for &seq in &order
    {
        storage.delete_sequence(seq)?;
    }
    tracing::debug!(candidates = num_candidates, removed = order.len(), remaining = storage.len(), "coarsened grid");
    Ok(order)
}

///
/// Applies the deletions reported by [`coarsen`] to a vector indexed by sequence number.
///
pub fn compact_coefficients<T>(values: &mut Vec<T>, removed: &[usize])
{
    for &seq in removed
    {
        values.swap_remove(seq);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation}, generators,
        refinement::{surplus::SurplusCoarsening, user_defined::UserDefinedCoarsening}};

    #[test]
    fn removes_lowest_priority_leaves()
    {
        let mut storage = GridStorage::new(1, false);
        generators::regular(&mut storage, &[3], None).unwrap();
        let mut alpha: Vec<f64> = (0..storage.len()).map(|seq| storage.point(seq).index[0] as f64).collect();
        let functor = SurplusCoarsening::new(&alpha, 2, 6.0);
        let removed = coarsen(&mut storage, &functor, 2).unwrap();
        // leaves (3,1), (3,3), (3,5) have priority 1, 3, 5
        assert_eq!(removed, vec![4, 3]);
        compact_coefficients(&mut alpha, &removed);
        assert_eq!(storage.len(), 5);
        for seq in 0..storage.len()
        {
            assert_eq!(alpha[seq], storage.point(seq).index[0] as f64);
        }
        assert!(!storage.contains(&GridPoint::new(&[3], &[1])));
        assert!(storage.contains(&GridPoint::new(&[3], &[5])));
        assert!(storage.is_leaf(storage.find(&GridPoint::new(&[2], &[1])).unwrap()));
    }

    #[test]
    fn needed_ancestors_are_never_removed()
    {
        let mut storage = GridStorage::new(2, true);
        generators::regular_with_boundaries(&mut storage, &[3, 3], None).unwrap();
        let f = |point: &GridPoint, _seq: usize| point.level_sum() as f64;
        let functor = UserDefinedCoarsening::new(&f, usize::MAX, f64::MAX);
        loop
        {
            let removed = coarsen(&mut storage, &functor, usize::MAX).unwrap();
            for point in storage.points()
            {
                for dim in 0..2
                {
                    assert!(point.required_relatives(dim, true).iter().all(|r| storage.contains(r)));
                }
            }
            if removed.is_empty()
            {
                break;
            }
        }
        assert!(!storage.is_empty());
        assert!(storage.contains(&GridPoint::zero_index(2)));
    }

    #[test]
    fn small_surpluses_of_a_linear_function_vanish()
    {
        let mut storage = GridStorage::new(2, true);
        generators::regular_with_boundaries(&mut storage, &[3, 3], None).unwrap();
        let mut alpha: Vec<f64> = (0..storage.len()).map(|seq| { let x = storage.unit_coordinate(seq); 1.0 + x[0] + 2.0 * x[1] }).collect();
        LinearHierarchisationOperation.hierarchize(&storage, &mut alpha).unwrap();
        let before = storage.len();
        let functor = SurplusCoarsening::new(&alpha, usize::MAX, 1e-10);
        let removed = coarsen(&mut storage, &functor, usize::MAX).unwrap();
        compact_coefficients(&mut alpha, &removed);
        assert_eq!(storage.len() + removed.len(), before);
        assert_eq!(alpha.len(), storage.len());
        assert!(!removed.is_empty());
    }
}
