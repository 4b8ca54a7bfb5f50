use crate::{errors::SGError, storage::{GridPoint, GridStorage, MAX_LEVEL}};

#[derive(Default, Debug, Clone)]
pub struct RefinementOptions
{
    /// Per-dimension maximum level of newly created children.
    pub level_limits: Option<Vec<u8>>,
}

impl RefinementOptions
{
    pub fn with_level_limits(level_limits: Vec<u8>) -> Self
    {
        Self { level_limits: Some(level_limits) }
    }

    fn limits(&self, storage: &GridStorage) -> Result<Vec<u8>, SGError>
    {
        match self.level_limits.as_ref()
        {
            Some(limits) if limits.len() != storage.num_inputs() =>
                Err(SGError::PointDimensionMismatch { expected: storage.num_inputs(), actual: limits.len() }),
            Some(limits) => Ok(limits.iter().map(|&l| l.min(MAX_LEVEL)).collect()),
            None => Ok(vec![MAX_LEVEL; storage.num_inputs()]),
        }
    }
}

///
/// Decides which points are refined. The priority of a point may look at the
/// point itself and at any coefficient vector the functor borrows.
///
pub trait RefinementFunctor
{
    fn priority(&self, storage: &GridStorage, seq: usize) -> f64;

    ///
    /// Maximum number of points refined by a single `SparseGrid::refine` call.
    ///
    fn refinements_num(&self) -> usize;

    ///
    /// Points are only refined if their priority exceeds this value.
    ///
    fn threshold(&self) -> f64;

    ///
    /// Baseline priority; points at or below it are never refined.
    ///
    fn start(&self) -> f64
    {
        0.0
    }

    ///
    /// Checks that the functor can be evaluated on `storage`.
    ///
    fn validate(&self, _storage: &GridStorage) -> Result<(), SGError>
    {
        Ok(())
    }

    ///
    /// Priorities of all points, indexed by sequence number.
    ///
    fn eval(&self, storage: &GridStorage) -> Vec<f64>
    {
        (0..storage.len()).map(|seq| self.priority(storage, seq)).collect()
    }
}

///
/// True if at least one child of `point`, within the level limits, is not stored.
///
fn is_refinable(storage: &GridStorage, point: &GridPoint, level_limits: &[u8]) -> bool
{
    (0..storage.num_inputs()).any(|dim|
    {
        let (level, _) = point.get(dim);
        if level >= level_limits[dim]
        {
            return false;
        }
        !storage.contains(&point.left_child(dim)) || point.right_child(dim).is_some_and(|child| !storage.contains(&child))
    })
}

///
/// Returns the number of grid points that can be refined.
///
pub fn num_refinable_points(storage: &GridStorage, options: &RefinementOptions) -> Result<usize, SGError>
{
    let limits = options.limits(storage)?;
    Ok(storage.points().filter(|point| is_refinable(storage, point, &limits)).count())
}

///
/// Inserts `point` together with every missing required relative (parents in
/// all dimensions and, for anchors, the opposite anchor). Returns the number
/// of points added.
///
pub fn insert_with_ancestors(storage: &mut GridStorage, point: GridPoint) -> Result<usize, SGError>
{
    if storage.contains(&point)
    {
        return Ok(0);
    }
    storage.validate(&point)?;
    let has_boundary = storage.has_boundary();
    let mut added = 0;
    for dim in 0..storage.num_inputs()
    {
        for parent in point.parents(dim, has_boundary)
        {
            added += insert_with_ancestors(storage, parent)?;
        }
    }
    storage.insert(point.clone())?;
    added += 1;
    for dim in 0..storage.num_inputs()
    {
        if point.get(dim).0 == 0
        {
            for partner in point.required_relatives(dim, has_boundary)
            {
                added += insert_with_ancestors(storage, partner)?;
            }
        }
    }
    Ok(added)
}

///
/// Creates the children of `point` in direction `dim`. Returns the number of
/// points added.
///
pub fn refine_1d(storage: &mut GridStorage, point: &GridPoint, dim: usize) -> Result<usize, SGError>
{
    let mut added = insert_with_ancestors(storage, point.left_child(dim))?;
    if let Some(right) = point.right_child(dim)
    {
        added += insert_with_ancestors(storage, right)?;
    }
    Ok(added)
}

///
/// Refines up to `max_points` refinable points with the highest priority.
/// Points with equal priority are taken in ascending sequence order. Returns
/// the sequence numbers of the created points.
///
pub fn refine(storage: &mut GridStorage, functor: &dyn RefinementFunctor, max_points: usize, options: &RefinementOptions) -> Result<Vec<usize>, SGError>
{
    functor.validate(storage)?;
    let limits = options.limits(storage)?;
    let original_number = storage.len();
    let priorities = functor.eval(storage);
    let mut candidates: Vec<(usize, f64)> = storage.points().enumerate()
        .filter(|(_, point)| is_refinable(storage, point, &limits))
        .map(|(seq, _)| (seq, priorities[seq]))
        .collect();
    let num_candidates = candidates.len();
    candidates.retain(|&(_, p)| p > functor.start() && p > functor.threshold());
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    candidates.truncate(max_points);

    let selected: Vec<GridPoint> = candidates.iter().map(|&(seq, _)| storage.point(seq).clone()).collect();
    for point in &selected
    {
        for dim in 0..storage.num_inputs()
        {
            if point.get(dim).0 >= limits[dim]
            {
                continue;
            }
            refine_1d(storage, point, dim)?;
        }
    }
    tracing::debug!(candidates = num_candidates, selected = selected.len(), added = storage.len() - original_number, "refined grid");
    Ok((original_number..storage.len()).collect())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{generators, refinement::user_defined::UserDefinedRefinement};

    fn is_complete(storage: &GridStorage) -> bool
    {
        storage.points().all(|point|
        {
            (0..storage.num_inputs()).all(|dim| point.required_relatives(dim, storage.has_boundary()).iter().all(|r| storage.contains(r)))
        })
    }

    #[test]
    fn insert_with_ancestors_closes_the_grid()
    {
        let mut storage = GridStorage::new(2, false);
        let added = insert_with_ancestors(&mut storage, GridPoint::new(&[3, 2], &[5, 1])).unwrap();
        // (1,1)x{1,2} plus (2,3)x{1,2} plus (3,5)x{1,2}
        assert_eq!(added, 6);
        assert_eq!(storage.len(), 6);
        assert!(is_complete(&storage));
        assert_eq!(insert_with_ancestors(&mut storage, GridPoint::new(&[2, 1], &[1, 1])).unwrap(), 1);
        assert_eq!(storage.len(), 7);

        let mut storage = GridStorage::new(2, true);
        insert_with_ancestors(&mut storage, GridPoint::new(&[2, 0], &[3, 1])).unwrap();
        assert!(is_complete(&storage));
        assert!(storage.contains(&GridPoint::new(&[0, 0], &[0, 0])));
        assert!(storage.contains(&GridPoint::new(&[2, 0], &[3, 0])));
    }

    #[test]
    fn refine_adds_children_of_highest_priority()
    {
        let mut storage = GridStorage::new(1, false);
        generators::regular(&mut storage, &[2], None).unwrap();
        let target = GridPoint::new(&[2], &[3]);
        let f = |point: &GridPoint, _seq: usize| if point.get(0) == (2, 3) { 1.0 } else { 0.5 };
        let functor = UserDefinedRefinement::new(&f, 1, 0.1);
        let added = refine(&mut storage, &functor, 1, &RefinementOptions::default()).unwrap();
        assert_eq!(added, vec![3, 4]);
        assert!(storage.contains(&GridPoint::new(&[3], &[5])));
        assert!(storage.contains(&GridPoint::new(&[3], &[7])));
        assert!(!storage.is_leaf(storage.find(&target).unwrap()));
        assert!(is_complete(&storage));
    }

    #[test]
    fn refine_never_shrinks_and_keeps_completeness()
    {
        let mut storage = GridStorage::new(3, true);
        generators::regular_with_boundaries(&mut storage, &[2, 2, 2], None).unwrap();
        let f = |point: &GridPoint, seq: usize| point.level_sum() as f64 + (seq % 3) as f64;
        let functor = UserDefinedRefinement::new(&f, 4, 0.0);
        for _ in 0..3
        {
            let before = storage.len();
            let added = refine(&mut storage, &functor, 4, &RefinementOptions::default()).unwrap();
            assert_eq!(storage.len(), before + added.len());
            assert!(!added.is_empty());
            assert!(is_complete(&storage));
            for seq in 0..storage.len()
            {
                assert_eq!(storage.is_leaf(seq), !storage.has_children(storage.point(seq)));
            }
        }
    }

    #[test]
    fn equal_priorities_follow_sequence_order()
    {
        // refines the first `k` refinable points by hand, in sequence order
        fn refine_first(storage: &GridStorage, k: usize) -> GridStorage
        {
            let limits = vec![MAX_LEVEL; storage.num_inputs()];
            let first: Vec<GridPoint> = storage.points().filter(|p| is_refinable(storage, p, &limits)).take(k).cloned().collect();
            let mut expected = storage.clone();
            for point in &first
            {
                for dim in 0..storage.num_inputs()
                {
                    refine_1d(&mut expected, point, dim).unwrap();
                }
            }
            expected
        }

        let mut forward = GridStorage::new(2, false);
        generators::regular(&mut forward, &[3, 3], None).unwrap();
        let mut reversed = GridStorage::new(2, false);
        for point in forward.points().collect::<Vec<_>>().into_iter().rev()
        {
            reversed.insert(point.clone()).unwrap();
        }

        let constant = |_: &GridPoint, _: usize| 1.0;
        let from_point = |point: &GridPoint, _: usize| point.level_sum() as f64 / point.level_sum() as f64;
        let mut selections = Vec::new();
        for storage in [forward, reversed]
        {
            let expected = refine_first(&storage, 3);
            let mut a = storage.clone();
            refine(&mut a, &UserDefinedRefinement::new(&constant, 3, 0.0), 3, &RefinementOptions::default()).unwrap();
            let mut b = storage.clone();
            refine(&mut b, &UserDefinedRefinement::new(&from_point, 3, 0.0), 3, &RefinementOptions::default()).unwrap();
            assert_eq!(a.points().collect::<Vec<_>>(), expected.points().collect::<Vec<_>>());
            assert_eq!(b.points().collect::<Vec<_>>(), expected.points().collect::<Vec<_>>());
            let mut points: Vec<String> = a.points().map(|p| p.to_string()).collect();
            points.sort();
            selections.push(points);
        }
        // the insertion order decides which points win the tie
        assert_ne!(selections[0], selections[1]);
    }

    #[test]
    fn priorities_at_or_below_threshold_are_skipped()
    {
        let mut storage = GridStorage::new(2, false);
        generators::regular(&mut storage, &[2, 2], None).unwrap();
        let f = |_: &GridPoint, _: usize| 0.5;
        let functor = UserDefinedRefinement::new(&f, 10, 0.5);
        assert!(refine(&mut storage, &functor, 10, &RefinementOptions::default()).unwrap().is_empty());
        assert_eq!(storage.len(), 5);
    }

    #[test]
    fn level_limits_stop_refinement()
    {
        let mut storage = GridStorage::new(2, false);
        generators::regular(&mut storage, &[2, 2], None).unwrap();
        let options = RefinementOptions::with_level_limits(vec![2, 3]);
        let f = |_: &GridPoint, _: usize| 1.0;
        let functor = UserDefinedRefinement::new(&f, 100, 0.0);
        refine(&mut storage, &functor, 100, &options).unwrap();
        assert!(storage.points().all(|p| p.level[0] <= 2 && p.level[1] <= 3));
        assert!(storage.points().any(|p| p.level[1] == 3));
        let refinable = num_refinable_points(&storage, &options).unwrap();
        assert!(refinable > 0);
        assert!(num_refinable_points(&storage, &RefinementOptions::with_level_limits(vec![1])).is_err());
    }
}
