use crate::{algorithms::{coarsening::CoarseningFunctor, refinement::RefinementFunctor}, errors::{check_len, SGError}, storage::GridStorage};

///
/// Refines points with large absolute surplus.
///
pub struct SurplusRefinement<'a>
{
    alpha: &'a [f64],
    refinements_num: usize,
    threshold: f64,
}

impl<'a> SurplusRefinement<'a>
{
    pub fn new(alpha: &'a [f64], refinements_num: usize, threshold: f64) -> Self
    {
        Self { alpha, refinements_num, threshold }
    }
}

impl RefinementFunctor for SurplusRefinement<'_>
{
    #[inline]
    fn priority(&self, _storage: &GridStorage, seq: usize) -> f64
    {
        self.alpha[seq].abs()
    }

    fn refinements_num(&self) -> usize
    {
        self.refinements_num
    }

    fn threshold(&self) -> f64
    {
        self.threshold
    }

    fn validate(&self, storage: &GridStorage) -> Result<(), SGError>
    {
        check_len(storage.len(), self.alpha.len())
    }
}

///
/// Removes leaves with small absolute surplus.
///
pub struct SurplusCoarsening<'a>
{
    alpha: &'a [f64],
    removements_num: usize,
    threshold: f64,
}

impl<'a> SurplusCoarsening<'a>
{
    pub fn new(alpha: &'a [f64], removements_num: usize, threshold: f64) -> Self
    {
        Self { alpha, removements_num, threshold }
    }
}

impl CoarseningFunctor for SurplusCoarsening<'_>
{
    #[inline]
    fn priority(&self, _storage: &GridStorage, seq: usize) -> f64
    {
        self.alpha[seq].abs()
    }

    fn removements_num(&self) -> usize
    {
        self.removements_num
    }

    fn threshold(&self) -> f64
    {
        self.threshold
    }

    fn validate(&self, storage: &GridStorage) -> Result<(), SGError>
    {
        check_len(storage.len(), self.alpha.len())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{algorithms::refinement::{refine, RefinementOptions}, generators};

    #[test]
    fn surplus_length_is_checked()
    {
        let mut storage = GridStorage::new(1, false);
        generators::regular(&mut storage, &[2], None).unwrap();
        let alpha = [1.0, 2.0];
        let functor = SurplusRefinement::new(&alpha, 1, 0.0);
        assert_eq!(refine(&mut storage, &functor, 1, &RefinementOptions::default()), Err(SGError::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[test]
    fn surplus_priority_is_absolute_value()
    {
        let mut storage = GridStorage::new(1, false);
        generators::regular(&mut storage, &[2], None).unwrap();
        let alpha = [1.0, -2.0, 0.5];
        let functor = SurplusRefinement::new(&alpha, 1, 0.0);
        assert_eq!(functor.eval(&storage), vec![1.0, 2.0, 0.5]);
        let added = refine(&mut storage, &functor, 1, &RefinementOptions::default()).unwrap();
        assert_eq!(added.len(), 2);
        assert!(storage.find(&crate::storage::GridPoint::new(&[3], &[1])).is_some());
    }
}
