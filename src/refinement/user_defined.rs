use crate::{algorithms::{coarsening::CoarseningFunctor, refinement::RefinementFunctor}, storage::{GridPoint, GridStorage}};

///
/// A function that defines the priority of a grid point.
///
/// # Arguments
/// - `point`: The grid point.
/// - `seq`: Its sequence number, to look up coefficients captured by the closure.
///
pub type UserPriorityFunction<'a> = dyn Fn(&GridPoint, usize) -> f64 + 'a;

pub struct UserDefinedRefinement<'a>
{
    pub fun_eval: &'a UserPriorityFunction<'a>,
    pub refinements_num: usize,
    pub threshold: f64,
}

impl<'a> UserDefinedRefinement<'a>
{
    pub fn new(fun_eval: &'a UserPriorityFunction<'a>, refinements_num: usize, threshold: f64) -> Self
    {
        Self { fun_eval, refinements_num, threshold }
    }
}

impl RefinementFunctor for UserDefinedRefinement<'_>
{
    fn priority(&self, storage: &GridStorage, seq: usize) -> f64
    {
        (self.fun_eval)(storage.point(seq), seq)
    }

    fn refinements_num(&self) -> usize
    {
        self.refinements_num
    }

    fn threshold(&self) -> f64
    {
        self.threshold
    }
}

pub struct UserDefinedCoarsening<'a>
{
    pub fun_eval: &'a UserPriorityFunction<'a>,
    pub removements_num: usize,
    pub threshold: f64,
}

impl<'a> UserDefinedCoarsening<'a>
{
    pub fn new(fun_eval: &'a UserPriorityFunction<'a>, removements_num: usize, threshold: f64) -> Self
    {
        Self { fun_eval, removements_num, threshold }
    }
}

impl CoarseningFunctor for UserDefinedCoarsening<'_>
{
    fn priority(&self, storage: &GridStorage, seq: usize) -> f64
    {
        (self.fun_eval)(storage.point(seq), seq)
    }

    fn removements_num(&self) -> usize
    {
        self.removements_num
    }

    fn threshold(&self) -> f64
    {
        self.threshold
    }
}
