use crate::algorithms::basis_evaluation::BasisEvaluation;
use crate::algorithms::coarsening::{self, CoarseningFunctor};
use crate::algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation};
use crate::algorithms::integration;
use crate::algorithms::operations::{LaplaceMatrix, MassMatrix};
use crate::algorithms::refinement::{self, RefinementFunctor, RefinementOptions};
use crate::basis::linear::LinearBasis;
use crate::errors::SGError;
use crate::generators;
use crate::storage::{BoundingBox, GridPoint, GridStorage};
use serde::{Serialize, Deserialize};

///
/// A piecewise linear sparse grid. The grid owns its points; coefficient
/// vectors (nodal values or surpluses, indexed by sequence number) are owned
/// by the caller.
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SparseGrid
{
    pub(crate) storage: GridStorage,
}

impl SparseGrid
{
    pub fn new(num_inputs: usize, has_boundary: bool) -> Self
    {
        Self { storage: GridStorage::new(num_inputs, has_boundary) }
    }

    pub fn with_bounding_box(bounding_box: BoundingBox, has_boundary: bool) -> Result<Self, SGError>
    {
        Ok(Self { storage: GridStorage::with_bounding_box(bounding_box, has_boundary)? })
    }

    pub fn bounding_box(&self) -> &BoundingBox
    {
        self.storage.bounding_box()
    }

    pub fn is_empty(&self) -> bool
    {
        self.storage.is_empty()
    }

    pub fn len(&self) -> usize
    {
        self.storage.len()
    }

    pub fn num_inputs(&self) -> usize
    {
        self.storage.num_inputs()
    }

    pub fn has_boundary(&self) -> bool
    {
        self.storage.has_boundary()
    }

    pub fn storage(&self) -> &GridStorage
    {
        &self.storage
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = &GridPoint> + '_
    {
        self.storage.points()
    }

    ///
    /// Coordinates of all points in the bounding box, row-major.
    ///
    pub fn coordinates(&self) -> Vec<f64>
    {
        (0..self.len()).flat_map(|seq| self.storage.coordinate(seq)).collect()
    }

    ///
    /// Adds a regular sparse grid of level `levels`; boundary grids get the
    /// trapezoid boundary.
    ///
    pub fn sparse_grid(&mut self, levels: &[usize]) -> Result<(), SGError>
    {
        if self.has_boundary()
        {
            generators::regular_with_boundaries(&mut self.storage, levels, None)
        }
        else
        {
            generators::regular(&mut self.storage, levels, None)
        }
    }

    pub fn full_grid(&mut self, level: usize) -> Result<(), SGError>
    {
        if self.has_boundary()
        {
            generators::full_with_boundaries(&mut self.storage, level)
        }
        else
        {
            generators::full(&mut self.storage, level)
        }
    }

    ///
    /// Samples `f` at every grid point (real coordinates).
    ///
    pub fn sample<F: Fn(&[f64]) -> f64>(&self, f: F) -> Vec<f64>
    {
        (0..self.len()).map(|seq| f(&self.storage.coordinate(seq))).collect()
    }

    pub fn hierarchize(&self, values: &mut [f64]) -> Result<(), SGError>
    {
        LinearHierarchisationOperation.hierarchize(&self.storage, values)
    }

    pub fn dehierarchize(&self, alpha: &mut [f64]) -> Result<(), SGError>
    {
        LinearHierarchisationOperation.dehierarchize(&self.storage, alpha)
    }

    pub fn mass_matrix(&self) -> MassMatrix<'_>
    {
        MassMatrix::new(&self.storage)
    }

    pub fn laplace_matrix(&self) -> LaplaceMatrix<'_>
    {
        LaplaceMatrix::new(&self.storage)
    }

    ///
    /// Evaluates the interpolant with surpluses `alpha` at `x`.
    ///
    pub fn eval(&self, alpha: &[f64], x: &[f64]) -> Result<f64, SGError>
    {
        BasisEvaluation::new(&self.storage, LinearBasis).eval(alpha, x)
    }

    ///
    /// Evaluates the interpolant at every point of `x` (row-major, `num_inputs` per point).
    ///
    #[cfg(feature = "rayon")]
    pub fn eval_batch(&self, alpha: &[f64], x: &[f64]) -> Result<Vec<f64>, SGError>
    {
        use rayon::{iter::{IndexedParallelIterator, ParallelIterator}, slice::{ParallelSlice, ParallelSliceMut}};
        let num_inputs = self.num_inputs().max(1);
        if x.len() % num_inputs != 0
        {
            return Err(SGError::DimensionMismatch { expected: x.len() / num_inputs * num_inputs, actual: x.len() });
        }
        let op = BasisEvaluation::new(&self.storage, LinearBasis);
        let mut results = vec![0.0; x.len() / num_inputs];
        x.par_chunks_exact(num_inputs).zip(results.par_chunks_exact_mut(1)).try_for_each(|(x, y)| -> Result<(), SGError>
        {
            y[0] = op.eval(alpha, x)?;
            Ok(())
        })?;
        Ok(results)
    }

    pub fn integrate(&self, alpha: &[f64]) -> Result<f64, SGError>
    {
        integration::integrate(&self.storage, &LinearBasis, alpha)
    }

    ///
    /// Refines up to `functor.refinements_num()` points. New points get a zero
    /// surplus, so the interpolant is unchanged; returns their sequence numbers.
    ///
    /// `coarsen` does not compact `alpha` the same way: its functor usually
    /// borrows the surpluses, so the caller applies the returned deletions
    /// afterwards with
    /// [`compact_coefficients`](crate::algorithms::coarsening::compact_coefficients).
    ///
    pub fn refine(&mut self, functor: &dyn RefinementFunctor, options: &RefinementOptions, alpha: &mut Vec<f64>) -> Result<Vec<usize>, SGError>
    {
        crate::errors::check_len(self.len(), alpha.len())?;
        let added = refinement::refine(&mut self.storage, functor, functor.refinements_num(), options)?;
        alpha.resize(self.len(), 0.0);
        Ok(added)
    }

    ///
    /// Removes up to `functor.removements_num()` leaves. Vectors indexed by
    /// sequence number must be compacted with
    /// [`compact_coefficients`](crate::algorithms::coarsening::compact_coefficients).
    ///
    pub fn coarsen(&mut self, functor: &dyn CoarseningFunctor) -> Result<Vec<usize>, SGError>
    {
        coarsening::coarsen(&mut self.storage, functor, functor.removements_num())
    }

    pub fn num_refinable_points(&self, options: &RefinementOptions) -> Result<usize, SGError>
    {
        refinement::num_refinable_points(&self.storage, options)
    }
}
