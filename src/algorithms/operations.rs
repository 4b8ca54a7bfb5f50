use crate::{algorithms::updown::{KernelWeights, UpDown}, errors::{check_len, SGError}, storage::GridStorage};

///
/// L2 inner product of linear hats: `∫ φ_p φ_q dx`.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearMassWeights;

impl KernelWeights for LinearMassWeights
{
    #[inline]
    fn weight_left(&self, level: u8, _index: u32) -> f64
    {
        0.5 / (1_u64 << level) as f64
    }

    #[inline]
    fn weight_right(&self, level: u8, _index: u32) -> f64
    {
        0.5 / (1_u64 << level) as f64
    }

    #[inline]
    fn diagonal(&self, level: u8, _index: u32) -> f64
    {
        2.0 / 3.0 / (1_u64 << level) as f64
    }

    fn boundary_diagonal(&self) -> f64
    {
        1.0 / 3.0
    }

    fn boundary_coupling(&self) -> f64
    {
        1.0 / 6.0
    }

    fn width_scaling(&self, width: f64) -> f64
    {
        width
    }
}

///
/// H1 semi inner product of linear hats: `∫ φ_p' φ_q' dx`. Hats of different
/// levels are orthogonal, so only the diagonal and the anchors couple.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearStiffnessWeights;

impl KernelWeights for LinearStiffnessWeights
{
    #[inline]
    fn weight_left(&self, _level: u8, _index: u32) -> f64
    {
        0.0
    }

    #[inline]
    fn weight_right(&self, _level: u8, _index: u32) -> f64
    {
        0.0
    }

    #[inline]
    fn diagonal(&self, level: u8, _index: u32) -> f64
    {
        (1_u64 << (level + 1)) as f64
    }

    fn boundary_diagonal(&self) -> f64
    {
        1.0
    }

    fn boundary_coupling(&self) -> f64
    {
        -1.0
    }

    fn width_scaling(&self, width: f64) -> f64
    {
        1.0 / width
    }
}

///
/// Matrix-free operator `result = A * alpha` on the coefficient vector of a grid.
///
pub trait OperationMatrix
{
    fn mult(&self, alpha: &[f64], result: &mut [f64]) -> Result<(), SGError>;

    ///
    /// Same result as `mult`, with independent partial products computed in parallel.
    ///
    #[cfg(feature = "rayon")]
    fn mult_parallel(&self, alpha: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        self.mult(alpha, result)
    }
}

fn check_args(storage: &GridStorage, alpha: &[f64], result: &mut [f64]) -> Result<bool, SGError>
{
    check_len(storage.len(), alpha.len())?;
    check_len(storage.len(), result.len())?;
    if storage.is_empty() || storage.num_inputs() == 0
    {
        result.fill(0.0);
        return Ok(false);
    }
    Ok(true)
}

///
/// Mass matrix `M_pq = ∫ φ_p φ_q dx` over the bounding box.
///
pub struct MassMatrix<'a>
{
    updown: UpDown<'a, LinearMassWeights, LinearMassWeights>,
}

impl<'a> MassMatrix<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        Self { updown: UpDown::new(storage, LinearMassWeights, LinearMassWeights) }
    }
}

impl OperationMatrix for MassMatrix<'_>
{
    fn mult(&self, alpha: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        let storage = self.updown.storage();
        if !check_args(storage, alpha, result)?
        {
            return Ok(());
        }
        tracing::trace!(points = storage.len(), "mass matrix product");
        self.updown.updown(alpha, result, storage.num_inputs() - 1, None)
    }
}

///
/// Laplace (stiffness) matrix `L_pq = Σ_d c_d ∫ ∂_d φ_p ∂_d φ_q dx` over the
/// bounding box. Without coefficients every `c_d` is one.
///
pub struct LaplaceMatrix<'a>
{
    updown: UpDown<'a, LinearMassWeights, LinearStiffnessWeights>,
    coefficients: Option<Vec<f64>>,
}

impl<'a> LaplaceMatrix<'a>
{
    pub fn new(storage: &'a GridStorage) -> Self
    {
        Self { updown: UpDown::new(storage, LinearMassWeights, LinearStiffnessWeights), coefficients: None }
    }

    ///
    /// Laplace operator with one scaling coefficient per dimension.
    ///
    pub fn with_coefficients(storage: &'a GridStorage, coefficients: Vec<f64>) -> Result<Self, SGError>
    {
        check_len(storage.num_inputs(), coefficients.len())?;
        Ok(Self { updown: UpDown::new(storage, LinearMassWeights, LinearStiffnessWeights), coefficients: Some(coefficients) })
    }

    fn coefficient(&self, op_dim: usize) -> f64
    {
        self.coefficients.as_ref().map_or(1.0, |c| c[op_dim])
    }

    fn partial(&self, alpha: &[f64], op_dim: usize) -> Result<Vec<f64>, SGError>
    {
        let storage = self.updown.storage();
        let mut beta = vec![0.0; alpha.len()];
        self.updown.updown(alpha, &mut beta, storage.num_inputs() - 1, Some(op_dim))?;
        let c = self.coefficient(op_dim);
        if c != 1.0
        {
            beta.iter_mut().for_each(|b| *b *= c);
        }
        Ok(beta)
    }
}

impl OperationMatrix for LaplaceMatrix<'_>
{
    fn mult(&self, alpha: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        let storage = self.updown.storage();
        if !check_args(storage, alpha, result)?
        {
            return Ok(());
        }
        tracing::trace!(points = storage.len(), dims = storage.num_inputs(), "laplace matrix product");
        result.fill(0.0);
        for op_dim in 0..storage.num_inputs()
        {
            let beta = self.partial(alpha, op_dim)?;
            result.iter_mut().zip(&beta).for_each(|(r, b)| *r += b);
        }
        Ok(())
    }

    #[cfg(feature = "rayon")]
    fn mult_parallel(&self, alpha: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        use rayon::prelude::*;
        let storage = self.updown.storage();
        if !check_args(storage, alpha, result)?
        {
            return Ok(());
        }
        let n = alpha.len();
        let sum = (0..storage.num_inputs()).into_par_iter()
            .map(|op_dim| self.partial(alpha, op_dim))
            .try_reduce(|| vec![0.0; n], |mut a, b|
            {
                a.iter_mut().zip(&b).for_each(|(x, y)| *x += y);
                Ok(a)
            })?;
        result.copy_from_slice(&sum);
        Ok(())
    }
}
