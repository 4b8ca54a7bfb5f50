///
/// One-dimensional hierarchical basis. A multi-dimensional basis function is
/// the tensor product of one 1D function per dimension.
///
pub trait Basis : Send + Sync
{
    fn eval(&self, level: u32, index: u32, x: f64) -> f64;
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64;
    fn degree(&self) -> usize;
    /// Integral of the basis function over the unit interval.
    fn integral(&self, level: u32, index: u32) -> f64;
}
