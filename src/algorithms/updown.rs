use crate::{algorithms::sweep::{self, SweepFunction}, errors::{check_len, SGError}, iterators::grid_iterator::GridIterator, storage::GridStorage};

///
/// Closed-form one-dimensional coupling constants of a bilinear form
/// `a(φ_p, φ_q)` between piecewise linear hats on the unit interval.
///
/// `weight_left`/`weight_right` couple a point with the hierarchical
/// function values left and right of its support, `diagonal` is `a(φ, φ)`.
/// The boundary terms couple the two level-0 anchors.
///
pub trait KernelWeights : Send + Sync
{
    fn weight_left(&self, level: u8, index: u32) -> f64;
    fn weight_right(&self, level: u8, index: u32) -> f64;
    fn diagonal(&self, level: u8, index: u32) -> f64;
    fn boundary_diagonal(&self) -> f64;
    fn boundary_coupling(&self) -> f64;
    ///
    /// Factor applied to a 1D result for an interval of `width`.
    ///
    fn width_scaling(&self, width: f64) -> f64;
}

///
/// One-dimensional operator split into the contributions of coarser (`up`)
/// and finer-or-equal (`down`) hierarchical levels.
///
pub trait OneDimOperator : Send + Sync
{
    fn up(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>;
    fn down(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>;
}

struct Up<'w, W: KernelWeights>(&'w W);
struct Down<'w, W: KernelWeights>(&'w W);

///
/// Returns `(fl, fr)`: the integrals of the line's subtree against the linear
/// functions that are one at the left (right) end of the current support.
///
fn up_recursive<W: KernelWeights>(weights: &W, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> (f64, f64)
{
    let Some(seq) = iterator.seq() else { return (0.0, 0.0) };
    let (mut fl, mut fr) = (0.0, 0.0);
    let (mut fml, mut fmr) = (0.0, 0.0);
    if !iterator.hint(dim)
    {
        if iterator.left_child(dim)
        {
            (fl, fml) = up_recursive(weights, source, result, iterator, dim);
        }
        if iterator.step_right(dim)
        {
            (fmr, fr) = up_recursive(weights, source, result, iterator, dim);
        }
        iterator.up(dim);
    }
    let (level, index) = iterator.get(dim);
    let fm = fml + fmr;
    let alpha = source[seq];
    result[seq] = fm;
    fl += fm / 2.0 + alpha * weights.weight_left(level, index);
    fr += fm / 2.0 + alpha * weights.weight_right(level, index);
    (fl, fr)
}

fn down_recursive<W: KernelWeights>(weights: &W, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, fl: f64, fr: f64)
{
    let Some(seq) = iterator.seq() else { return };
    let (level, index) = iterator.get(dim);
    let alpha = source[seq];
    result[seq] = weights.weight_left(level, index) * fl + weights.weight_right(level, index) * fr + weights.diagonal(level, index) * alpha;
    let fm = (fl + fr) / 2.0 + alpha;
    if !iterator.hint(dim)
    {
        if iterator.left_child(dim)
        {
            down_recursive(weights, source, result, iterator, dim, fl, fm);
        }
        if iterator.step_right(dim)
        {
            down_recursive(weights, source, result, iterator, dim, fm, fr);
        }
        iterator.up(dim);
    }
}

///
/// Reads the right anchor of the line and leaves the cursor on the level-one root.
///
fn anchors(iterator: &mut GridIterator, dim: usize) -> (Option<usize>, Option<usize>)
{
    let left = iterator.seq();
    iterator.reset_to_right_level_zero(dim);
    let right = iterator.seq();
    iterator.reset_to_level_one(dim);
    (left, right)
}

impl<W: KernelWeights> SweepFunction for Up<'_, W>
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        if !iterator.storage.has_boundary()
        {
            up_recursive(self.0, source, result, iterator, dim);
            return;
        }
        let (left, right) = anchors(iterator, dim);
        let (fl, fr) = up_recursive(self.0, source, result, iterator, dim);
        iterator.reset_to_left_level_zero(dim);
        let alpha_right = right.map_or(0.0, |seq| source[seq]);
        if let Some(seq) = left
        {
            result[seq] = fl + self.0.boundary_coupling() * alpha_right;
        }
        if let Some(seq) = right
        {
            result[seq] = fr;
        }
    }
}

impl<W: KernelWeights> SweepFunction for Down<'_, W>
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize)
    {
        if !iterator.storage.has_boundary()
        {
            down_recursive(self.0, source, result, iterator, dim, 0.0, 0.0);
            return;
        }
        let (left, right) = anchors(iterator, dim);
        let alpha_left = left.map_or(0.0, |seq| source[seq]);
        let alpha_right = right.map_or(0.0, |seq| source[seq]);
        if let Some(seq) = left
        {
            result[seq] = self.0.boundary_diagonal() * alpha_left;
        }
        if let Some(seq) = right
        {
            result[seq] = self.0.boundary_diagonal() * alpha_right + self.0.boundary_coupling() * alpha_left;
        }
        down_recursive(self.0, source, result, iterator, dim, alpha_left, alpha_right);
        iterator.reset_to_left_level_zero(dim);
    }
}

fn run<F: SweepFunction, W: KernelWeights>(function: &F, weights: &W, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
{
    result.fill(0.0);
    sweep::sweep_1d(function, storage, source, result, dim)?;
    let scale = weights.width_scaling(storage.bounding_box().width(dim));
    if scale != 1.0
    {
        result.iter_mut().for_each(|r| *r *= scale);
    }
    Ok(())
}

impl<W: KernelWeights> OneDimOperator for W
{
    fn up(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        run(&Up(self), self, storage, source, result, dim)
    }

    fn down(&self, storage: &GridStorage, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        run(&Down(self), self, storage, source, result, dim)
    }
}

///
/// Matrix-free application of a tensor-product operator. `kernel` is applied
/// in every dimension except `op_dim`, where `op_kernel` is used instead.
///
pub struct UpDown<'a, K: OneDimOperator, O: OneDimOperator>
{
    storage: &'a GridStorage,
    kernel: K,
    op_kernel: O,
}

impl<'a, K: OneDimOperator, O: OneDimOperator> UpDown<'a, K, O>
{
    pub fn new(storage: &'a GridStorage, kernel: K, op_kernel: O) -> Self
    {
        Self { storage, kernel, op_kernel }
    }

    pub fn storage(&self) -> &'a GridStorage
    {
        self.storage
    }

    fn up(&self, op: bool, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        if op
        {
            self.op_kernel.up(self.storage, source, result, dim)
        }
        else
        {
            self.kernel.up(self.storage, source, result, dim)
        }
    }

    fn down(&self, op: bool, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        if op
        {
            self.op_kernel.down(self.storage, source, result, dim)
        }
        else
        {
            self.kernel.down(self.storage, source, result, dim)
        }
    }

    ///
    /// Applies the operator restricted to dimensions `0..=dim` and writes the
    /// product into `result`. `op_dim` selects the dimension that uses the
    /// operator kernel; `None` applies the plain kernel everywhere.
    ///
    pub fn updown(&self, alpha: &[f64], result: &mut [f64], dim: usize, op_dim: Option<usize>) -> Result<(), SGError>
    {
        let n = self.storage.len();
        check_len(n, alpha.len())?;
        check_len(n, result.len())?;
        let num_dims = self.storage.num_inputs();
        if dim >= num_dims
        {
            return Err(SGError::InvalidDimension { dim, num_dims });
        }
        if let Some(op_dim) = op_dim.filter(|&d| d >= num_dims)
        {
            return Err(SGError::InvalidDimension { dim: op_dim, num_dims });
        }
        self.updown_recursive(alpha, result, dim, op_dim)
    }

    fn updown_recursive(&self, alpha: &[f64], result: &mut [f64], dim: usize, op_dim: Option<usize>) -> Result<(), SGError>
    {
        let op = op_dim == Some(dim);
        let n = alpha.len();
        if dim == 0
        {
            self.up(op, alpha, result, 0)?;
            let mut temp = vec![0.0; n];
            self.down(op, alpha, &mut temp, 0)?;
            result.iter_mut().zip(&temp).for_each(|(r, t)| *r += t);
            return Ok(());
        }
        let mut temp = vec![0.0; n];
        self.up(op, alpha, &mut temp, dim)?;
        self.updown_recursive(&temp, result, dim - 1, op_dim)?;

        let mut temp_two = vec![0.0; n];
        self.updown_recursive(alpha, &mut temp_two, dim - 1, op_dim)?;
        self.down(op, &temp_two, &mut temp, dim)?;
        result.iter_mut().zip(&temp).for_each(|(r, t)| *r += t);
        Ok(())
    }
}
