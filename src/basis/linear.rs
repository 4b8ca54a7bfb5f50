use super::base::Basis;

///
/// Piecewise linear hat functions. Level 0 holds the boundary functions
/// `1 - x` (index 0) and `x` (index 1).
///
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearBasis;

impl Basis for LinearBasis
{
    #[inline]
    fn eval(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 0
        {
            if index == 0
            {
                1.0 - x
            }
            else
            {
                x
            }
        }
        else
        {
            0.0_f64.max(1.0 - f64::abs((1_u64 << level) as f64 * x - index as f64))
        }
    }

    ///
    /// Derivative of the hat; at the kinks the right-hand derivative is returned.
    ///
    fn eval_deriv(&self, level: u32, index: u32, x: f64) -> f64 {
        if level == 0
        {
            return if index == 0 { -1.0 } else { 1.0 };
        }
        let scale = (1_u64 << level) as f64;
        let t = scale * x - index as f64;
        if !(-1.0..1.0).contains(&t)
        {
            0.0
        }
        else if t < 0.0
        {
            scale
        }
        else
        {
            -scale
        }
    }

    fn degree(&self) -> usize {
        1
    }

    #[inline]
    fn integral(&self, level: u32, _index: u32) -> f64 {
        if level == 0
        {
            0.5
        }
        else
        {
            1.0 / (1_u64 << level) as f64
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hats_and_anchors()
    {
        let basis = LinearBasis;
        assert_abs_diff_eq!(basis.eval(1, 1, 0.5), 1.0);
        assert_abs_diff_eq!(basis.eval(2, 3, 0.625), 0.5);
        assert_abs_diff_eq!(basis.eval(2, 1, 0.75), 0.0);
        assert_abs_diff_eq!(basis.eval(0, 0, 0.25), 0.75);
        assert_abs_diff_eq!(basis.eval(0, 1, 0.25), 0.25);
        assert_abs_diff_eq!(basis.eval_deriv(2, 1, 0.1), 4.0);
        assert_abs_diff_eq!(basis.eval_deriv(2, 1, 0.3), -4.0);
        assert_abs_diff_eq!(basis.eval_deriv(2, 1, 0.6), 0.0);
        assert_abs_diff_eq!(basis.integral(3, 5), 0.125);
    }
}
