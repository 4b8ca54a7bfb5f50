use crate::{basis::base::Basis, errors::{check_len, SGError}, storage::GridStorage};

///
/// Integral of the interpolant over the bounding box: every basis function
/// integrates to the product of its one-dimensional integrals.
///
pub fn integrate<B: Basis>(storage: &GridStorage, basis: &B, alpha: &[f64]) -> Result<f64, SGError>
{
    check_len(storage.len(), alpha.len())?;
    let sum: f64 = storage.points().zip(alpha).map(|(point, &a)|
    {
        let weight: f64 = point.level.iter().zip(&point.index).map(|(&l, &i)| basis.integral(l as u32, i)).product();
        a * weight
    }).sum();
    Ok(sum * storage.bounding_box().volume())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation}, basis::linear::LinearBasis, generators, storage::BoundingBox};
    use approx::assert_abs_diff_eq;

    #[test]
    fn quadratic_converges_to_one_sixth()
    {
        let mut previous = f64::MAX;
        for level in [3, 5, 7]
        {
            let mut storage = GridStorage::new(1, false);
            generators::regular(&mut storage, &[level], None).unwrap();
            let mut alpha: Vec<f64> = (0..storage.len()).map(|seq| { let x = storage.unit_coordinate(seq)[0]; x * (1.0 - x) }).collect();
            LinearHierarchisationOperation.hierarchize(&storage, &mut alpha).unwrap();
            let error = (integrate(&storage, &LinearBasis, &alpha).unwrap() - 1.0 / 6.0).abs();
            assert!(error < previous);
            previous = error;
        }
        assert!(previous < 1e-4);
    }

    #[test]
    fn linear_function_on_scaled_boundary_grid()
    {
        let mut storage = GridStorage::with_bounding_box(BoundingBox::new(&[0.0, 0.0], &[2.0, 3.0]).unwrap(), true).unwrap();
        generators::regular_with_boundaries(&mut storage, &[2, 2], None).unwrap();
        let mut alpha: Vec<f64> = (0..storage.len()).map(|seq| { let x = storage.coordinate(seq); x[0] + x[1] }).collect();
        LinearHierarchisationOperation.hierarchize(&storage, &mut alpha).unwrap();
        // ∫∫ (x + y) over [0,2]x[0,3] = 6 + 9
        assert_abs_diff_eq!(integrate(&storage, &LinearBasis, &alpha).unwrap(), 15.0, epsilon = 1e-12);
    }
}
