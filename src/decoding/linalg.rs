//! Symmetric linear algebra for covariance-sized matrices, on `nalgebra`.
//!
//! The generalized symmetric-definite eigenproblem `A·w = λ·B·w` is reduced to a
//! standard one by Cholesky whitening (`B = L·Lᵀ`, `P = L⁻¹·A·L⁻ᵀ`).
//! Back-transformed eigenvectors `w = L⁻ᵀ·v` are B-orthonormal (`Wᵀ·B·W = I`).
//! The rest of the crate works in `ndarray`, so inputs and outputs are
//! converted at this boundary.
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use thiserror::Error;
/// Iteration cap handed to the symmetric eigensolver.
const MAX_EIGEN_ITERATIONS: usize = 10_000;
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("symmetric eigensolver did not converge within {iterations} iterations")]
    ConvergenceFailed { iterations: usize },
    #[error("expected a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
/// Eigenpairs sorted by descending eigenvalue. Column `k` of `vectors` belongs
/// to `values[k]`.
#[derive(Clone, Debug)]
pub struct Eigen {
    pub values: Array1<f64>,
    pub vectors: Array2<f64>,
}
fn ensure_square(a: &ArrayView2<f64>) -> Result<usize, LinalgError> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    Ok(rows)
}
fn to_matrix(a: &ArrayView2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    DMatrix::from_fn(rows, cols, |i, j| a[[i, j]])
}
fn to_array(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
fn factor(a: &ArrayView2<f64>) -> Result<Cholesky<f64, nalgebra::Dyn>, LinalgError> {
    Cholesky::new(to_matrix(a)).ok_or(LinalgError::NotPositiveDefinite)
}
/// Solve `A·x = b` for symmetric positive definite `A`.
pub fn cholesky_solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Result<Array1<f64>, LinalgError> {
    let n = ensure_square(&a)?;
    if b.len() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }
    let rhs = DVector::from_iterator(n, b.iter().copied());
    let x = factor(&a)?.solve(&rhs);
    Ok(x.iter().copied().collect())
}
/// Solve `A·w = λ·B·w` for symmetric `A` and symmetric positive definite `B`.
pub fn generalized_eigen(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Eigen, LinalgError> {
    let n = ensure_square(&a)?;
    let nb = ensure_square(&b)?;
    if n != nb {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: nb,
        });
    }
    let l = factor(&b)?.l();
    let l_inv = l
        .solve_lower_triangular(&DMatrix::identity(n, n))
        .ok_or(LinalgError::NotPositiveDefinite)?;
    let p = &l_inv * to_matrix(&a) * l_inv.transpose();
    // whitening leaves tiny asymmetries behind
    let p = (&p + p.transpose()) * 0.5;
    let eigen = SymmetricEigen::try_new(p, f64::EPSILON, MAX_EIGEN_ITERATIONS).ok_or(
        LinalgError::ConvergenceFailed {
            iterations: MAX_EIGEN_ITERATIONS,
        },
    )?;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));
    let vectors = l_inv.transpose() * eigen.eigenvectors.select_columns(order.iter());
    Ok(Eigen {
        values: order.iter().map(|&i| eigen.eigenvalues[i]).collect(),
        vectors: to_array(&vectors),
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    #[test]
    fn solve_matches_known_solution() {
        let a = array![[4.0, 1.0], [1.0, 3.0]];
        let b = array![1.0, 2.0];
        let x = cholesky_solve(a.view(), b.view()).unwrap();
        assert_abs_diff_eq!(x[0], 1.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 7.0 / 11.0, epsilon = 1e-12);
    }
    #[test]
    fn solve_rejects_indefinite_and_mismatched() {
        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        let b = array![1.0, 1.0];
        assert_eq!(
            cholesky_solve(indefinite.view(), b.view()),
            Err(LinalgError::NotPositiveDefinite)
        );
        let spd = array![[2.0, 0.0], [0.0, 2.0]];
        assert_eq!(
            cholesky_solve(spd.view(), array![1.0, 2.0, 3.0].view()),
            Err(LinalgError::DimensionMismatch { expected: 2, actual: 3 })
        );
        let wide = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            cholesky_solve(wide.view(), b.view()),
            Err(LinalgError::NotSquare { rows: 2, cols: 3 })
        ));
    }
    #[test]
    fn generalized_eigen_is_b_orthonormal() {
        let a = array![[2.0, 0.3, 0.1], [0.3, 1.0, 0.2], [0.1, 0.2, 0.5]];
        let b = array![[3.0, 0.5, 0.2], [0.5, 2.0, 0.3], [0.2, 0.3, 1.5]];
        let eig = generalized_eigen(a.view(), b.view()).unwrap();
        let gram = eig.vectors.t().dot(&b).dot(&eig.vectors);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-9);
            }
        }
        for k in 0..3 {
            let w = eig.vectors.column(k);
            let aw = a.dot(&w);
            let bw = b.dot(&w);
            for i in 0..3 {
                assert_abs_diff_eq!(aw[i], eig.values[k] * bw[i], epsilon = 1e-9);
            }
        }
        assert!(eig.values[0] >= eig.values[1] && eig.values[1] >= eig.values[2]);
    }
    #[test]
    fn identity_metric_gives_plain_eigenpairs() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let eig = generalized_eigen(a.view(), Array2::<f64>::eye(2).view()).unwrap();
        assert_abs_diff_eq!(eig.values[0], 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(eig.values[1], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(eig.vectors[[0, 0]].abs(), 0.5_f64.sqrt(), epsilon = 1e-10);
        assert_abs_diff_eq!(eig.vectors[[1, 0]].abs(), 0.5_f64.sqrt(), epsilon = 1e-10);
    }
    #[test]
    fn csp_like_problem_has_eigenvalues_in_unit_interval() {
        let r1 = array![[2.0, 0.1], [0.1, 0.5]];
        let r2 = array![[0.5, -0.1], [-0.1, 2.0]];
        let sum = &r1 + &r2;
        let eig = generalized_eigen(r1.view(), sum.view()).unwrap();
        for &value in eig.values.iter() {
            assert!(value > 0.0 && value < 1.0);
        }
    }
    #[test]
    fn singular_metric_is_rejected() {
        let a = Array2::<f64>::eye(2);
        let b = array![[1.0, 1.0], [1.0, 1.0]];
        assert_eq!(
            generalized_eigen(a.view(), b.view()).unwrap_err(),
            LinalgError::NotPositiveDefinite
        );
    }
}
