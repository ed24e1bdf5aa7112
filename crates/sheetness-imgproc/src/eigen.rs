use nalgebra::Matrix3;
use sheetness_volume::{EigenvalueTriple, SymmetricMatrix, Volume};

use crate::error::SheetnessError;
use crate::functor::{unary_functor_filter, FnFunctor};
use crate::parallel::{CancellationToken, ExecutionStrategy};

/// Eigenvalues of a symmetric 3x3 matrix.
///
/// The eigenvalues are returned in no particular order; the sheetness functors sort them
/// by magnitude themselves.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::eigen::symmetric_eigenvalues;
/// use sheetness_volume::SymmetricMatrix;
///
/// let m = SymmetricMatrix::from_upper([[2.0, 1.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 5.0]]);
/// let mut e = symmetric_eigenvalues(&m);
/// e.sort_by(|a, b| a.total_cmp(b));
///
/// assert!((e[0] - 1.0).abs() < 1e-12);
/// assert!((e[1] - 3.0).abs() < 1e-12);
/// assert!((e[2] - 5.0).abs() < 1e-12);
/// ```
pub fn symmetric_eigenvalues(m: &SymmetricMatrix<3>) -> EigenvalueTriple {
    let a = m.as_array();
    let eigenvalues = Matrix3::from_fn(|i, j| a[i][j]).symmetric_eigenvalues();
    [eigenvalues[0], eigenvalues[1], eigenvalues[2]]
}

/// Compute the eigenvalues of every voxel of a Hessian volume.
///
/// # Arguments
///
/// * `src` - The volume of symmetric matrices.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional cancellation token.
pub fn eigen_analysis(
    src: &Volume<SymmetricMatrix<3>>,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<EigenvalueTriple>, SheetnessError> {
    unary_functor_filter(src, &FnFunctor(symmetric_eigenvalues), strategy, cancel)
}
