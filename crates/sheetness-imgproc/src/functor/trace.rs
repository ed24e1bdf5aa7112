use sheetness_volume::{SymmetricMatrix, Volume};

use super::{unary_functor_filter, UnaryFunctor};
use crate::error::SheetnessError;
use crate::parallel::{CancellationToken, ExecutionStrategy};

/// Sum of the first `dimension` diagonal entries of a symmetric matrix.
///
/// Off-diagonal entries never contribute. A dimension larger than the matrix is clamped
/// to the matrix size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFunctor {
    /// Number of leading diagonal entries to sum.
    pub dimension: usize,
}

impl Default for TraceFunctor {
    fn default() -> Self {
        Self { dimension: 3 }
    }
}

impl TraceFunctor {
    /// Create a trace functor summing the first `dimension` diagonal entries.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl<const N: usize> UnaryFunctor<SymmetricMatrix<N>, f64> for TraceFunctor {
    fn call(&self, a: &SymmetricMatrix<N>) -> f64 {
        (0..self.dimension.min(N)).map(|i| a.get(i, i)).sum()
    }
}

/// Compute the trace of every voxel of a Hessian volume.
pub fn trace_image(
    src: &Volume<SymmetricMatrix<3>>,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<f64>, SheetnessError> {
    unary_functor_filter(src, &TraceFunctor::new(3), strategy, cancel)
}
