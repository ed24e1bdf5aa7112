use sheetness_volume::{EigenvalueTriple, Volume};

use super::{unary_functor_filter, UnaryFunctor};
use crate::error::SheetnessError;
use crate::parallel::{CancellationToken, ExecutionStrategy};

/// Square root of the sum of squared components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrobeniusNorm;

impl<const N: usize> UnaryFunctor<[f64; N], f64> for FrobeniusNorm {
    fn call(&self, a: &[f64; N]) -> f64 {
        a.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Compute the Frobenius norm of every eigenvalue triple of a volume.
pub fn frobenius_norm_image(
    src: &Volume<EigenvalueTriple>,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<f64>, SheetnessError> {
    unary_functor_filter(src, &FrobeniusNorm, strategy, cancel)
}
