use sheetness_volume::Volume;

use super::kernels::{self, DerivativeOrder};
use super::{FloatConversion, SeparableFilter};
use crate::error::SheetnessError;
use crate::parallel::{CancellationToken, ExecutionStrategy};

/// Convert a physical sigma into per-axis sigmas in voxel units.
pub fn sigma_in_voxels(sigma: f64, spacing: [f64; 3]) -> [f64; 3] {
    spacing.map(|s| sigma / s)
}

/// Blur a volume using a gaussian blur filter
///
/// # Arguments
///
/// * `src` - The source volume.
/// * `dst` - The destination volume.
/// * `sigma` - The sigma of the gaussian kernel, in physical units of the volume spacing.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional cancellation token.
///
/// PRECONDITION: `src` and `dst` must have the same size.
pub fn gaussian_blur<T>(
    src: &Volume<T>,
    dst: &mut Volume<T>,
    sigma: f64,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<(), SheetnessError>
where
    T: FloatConversion + Copy + Send + Sync,
{
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(SheetnessError::InvalidSigma(sigma));
    }

    let [kernel_x, kernel_y, kernel_z] = sigma_in_voxels(sigma, src.spacing())
        .map(|s| kernels::gaussian_derivative_kernel_1d(s, DerivativeOrder::Zero));
    SeparableFilter::new(kernel_x, kernel_y, kernel_z)?.apply(src, dst, strategy, cancel)
}
