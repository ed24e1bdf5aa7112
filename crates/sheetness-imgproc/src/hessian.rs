use sheetness_volume::{SymmetricMatrix, Volume};

use crate::error::SheetnessError;
use crate::filter::kernels::{gaussian_derivative_kernel_1d, DerivativeOrder};
use crate::filter::{sigma_in_voxels, FloatConversion, SeparableFilter};
use crate::parallel::{CancellationToken, ExecutionStrategy};

const ORDERS: [DerivativeOrder; 3] = [
    DerivativeOrder::Zero,
    DerivativeOrder::First,
    DerivativeOrder::Second,
];

/// Upper-triangle entries of the 3x3 Hessian.
const COMPONENTS: [(usize, usize); 6] = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)];

/// Compute the Hessian of a volume at scale `sigma` by Gaussian derivative convolution.
///
/// Every entry `H[i][j]` is the separable correlation of `src` with the Gaussian derivative
/// along `i` and `j` and the plain Gaussian along the remaining axis. `sigma` is expressed
/// in the physical units of the volume spacing and the derivatives are taken with respect
/// to physical coordinates.
///
/// # Arguments
///
/// * `src` - The source volume.
/// * `sigma` - The scale of the Gaussian, in physical units.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional cancellation token.
///
/// # Returns
///
/// A volume of symmetric 3x3 matrices with the geometry of `src`.
///
/// # Errors
///
/// Returns an error if `sigma` is not strictly positive or the run is cancelled.
pub fn hessian_gaussian<T>(
    src: &Volume<T>,
    sigma: f64,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<SymmetricMatrix<3>>, SheetnessError>
where
    T: FloatConversion + Copy + Sync,
{
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(SheetnessError::InvalidSigma(sigma));
    }

    let spacing = src.spacing();
    let kernels = sigma_in_voxels(sigma, spacing)
        .map(|s| ORDERS.map(|order| gaussian_derivative_kernel_1d(s, order)));

    let input = src.as_slice().iter().map(|v| v.to_f64()).collect::<Vec<_>>();
    let mut hessian = src.graft(SymmetricMatrix::<3>::zeros());

    for (i, j) in COMPONENTS {
        let mut orders = [0usize; 3];
        orders[i] += 1;
        orders[j] += 1;

        let filter = SeparableFilter::new(
            kernels[0][orders[0]].clone(),
            kernels[1][orders[1]].clone(),
            kernels[2][orders[2]].clone(),
        )?;
        let derivative = filter.apply_f64(&input, src.size(), strategy, cancel)?;

        let scale = 1.0 / (spacing[i] * spacing[j]);
        hessian
            .as_slice_mut()
            .iter_mut()
            .zip(derivative)
            .for_each(|(h, d)| h.set(i, j, d * scale));
    }

    Ok(hessian)
}
