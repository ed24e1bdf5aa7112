use num_traits::Float;
use sheetness_volume::{Volume, VolumeError};

use crate::error::SheetnessError;
use crate::filter::{gaussian_blur, FloatConversion};
use crate::parallel::{self, CancellationToken, ExecutionStrategy};

/// Performs weighted addition of two volumes `src1` and `src2` with weights `alpha`
/// and `beta`, and an optional scalar `gamma`. The formula used is:
///
/// dst(x,y,z) = (src1(x,y,z) * alpha + src2(x,y,z) * beta + gamma)
///
/// # Arguments
///
/// * `src1` - The first input volume.
/// * `alpha` - Weight of the first volume elements to be multiplied.
/// * `src2` - The second input volume.
/// * `beta` - Weight of the second volume elements to be multiplied.
/// * `gamma` - Scalar added to each sum.
/// * `dst` - The output volume.
/// * `strategy` - The execution strategy.
///
/// # Errors
///
/// Returns an error if the sizes of `src1`, `src2` and `dst` do not match.
pub fn add_weighted<T>(
    src1: &Volume<T>,
    alpha: T,
    src2: &Volume<T>,
    beta: T,
    gamma: T,
    dst: &mut Volume<T>,
    strategy: ExecutionStrategy,
) -> Result<(), SheetnessError>
where
    T: Float + Send + Sync,
{
    if src1.size() != src2.size() {
        return Err(VolumeError::InvalidVolumeSize(src1.size(), src2.size()).into());
    }

    if src1.size() != dst.size() {
        return Err(VolumeError::InvalidVolumeSize(src1.size(), dst.size()).into());
    }

    parallel::par_iter_voxels_val_two(
        src1.as_slice(),
        src2.as_slice(),
        dst.as_slice_mut(),
        strategy,
        |&a, &b, d| *d = a * alpha + b * beta + gamma,
    )?;

    Ok(())
}

/// Sharpen a volume by unsharp masking.
///
/// dst = src + amount * (src - gaussian_blur(src, sigma))
///
/// # Arguments
///
/// * `src` - The input volume.
/// * `dst` - The output volume.
/// * `sigma` - The sigma of the blur, in physical units.
/// * `amount` - The gain `k` applied to the high-pass residual.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional cancellation token.
pub fn unsharp_mask<T>(
    src: &Volume<T>,
    dst: &mut Volume<T>,
    sigma: f64,
    amount: T,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<(), SheetnessError>
where
    T: Float + FloatConversion + Send + Sync,
{
    let mut blurred = src.graft(T::zero());
    gaussian_blur(src, &mut blurred, sigma, strategy, cancel)?;
    add_weighted(
        src,
        T::one() + amount,
        &blurred,
        -amount,
        T::zero(),
        dst,
        strategy,
    )
}

/// Shift and scale every voxel: `dst = (src + shift) * scale`.
///
/// # Errors
///
/// Returns an error if `src` and `dst` differ in size.
pub fn shift_scale<T>(
    src: &Volume<T>,
    dst: &mut Volume<T>,
    shift: T,
    scale: T,
    strategy: ExecutionStrategy,
) -> Result<(), SheetnessError>
where
    T: Float + Send + Sync,
{
    if src.size() != dst.size() {
        return Err(VolumeError::InvalidVolumeSize(src.size(), dst.size()).into());
    }

    parallel::par_iter_voxels_val(src.as_slice(), dst.as_slice_mut(), strategy, |&v, d| {
        *d = (v + shift) * scale
    })?;

    Ok(())
}
