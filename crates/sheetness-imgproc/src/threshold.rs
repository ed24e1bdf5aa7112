use sheetness_volume::{Volume, VolumeError};

use crate::error::SheetnessError;
use crate::parallel::{self, ExecutionStrategy};

/// Apply a binary band threshold to a volume.
///
/// Voxels with `lower <= value <= upper` are set to `inside`, every other voxel to
/// `outside`. Typically used to build the label mask for parameter estimation.
///
/// # Arguments
///
/// * `src` - The input volume.
/// * `dst` - The output volume, usually a `u8` label mask.
/// * `lower` - The lower bound of the band, inclusive.
/// * `upper` - The upper bound of the band, inclusive.
/// * `inside` - The value of voxels inside the band.
/// * `outside` - The value of voxels outside the band.
/// * `strategy` - The execution strategy.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::parallel::ExecutionStrategy;
/// use sheetness_imgproc::threshold::binary_threshold;
/// use sheetness_volume::{Volume, VolumeSize};
///
/// let ct = Volume::<i16>::new(VolumeSize::new(4, 1, 1), vec![-1024, 150, 700, 3071]).unwrap();
/// let mut mask = ct.graft(0u8);
///
/// binary_threshold(&ct, &mut mask, 400, 3071, 1, 0, ExecutionStrategy::Serial).unwrap();
///
/// assert_eq!(mask.as_slice(), &[0, 0, 1, 1]);
/// ```
pub fn binary_threshold<T, O>(
    src: &Volume<T>,
    dst: &mut Volume<O>,
    lower: T,
    upper: T,
    inside: O,
    outside: O,
    strategy: ExecutionStrategy,
) -> Result<(), SheetnessError>
where
    T: Copy + PartialOrd + Send + Sync,
    O: Copy + Send + Sync,
{
    if src.size() != dst.size() {
        return Err(VolumeError::InvalidVolumeSize(src.size(), dst.size()).into());
    }

    parallel::par_iter_voxels_val(src.as_slice(), dst.as_slice_mut(), strategy, |v, d| {
        *d = if *v >= lower && *v <= upper {
            inside
        } else {
            outside
        };
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetness_volume::VolumeSize;

    #[test]
    fn test_binary_threshold() -> Result<(), SheetnessError> {
        let src = Volume::new(VolumeSize::new(3, 2, 1), vec![0.5f32, 1.0, 1.5, 2.0, 2.5, -1.0])?;
        let mut dst = src.graft(0u8);

        binary_threshold(&src, &mut dst, 1.0, 2.0, 7, 3, ExecutionStrategy::Parallel)?;
        assert_eq!(dst.as_slice(), &[3, 7, 7, 7, 3, 3]);
        Ok(())
    }

    #[test]
    fn test_binary_threshold_size_mismatch() -> Result<(), SheetnessError> {
        let src = Volume::from_size_val(VolumeSize::new(2, 2, 2), 0i16)?;
        let mut dst = Volume::from_size_val(VolumeSize::new(2, 2, 1), 0u8)?;
        let res = binary_threshold(&src, &mut dst, 0, 1, 1, 0, ExecutionStrategy::Serial);
        assert!(res.is_err());
        Ok(())
    }
}
