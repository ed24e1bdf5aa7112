use sheetness_volume::{Volume, VolumeError, VolumeSize};

use crate::error::SheetnessError;
use crate::functor::BinaryFunctor;
use crate::parallel::{self, CancellationToken, ExecutionStrategy};

/// Determine along which axes `b` is broadcast onto `a`.
///
/// Along every axis the extent of `b` must either equal the extent of `a` or be `1`.
///
/// # Returns
///
/// For each axis (x, y, z), whether `b` is repeated along it.
///
/// # Errors
///
/// Returns [`VolumeError::BroadcastMismatch`] for the first axis where the extents are
/// incompatible.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::broadcast::broadcast_axes;
/// use sheetness_volume::VolumeSize;
///
/// let a = VolumeSize::new(8, 8, 4);
///
/// assert_eq!(broadcast_axes(a, VolumeSize::new(1, 1, 4)).unwrap(), [true, true, false]);
/// assert_eq!(broadcast_axes(a, VolumeSize::new(8, 8, 1)).unwrap(), [false, false, true]);
/// assert!(broadcast_axes(a, VolumeSize::new(8, 8, 2)).is_err());
/// ```
pub fn broadcast_axes(a: VolumeSize, b: VolumeSize) -> Result<[bool; 3], VolumeError> {
    let mut axes = [false; 3];
    for (axis, broadcast) in axes.iter_mut().enumerate() {
        let target = a.extent(axis);
        let extent = b.extent(axis);
        if extent == target {
            continue;
        }
        if extent != 1 {
            return Err(VolumeError::BroadcastMismatch {
                axis,
                extent,
                target,
            });
        }
        *broadcast = true;
    }
    Ok(axes)
}

/// Apply a binary functor to every voxel of `a` paired with the matching value of `b`.
///
/// `b` may have extent `1` along any axis, in which case its single value along that axis
/// is reused for every position of `a`: a `(1, 1, 1)` volume acts as a scalar, a
/// `(1, 1, depth)` volume as one value per slice and a `(width, height, 1)` volume as a 2D
/// projection repeated across slices. `b` is never expanded into a full-size copy and its
/// geometry is not compared with the geometry of `a`.
///
/// The output has the size and geometry of `a`. Its slices are split into regions that
/// run according to `strategy`; `cancel` is checked before each region.
///
/// # Arguments
///
/// * `a` - The full-resolution operand.
/// * `b` - The broadcast operand.
/// * `functor` - The per-voxel function.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional cancellation token.
///
/// # Errors
///
/// Returns an error before doing any work if `b` cannot be broadcast onto `a`, and an
/// error if the run is cancelled.
pub fn broadcast_binary_filter<A, B, O, F>(
    a: &Volume<A>,
    b: &Volume<B>,
    functor: &F,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<O>, SheetnessError>
where
    A: Sync,
    B: Sync,
    O: Default + Clone + Send,
    F: BinaryFunctor<A, B, O> + Sync,
{
    let [bx, by, bz] = broadcast_axes(a.size(), b.size())?;

    let size = a.size();
    let b_size = b.size();
    let a_data = a.as_slice();
    let b_data = b.as_slice();
    let mut dst = a.graft(O::default());

    parallel::par_iter_regions(
        dst.as_slice_mut(),
        size.slice_len(),
        strategy,
        cancel,
        |region, chunk| {
            let mut lines = chunk.chunks_exact_mut(size.width);
            for z in region.z_start..region.z_end {
                let b_z = if bz { 0 } else { z };
                for y in 0..size.height {
                    let Some(line) = lines.next() else {
                        return;
                    };
                    let b_y = if by { 0 } else { y };
                    let a_line = &a_data[size.offset(0, y, z)..size.offset(0, y, z) + size.width];
                    let b_start = b_size.offset(0, b_y, b_z);

                    for (x, (out, a_val)) in line.iter_mut().zip(a_line).enumerate() {
                        let b_x = if bx { 0 } else { x };
                        *out = functor.call(a_val, &b_data[b_start + b_x]);
                    }
                }
            }
        },
    )?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functor::FnFunctor;
    use sheetness_volume::VolumeGeometry;

    fn ramp(size: VolumeSize) -> Volume<f64> {
        Volume::from_fn(size, |[x, y, z]| (x + 10 * y + 100 * z) as f64)
    }

    #[test]
    fn test_broadcast_scalar() -> Result<(), SheetnessError> {
        let a = ramp(VolumeSize::new(3, 2, 2));
        let b = Volume::new(VolumeSize::new(1, 1, 1), vec![1000.0])?;
        let add = FnFunctor(|a: &f64, b: &f64| a + b);

        let out = broadcast_binary_filter(&a, &b, &add, ExecutionStrategy::Serial, None)?;
        for (o, v) in out.as_slice().iter().zip(a.as_slice()) {
            assert_eq!(*o, v + 1000.0);
        }
        Ok(())
    }

    #[test]
    fn test_broadcast_per_slice() -> Result<(), SheetnessError> {
        let size = VolumeSize::new(4, 3, 5);
        let a = ramp(size);
        let b = Volume::from_fn(VolumeSize::new(1, 1, 5), |[_, _, z]| z as f64 * -1.0);
        let mul = FnFunctor(|a: &f64, b: &f64| a * b);

        let out = broadcast_binary_filter(&a, &b, &mul, ExecutionStrategy::Parallel, None)?;
        for z in 0..size.depth {
            for y in 0..size.height {
                for x in 0..size.width {
                    let expected = (x + 10 * y + 100 * z) as f64 * -(z as f64);
                    assert_eq!(out.get([x, y, z]), Some(&expected));
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_broadcast_projection_repeats_across_slices() -> Result<(), SheetnessError> {
        let size = VolumeSize::new(5, 4, 6);
        let a = Volume::from_size_val(size, 0.0f64)?;
        let b = Volume::from_fn(VolumeSize::new(5, 4, 1), |[x, y, _]| (x * y) as f32);
        let second = FnFunctor(|_: &f64, b: &f32| *b);

        let out = broadcast_binary_filter(&a, &b, &second, ExecutionStrategy::Serial, None)?;
        for z in 0..size.depth {
            assert_eq!(out.slice(z), b.as_slice());
        }
        Ok(())
    }

    #[test]
    fn test_broadcast_full_size_and_geometry() -> Result<(), SheetnessError> {
        let size = VolumeSize::new(6, 5, 40);
        let a = ramp(size).with_geometry(VolumeGeometry {
            origin: [1.0, 2.0, 3.0],
            spacing: [0.5, 0.5, 1.5],
            ..Default::default()
        })?;
        let b = ramp(size);
        let sub = FnFunctor(|a: &f64, b: &f64| a - b);

        let serial = broadcast_binary_filter(&a, &b, &sub, ExecutionStrategy::Serial, None)?;
        let fixed = broadcast_binary_filter(&a, &b, &sub, ExecutionStrategy::Fixed(3), None)?;

        assert_eq!(serial, fixed);
        assert!(serial.as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(serial.geometry(), a.geometry());
        Ok(())
    }

    #[test]
    fn test_broadcast_mismatch_fails_fast() -> Result<(), SheetnessError> {
        let a = ramp(VolumeSize::new(4, 4, 4));
        let b = Volume::from_size_val(VolumeSize::new(4, 2, 1), 0.0f64)?;
        let first = FnFunctor(|a: &f64, _: &f64| *a);

        let res = broadcast_binary_filter(&a, &b, &first, ExecutionStrategy::Serial, None);
        assert_eq!(
            res,
            Err(SheetnessError::Volume(VolumeError::BroadcastMismatch {
                axis: 1,
                extent: 2,
                target: 4
            }))
        );
        Ok(())
    }

    #[test]
    fn test_broadcast_cancelled() -> Result<(), SheetnessError> {
        let a = ramp(VolumeSize::new(2, 2, 2));
        let b = Volume::new(VolumeSize::new(1, 1, 1), vec![0.0f64])?;
        let token = CancellationToken::new();
        token.cancel();

        let res = broadcast_binary_filter(
            &a,
            &b,
            &FnFunctor(|a: &f64, _: &f64| *a),
            ExecutionStrategy::Parallel,
            Some(&token),
        );
        assert!(matches!(
            res,
            Err(SheetnessError::Parallel(parallel::ParallelError::Cancelled))
        ));
        Ok(())
    }
}
