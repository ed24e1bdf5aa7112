//! Per-voxel functors and the filter that maps them over a volume.
//!
//! A functor is a pure function of one or two voxel values. Unary functors are applied
//! with [`unary_functor_filter`]; binary functors are applied with
//! [`crate::broadcast::broadcast_binary_filter`], which also handles a second operand of
//! reduced extent.

use sheetness_volume::Volume;

use crate::error::SheetnessError;
use crate::parallel::{self, CancellationToken, ExecutionStrategy};

mod background;
pub use background::{KrcahBackground, KrcahNotBackground};

mod frobenius;
pub use frobenius::{frobenius_norm_image, FrobeniusNorm};

mod sheetness;
pub use sheetness::*;

mod trace;
pub use trace::{trace_image, TraceFunctor};

/// A function of one voxel value.
pub trait UnaryFunctor<A, O> {
    /// Evaluate the functor on one voxel.
    fn call(&self, a: &A) -> O;
}

/// A function of a voxel value and a value of a second, possibly broadcast, operand.
pub trait BinaryFunctor<A, B, O> {
    /// Evaluate the functor on one voxel of each operand.
    fn call(&self, a: &A, b: &B) -> O;
}

/// Adapter turning a closure or function into a functor.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::functor::{BinaryFunctor, FnFunctor, UnaryFunctor};
///
/// let square = FnFunctor(|x: &f64| x * x);
/// assert_eq!(UnaryFunctor::call(&square, &3.0), 9.0);
///
/// let add = FnFunctor(|a: &f32, b: &f32| a + b);
/// assert_eq!(BinaryFunctor::call(&add, &1.0, &2.0), 3.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnFunctor<F>(pub F);

impl<A, O, F> UnaryFunctor<A, O> for FnFunctor<F>
where
    F: Fn(&A) -> O,
{
    fn call(&self, a: &A) -> O {
        (self.0)(a)
    }
}

impl<A, B, O, F> BinaryFunctor<A, B, O> for FnFunctor<F>
where
    F: Fn(&A, &B) -> O,
{
    fn call(&self, a: &A, b: &B) -> O {
        (self.0)(a, b)
    }
}

/// Apply a unary functor to every voxel of a volume.
///
/// # Arguments
///
/// * `src` - The input volume.
/// * `functor` - The per-voxel function.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional cancellation token checked between regions.
///
/// # Returns
///
/// A new volume with the size and geometry of `src`.
pub fn unary_functor_filter<A, O, F>(
    src: &Volume<A>,
    functor: &F,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<O>, SheetnessError>
where
    A: Sync,
    O: Default + Clone + Send,
    F: UnaryFunctor<A, O> + Sync,
{
    let mut dst = src.graft(O::default());
    let slice_len = src.size().slice_len();
    let src_data = src.as_slice();

    parallel::par_iter_regions(
        dst.as_slice_mut(),
        slice_len,
        strategy,
        cancel,
        |region, chunk| {
            let base = region.z_start * slice_len;
            let len = chunk.len();
            chunk
                .iter_mut()
                .zip(&src_data[base..base + len])
                .for_each(|(out, a)| *out = functor.call(a));
        },
    )?;

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetness_volume::VolumeSize;

    #[test]
    fn test_unary_functor_filter() -> Result<(), SheetnessError> {
        let src = Volume::from_fn(VolumeSize::new(3, 2, 4), |[x, y, z]| (x + y + z) as f64);
        let twice = FnFunctor(|v: &f64| 2.0 * v);

        let serial = unary_functor_filter(&src, &twice, ExecutionStrategy::Serial, None)?;
        let parallel = unary_functor_filter(&src, &twice, ExecutionStrategy::Parallel, None)?;

        assert_eq!(serial, parallel);
        assert_eq!(serial.get([2, 1, 3]), Some(&12.0));
        assert_eq!(serial.geometry(), src.geometry());
        Ok(())
    }

    #[test]
    fn test_unary_functor_filter_cancelled() -> Result<(), SheetnessError> {
        let src = Volume::from_size_val(VolumeSize::new(2, 2, 2), 1.0f64)?;
        let token = CancellationToken::new();
        token.cancel();

        let res = unary_functor_filter(
            &src,
            &FnFunctor(|v: &f64| *v),
            ExecutionStrategy::Serial,
            Some(&token),
        );
        assert_eq!(
            res,
            Err(SheetnessError::Parallel(parallel::ParallelError::Cancelled))
        );
        Ok(())
    }
}
