use num_traits::Float;
use sheetness_volume::Volume;

use crate::broadcast::broadcast_binary_filter;
use crate::error::SheetnessError;
use crate::functor::BinaryFunctor;
use crate::parallel::{CancellationToken, ExecutionStrategy};

/// Return the argument with the larger magnitude, keeping its sign.
///
/// Ties go to the first argument, so `max_abs(x, -x) == x`.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::combine::max_abs;
///
/// assert_eq!(max_abs(0.3, -0.8), -0.8);
/// assert_eq!(max_abs(-0.5, 0.5), -0.5);
/// ```
#[inline]
pub fn max_abs<T: Float>(x: T, y: T) -> T {
    if x.abs() >= y.abs() {
        x
    } else {
        y
    }
}

/// Binary functor form of [`max_abs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaximumAbsoluteValue;

impl<T: Float> BinaryFunctor<T, T, T> for MaximumAbsoluteValue {
    fn call(&self, a: &T, b: &T) -> T {
        max_abs(*a, *b)
    }
}

/// Combine two volumes voxel by voxel with [`max_abs`].
///
/// `b` may be broadcast onto `a` along any axis of extent 1.
pub fn maximum_absolute_value<T>(
    a: &Volume<T>,
    b: &Volume<T>,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<Volume<T>, SheetnessError>
where
    T: Float + Default + Send + Sync,
{
    broadcast_binary_filter(a, b, &MaximumAbsoluteValue, strategy, cancel)
}
