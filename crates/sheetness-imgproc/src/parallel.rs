use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

/// Number of voxels above which [`ExecutionStrategy::Auto`] runs in parallel.
pub const AUTO_PARALLEL_THRESHOLD: usize = 32 * 32 * 32;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),

    /// Input and output sizes do not match.
    #[error("source and destination slices must have the same length")]
    SizeMismatch,

    /// The run was cancelled through its [`CancellationToken`].
    #[error("operation cancelled")]
    Cancelled,
}

/// Controls how region-partitioned operations are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// Useful for small volumes, debugging, or deterministic profiling.
    Serial,

    /// Use the global Rayon thread pool to process the regions in parallel.
    Parallel,

    /// Run in parallel on the global pool when the volume has at least
    /// [`AUTO_PARALLEL_THRESHOLD`] voxels, serially otherwise.
    #[default]
    Auto,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use this primarily for benchmarking or specific isolation needs.
    Fixed(usize),
}

impl ExecutionStrategy {
    /// Whether a volume of `num_voxels` voxels is processed in parallel.
    pub fn is_parallel(&self, num_voxels: usize) -> bool {
        match self {
            ExecutionStrategy::Serial => false,
            ExecutionStrategy::Parallel | ExecutionStrategy::Fixed(_) => true,
            ExecutionStrategy::Auto => num_voxels >= AUTO_PARALLEL_THRESHOLD,
        }
    }

    /// Run `op` under this strategy.
    ///
    /// `op` receives `true` when it should use rayon parallel iterators. For
    /// [`ExecutionStrategy::Fixed`] the call happens inside a dedicated thread pool.
    pub fn run<R, F>(&self, num_voxels: usize, op: F) -> Result<R, ParallelError>
    where
        R: Send,
        F: FnOnce(bool) -> R + Send,
    {
        match *self {
            ExecutionStrategy::Fixed(n) => {
                if n == 0 {
                    return Err(ParallelError::InvalidThreadCount(n));
                }
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ParallelError::BuildError(e.to_string()))?;
                Ok(pool.install(|| op(true)))
            }
            strategy => Ok(op(strategy.is_parallel(num_voxels))),
        }
    }
}

/// A cooperative cancellation flag shared between the caller and running filters.
///
/// Filters check the flag before starting each region; regions already running are
/// completed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every run holding a clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(token: Option<&CancellationToken>) -> Result<(), ParallelError> {
        match token {
            Some(token) if token.is_cancelled() => Err(ParallelError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// A slab of consecutive z-slices `[z_start, z_end)` processed by a single worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// First slice of the region.
    pub z_start: usize,
    /// One past the last slice of the region.
    pub z_end: usize,
}

fn slices_per_region(depth: usize, num_regions: usize) -> usize {
    depth.div_ceil(num_regions.max(1)).max(1)
}

/// Apply `f` to every z-slab region of `dst`.
///
/// `dst` holds `depth` slices of `slice_len` samples each. Every invocation of `f` receives
/// its region and the mutable samples of exactly that region, so workers never share
/// output samples.
///
/// # Arguments
///
/// * `dst` - The output samples in raster order.
/// * `slice_len` - The number of samples in one z-slice.
/// * `strategy` - The execution strategy.
/// * `cancel` - Optional token checked before each region.
/// * `f` - The per-region operation.
///
/// # Errors
///
/// Returns an error if `dst` is not a whole number of slices, the thread pool cannot be
/// built, or the run is cancelled.
pub fn par_iter_regions<T, F>(
    dst: &mut [T],
    slice_len: usize,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
    f: F,
) -> Result<(), ParallelError>
where
    T: Send,
    F: Fn(Region, &mut [T]) + Send + Sync,
{
    if dst.is_empty() || slice_len == 0 {
        return Ok(());
    }
    if dst.len() % slice_len != 0 {
        return Err(ParallelError::SizeMismatch);
    }

    let num_voxels = dst.len();
    let depth = num_voxels / slice_len;

    strategy.run(num_voxels, |parallel| {
        if parallel {
            let per_region = slices_per_region(depth, rayon::current_num_threads() * 4);
            dst.par_chunks_mut(per_region * slice_len)
                .enumerate()
                .try_for_each(|(i, chunk)| {
                    CancellationToken::check(cancel)?;
                    let z_start = i * per_region;
                    let region = Region {
                        z_start,
                        z_end: z_start + chunk.len() / slice_len,
                    };
                    f(region, chunk);
                    Ok(())
                })
        } else {
            dst.chunks_mut(slice_len)
                .enumerate()
                .try_for_each(|(z, chunk)| {
                    CancellationToken::check(cancel)?;
                    f(Region { z_start: z, z_end: z + 1 }, chunk);
                    Ok(())
                })
        }
    })?
}

/// Apply a function to each voxel pair of two equally sized sample buffers.
///
/// # Errors
///
/// Returns an error if the buffers differ in length or the thread pool cannot be built.
pub fn par_iter_voxels_val<T1, T2, F>(
    src: &[T1],
    dst: &mut [T2],
    strategy: ExecutionStrategy,
    f: F,
) -> Result<(), ParallelError>
where
    T1: Sync,
    T2: Send,
    F: Fn(&T1, &mut T2) + Send + Sync,
{
    if src.len() != dst.len() {
        return Err(ParallelError::SizeMismatch);
    }

    strategy.run(src.len(), |parallel| {
        if parallel {
            src.par_iter()
                .zip(dst.par_iter_mut())
                .for_each(|(s, d)| f(s, d));
        } else {
            src.iter().zip(dst.iter_mut()).for_each(|(s, d)| f(s, d));
        }
    })
}

/// Apply a function to each voxel triple of three equally sized sample buffers.
///
/// # Errors
///
/// Returns an error if the buffers differ in length or the thread pool cannot be built.
pub fn par_iter_voxels_val_two<T1, T2, T3, F>(
    src1: &[T1],
    src2: &[T2],
    dst: &mut [T3],
    strategy: ExecutionStrategy,
    f: F,
) -> Result<(), ParallelError>
where
    T1: Sync,
    T2: Sync,
    T3: Send,
    F: Fn(&T1, &T2, &mut T3) + Send + Sync,
{
    if src1.len() != dst.len() || src2.len() != dst.len() {
        return Err(ParallelError::SizeMismatch);
    }

    strategy.run(dst.len(), |parallel| {
        if parallel {
            src1.par_iter()
                .zip(src2.par_iter())
                .zip(dst.par_iter_mut())
                .for_each(|((a, b), d)| f(a, b, d));
        } else {
            src1.iter()
                .zip(src2.iter())
                .zip(dst.iter_mut())
                .for_each(|((a, b), d)| f(a, b, d));
        }
    })
}
