use sheetness_volume::{Volume, VolumeError, VolumeSize};

use crate::error::SheetnessError;
use crate::parallel::{self, CancellationToken, ExecutionStrategy};

/// Trait for floating point casting
pub trait FloatConversion {
    /// Convert the type to f64
    fn to_f64(&self) -> f64;
    /// Convert the type from f64
    fn from_f64(val: f64) -> Self;
}

impl FloatConversion for f32 {
    fn to_f64(&self) -> f64 {
        *self as f64
    }

    fn from_f64(val: f64) -> Self {
        val as f32
    }
}

impl FloatConversion for f64 {
    fn to_f64(&self) -> f64 {
        *self
    }

    fn from_f64(val: f64) -> Self {
        val
    }
}

/// A separable 3D filter that applies 1D correlations along x, y and z sequentially.
///
/// Samples outside the volume replicate the nearest border sample.
#[derive(Debug, Clone)]
pub struct SeparableFilter {
    kernels: [Vec<f64>; 3],
}

impl SeparableFilter {
    /// Create a new separable filter from one odd-length kernel per axis.
    ///
    /// # Arguments
    ///
    /// * `kernel_x` - The kernel applied along x.
    /// * `kernel_y` - The kernel applied along y.
    /// * `kernel_z` - The kernel applied along z.
    ///
    /// # Errors
    ///
    /// Returns an error if any kernel is empty or has an even length.
    pub fn new(
        kernel_x: Vec<f64>,
        kernel_y: Vec<f64>,
        kernel_z: Vec<f64>,
    ) -> Result<Self, SheetnessError> {
        for kernel in [&kernel_x, &kernel_y, &kernel_z] {
            if kernel.len() % 2 == 0 {
                return Err(VolumeError::InvalidKernelLength(kernel.len()).into());
            }
        }
        Ok(Self {
            kernels: [kernel_x, kernel_y, kernel_z],
        })
    }

    /// Apply the filter to a volume with execution strategy control.
    ///
    /// # Arguments
    ///
    /// * `src` - The source volume.
    /// * `dst` - The destination volume (must be same size as source).
    /// * `strategy` - The execution strategy.
    /// * `cancel` - Optional cancellation token checked between regions.
    pub fn apply<T>(
        &self,
        src: &Volume<T>,
        dst: &mut Volume<T>,
        strategy: ExecutionStrategy,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SheetnessError>
    where
        T: FloatConversion + Copy + Send + Sync,
    {
        if src.size() != dst.size() {
            return Err(VolumeError::InvalidVolumeSize(src.size(), dst.size()).into());
        }

        let size = src.size();
        let input = src.as_slice().iter().map(|v| v.to_f64()).collect::<Vec<_>>();
        let output = self.apply_f64(&input, size, strategy, cancel)?;

        dst.as_slice_mut()
            .iter_mut()
            .zip(output)
            .for_each(|(d, v)| *d = T::from_f64(v));

        Ok(())
    }

    /// Apply the filter to raw `f64` samples laid out in raster order.
    pub(crate) fn apply_f64(
        &self,
        src: &[f64],
        size: VolumeSize,
        strategy: ExecutionStrategy,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<f64>, SheetnessError> {
        let mut current = src.to_vec();
        let mut next = vec![0.0; src.len()];

        for (axis, kernel) in self.kernels.iter().enumerate() {
            if kernel.len() == 1 && kernel[0] == 1.0 {
                continue;
            }
            correlate_axis(&current, &mut next, size, axis, kernel, strategy, cancel)?;
            std::mem::swap(&mut current, &mut next);
        }

        Ok(current)
    }
}

/// Correlate `src` with `kernel` along `axis`, replicating border samples.
fn correlate_axis(
    src: &[f64],
    dst: &mut [f64],
    size: VolumeSize,
    axis: usize,
    kernel: &[f64],
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<(), SheetnessError> {
    let radius = (kernel.len() / 2) as isize;
    let extent = size.extent(axis) as isize;
    let stride = match axis {
        0 => 1,
        1 => size.width,
        _ => size.slice_len(),
    } as isize;

    parallel::par_iter_regions(dst, size.slice_len(), strategy, cancel, |region, chunk| {
        let base = region.z_start * size.slice_len();
        for (i, out) in chunk.iter_mut().enumerate() {
            let idx = base + i;
            let pos = match axis {
                0 => idx % size.width,
                1 => (idx / size.width) % size.height,
                _ => idx / size.slice_len(),
            } as isize;
            // offset of the first sample on the line through `idx`
            let line_start = idx as isize - pos * stride;

            let mut acc = 0.0;
            for (j, &k) in kernel.iter().enumerate() {
                let p = (pos + j as isize - radius).clamp(0, extent - 1);
                acc += k * src[(line_start + p * stride) as usize];
            }
            *out = acc;
        }
    })?;

    Ok(())
}
