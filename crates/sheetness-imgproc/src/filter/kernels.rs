/// Order of the Gaussian derivative sampled by [`gaussian_derivative_kernel_1d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeOrder {
    /// Plain Gaussian smoothing.
    Zero,
    /// First derivative of the Gaussian.
    First,
    /// Second derivative of the Gaussian.
    Second,
}

/// Radius, in voxels, of a Gaussian kernel with standard deviation `sigma` (in voxels).
///
/// The kernel spans `[-radius, radius]` with `radius = max(ceil(3 sigma), 1)`.
pub fn kernel_radius(sigma: f64) -> usize {
    ((3.0 * sigma).ceil() as usize).max(1)
}

/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel. Must be odd.
/// * `sigma` - The sigma of the gaussian kernel, in voxels.
///
/// # Returns
///
/// A vector of the kernel, normalized to sum to one.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f64) -> Vec<f64> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size as f64 - 1.0) / 2.0;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    for i in 0..kernel_size {
        let x = i as f64 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    // normalize the kernel
    let norm = kernel.iter().sum::<f64>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Create a sampled Gaussian derivative kernel, applied as a correlation.
///
/// The sampled kernel is corrected so that its discrete moments match the continuous
/// operator on polynomials: the first derivative kernel maps `x` to exactly 1 and the
/// second derivative kernel sums to zero and maps `x²` to exactly 2.
///
/// # Arguments
///
/// * `sigma` - The sigma of the gaussian, in voxels.
/// * `order` - The derivative order.
///
/// # Returns
///
/// A kernel of length `2 * kernel_radius(sigma) + 1`.
pub fn gaussian_derivative_kernel_1d(sigma: f64, order: DerivativeOrder) -> Vec<f64> {
    let radius = kernel_radius(sigma);
    let gaussian = gaussian_kernel_1d(2 * radius + 1, sigma);
    let offsets = (0..gaussian.len()).map(|i| i as f64 - radius as f64);
    let sigma_sq = sigma * sigma;

    match order {
        DerivativeOrder::Zero => gaussian,
        DerivativeOrder::First => {
            let mut kernel = offsets
                .zip(gaussian.iter())
                .map(|(x, g)| x / sigma_sq * g)
                .collect::<Vec<_>>();

            let moment = moment(&kernel, 1);
            if !moment.is_normal() {
                return central_difference(radius, order);
            }
            kernel.iter_mut().for_each(|k| *k /= moment);
            kernel
        }
        DerivativeOrder::Second => {
            let mut kernel = offsets
                .zip(gaussian.iter())
                .map(|(x, g)| (x * x / (sigma_sq * sigma_sq) - 1.0 / sigma_sq) * g)
                .collect::<Vec<_>>();

            // remove the DC response
            let sum = kernel.iter().sum::<f64>();
            kernel
                .iter_mut()
                .zip(gaussian.iter())
                .for_each(|(k, g)| *k -= g * sum);

            let moment = moment(&kernel, 2);
            if !moment.is_normal() {
                return central_difference(radius, order);
            }
            kernel.iter_mut().for_each(|k| *k *= 2.0 / moment);
            kernel
        }
    }
}

fn moment(kernel: &[f64], power: i32) -> f64 {
    let radius = (kernel.len() / 2) as f64;
    kernel
        .iter()
        .enumerate()
        .map(|(i, k)| (i as f64 - radius).powi(power) * k)
        .sum()
}

// limit of the corrected kernels when sigma goes to zero
fn central_difference(radius: usize, order: DerivativeOrder) -> Vec<f64> {
    let mut kernel = vec![0.0; 2 * radius + 1];
    match order {
        DerivativeOrder::Zero => kernel[radius] = 1.0,
        DerivativeOrder::First => {
            kernel[radius - 1] = -0.5;
            kernel[radius + 1] = 0.5;
        }
        DerivativeOrder::Second => {
            kernel[radius - 1] = 1.0;
            kernel[radius] = -2.0;
            kernel[radius + 1] = 1.0;
        }
    }
    kernel
}
