use log::{debug, info};
use sheetness_volume::{EigenvalueTriple, Volume};

use crate::error::SheetnessError;
use crate::functor::frobenius_norm_image;
use crate::parallel::{CancellationToken, ExecutionStrategy};
use crate::statistics::{label_statistics, statistics};

/// Sheetness parameters derived from the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedParameters {
    /// Sheet / tube sensitivity.
    pub alpha: f64,
    /// Tube suppression.
    pub beta: f64,
    /// Noise normalization constant, `scale * maximum_norm`.
    pub c: f64,
    /// Largest Frobenius norm of the eigenvalues inside the estimation region.
    pub maximum_norm: f64,
}

/// Estimates the noise normalization constant of a sheetness measure from an eigenvalue
/// volume.
///
/// `C` is the largest Frobenius norm of the eigenvalue triples, over the voxels of an
/// optional label mask equal to `label` or over the whole volume, multiplied by `scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetnessParameterEstimator {
    /// Fraction of the maximum norm used as `C`, in (0, 1].
    pub scale: f64,
    /// Label selecting the estimation region in the mask.
    pub label: u8,
}

impl Default for SheetnessParameterEstimator {
    fn default() -> Self {
        Self {
            scale: 0.1,
            label: 1,
        }
    }
}

impl SheetnessParameterEstimator {
    /// Create an estimator with the given scale and label.
    pub fn new(scale: f64, label: u8) -> Self {
        Self { scale, label }
    }

    /// Estimate the sheetness parameters.
    ///
    /// The eigenvalue volume is only read.
    ///
    /// # Arguments
    ///
    /// * `eigenvalues` - The eigenvalue volume.
    /// * `mask` - Optional label mask with the size of `eigenvalues`.
    /// * `strategy` - The execution strategy.
    /// * `cancel` - Optional cancellation token.
    ///
    /// # Errors
    ///
    /// Returns an error if the scale is outside (0, 1], the mask size differs from the
    /// eigenvalue volume, the label does not occur in the mask, or the volume is empty.
    pub fn estimate(
        &self,
        eigenvalues: &Volume<EigenvalueTriple>,
        mask: Option<&Volume<u8>>,
        strategy: ExecutionStrategy,
        cancel: Option<&CancellationToken>,
    ) -> Result<EstimatedParameters, SheetnessError> {
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(SheetnessError::InvalidScale(self.scale));
        }

        let norm = frobenius_norm_image(eigenvalues, strategy, cancel)?;
        let stats = match mask {
            Some(mask) => label_statistics(&norm, mask, self.label, strategy)?,
            None => statistics(&norm, strategy)?,
        };
        debug!(
            "frobenius norm over {} voxels: min {}, max {}, mean {}",
            stats.count, stats.min, stats.max, stats.mean
        );

        let params = EstimatedParameters {
            alpha: 0.5,
            beta: 0.5,
            c: self.scale * stats.max,
            maximum_norm: stats.max,
        };
        info!(
            "estimated sheetness parameters: alpha {}, beta {}, c {} (scale {})",
            params.alpha, params.beta, params.c, self.scale
        );

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sheetness_volume::VolumeSize;

    fn eigenvalues() -> Volume<EigenvalueTriple> {
        Volume::from_fn(VolumeSize::new(4, 4, 2), |[x, y, z]| {
            [x as f64, -(y as f64), 2.0 * z as f64]
        })
    }

    #[test]
    fn test_estimate_global_maximum() -> Result<(), SheetnessError> {
        let params = SheetnessParameterEstimator::default().estimate(
            &eigenvalues(),
            None,
            ExecutionStrategy::Serial,
            None,
        )?;

        // largest norm at (3, 3, 1): sqrt(9 + 9 + 4)
        assert_relative_eq!(params.maximum_norm, 22f64.sqrt());
        assert_relative_eq!(params.c, 0.1 * 22f64.sqrt());
        assert_eq!(params.alpha, 0.5);
        assert_eq!(params.beta, 0.5);
        Ok(())
    }

    #[test]
    fn test_estimate_scales_linearly() -> Result<(), SheetnessError> {
        let input = eigenvalues();
        let c = |scale: f64| {
            SheetnessParameterEstimator::new(scale, 1)
                .estimate(&input, None, ExecutionStrategy::Serial, None)
                .map(|p| p.c)
        };
        assert_relative_eq!(c(0.5)?, 5.0 * c(0.1)?, epsilon = 1e-12);
        assert_relative_eq!(c(1.0)?, 22f64.sqrt());
        Ok(())
    }

    #[test]
    fn test_estimate_full_mask_matches_global() -> Result<(), SheetnessError> {
        let input = eigenvalues();
        let mask = input.graft(1u8);
        let estimator = SheetnessParameterEstimator::new(0.05, 1);

        let masked = estimator.estimate(&input, Some(&mask), ExecutionStrategy::Parallel, None)?;
        let global = estimator.estimate(&input, None, ExecutionStrategy::Serial, None)?;
        assert_eq!(masked, global);
        Ok(())
    }

    #[test]
    fn test_estimate_masked_region() -> Result<(), SheetnessError> {
        let input = eigenvalues();
        let mask = Volume::from_fn(input.size(), |[x, _, z]| u8::from(x < 2 && z == 0) * 3);

        let params = SheetnessParameterEstimator::new(1.0, 3).estimate(
            &input,
            Some(&mask),
            ExecutionStrategy::Serial,
            None,
        )?;
        // largest norm at (1, 3, 0): sqrt(1 + 9)
        assert_relative_eq!(params.c, 10f64.sqrt());
        Ok(())
    }

    #[test]
    fn test_estimate_errors() {
        let input = eigenvalues();
        for scale in [0.0, -0.5, 1.5, f64::NAN] {
            let res = SheetnessParameterEstimator::new(scale, 1).estimate(
                &input,
                None,
                ExecutionStrategy::Serial,
                None,
            );
            assert!(matches!(res, Err(SheetnessError::InvalidScale(_))));
        }

        let mask = input.graft(0u8);
        let res = SheetnessParameterEstimator::default().estimate(
            &input,
            Some(&mask),
            ExecutionStrategy::Serial,
            None,
        );
        assert_eq!(res, Err(SheetnessError::LabelNotFound(1)));
    }
}
