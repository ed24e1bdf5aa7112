use log::{debug, info};
use num_traits::NumCast;
use sheetness_volume::{EigenvalueTriple, Volume, VolumeSize};

use crate::broadcast::broadcast_binary_filter;
use crate::combine::maximum_absolute_value;
use crate::eigen::eigen_analysis;
use crate::enhance::{shift_scale, unsharp_mask};
use crate::error::SheetnessError;
use crate::estimation::SheetnessParameterEstimator;
use crate::functor::{
    trace_image, unary_functor_filter, DescoteauxSheetness, ExponentConvention, FemurSheetness,
    KrcahSheetness, ModifiedSheetness, SheetPolarity,
};
use crate::hessian::hessian_gaussian;
use crate::parallel::{CancellationToken, ExecutionStrategy};
use crate::statistics::statistics;

/// Region over which the mean Hessian trace of the Krcah measure is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceReference {
    /// One mean over the whole volume.
    #[default]
    Global,
    /// One mean per z-slice, broadcast across the slice.
    PerSlice,
}

/// How the noise normalization constant `C` is obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NoiseNormalization {
    /// A fixed constant.
    Fixed(f64),
    /// Estimated per scale as `scale` times the largest eigenvalue Frobenius norm, inside
    /// the mask voxels equal to `label` when a mask is given.
    Automatic {
        /// Fraction of the maximum norm, in (0, 1].
        scale: f64,
        /// Label of the estimation region.
        label: u8,
    },
}

impl Default for NoiseNormalization {
    fn default() -> Self {
        NoiseNormalization::Automatic {
            scale: 0.05,
            label: 1,
        }
    }
}

/// The sheetness measure applied to the eigenvalues.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SheetnessMethod {
    /// [`KrcahSheetness`] with the mean Hessian trace as noise reference.
    Krcah {
        /// Sheet-versus-blob sensitivity.
        alpha: f64,
        /// Tube suppression.
        beta: f64,
        /// Noise normalization.
        gamma: f64,
        /// Region of the mean trace.
        reference: TraceReference,
    },
    /// [`DescoteauxSheetness`] with `C` as noise reference, giving the noise term
    /// `1 - exp(-(l1 + l2 + l3)² / (2 C²))`.
    Descoteaux {
        /// Sheet-versus-blob sensitivity.
        alpha: f64,
        /// Tube suppression.
        beta: f64,
        /// Source of `C`.
        noise: NoiseNormalization,
    },
    /// [`FemurSheetness`].
    Femur {
        /// Sheet-versus-blob sensitivity.
        alpha: f64,
        /// Tube suppression.
        beta: f64,
        /// Noise normalization.
        gamma: f64,
    },
    /// [`ModifiedSheetness`].
    Modified {
        /// Tube suppression.
        alpha: f64,
        /// Source of `C`.
        noise: NoiseNormalization,
    },
}

impl Default for SheetnessMethod {
    fn default() -> Self {
        SheetnessMethod::Krcah {
            alpha: 0.5,
            beta: 0.5,
            gamma: 0.25,
            reference: TraceReference::Global,
        }
    }
}

/// Unsharp-mask enhancement applied before the Hessian.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnsharpMask {
    /// Sigma of the blur in physical units; `None` uses the current Hessian scale.
    pub sigma: Option<f64>,
    /// Gain `k` of the high-pass residual.
    pub amount: f64,
}

impl Default for UnsharpMask {
    fn default() -> Self {
        Self {
            sigma: Some(1.0),
            amount: 10.0,
        }
    }
}

/// Configuration of one sheetness computation.
///
/// The default reproduces the Krcah bone-segmentation setup: unsharp masking with sigma 1
/// and gain 10, scales 0.75 and 1.0, Krcah measure with a global mean-trace reference,
/// bright sheets, no rescaling.
///
/// # Examples
///
/// ```
/// use sheetness_imgproc::generator::{NoiseNormalization, SheetnessConfig, SheetnessMethod};
///
/// let config = SheetnessConfig::default()
///     .with_sigmas(vec![0.75, 1.0])
///     .with_method(SheetnessMethod::Modified {
///         alpha: 0.5,
///         noise: NoiseNormalization::Automatic { scale: 0.05, label: 1 },
///     })
///     .with_intensity_scaling(100.0);
///
/// assert!(config.validate().is_ok());
/// assert!(config.clone().with_sigmas(vec![]).validate().is_err());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetnessConfig {
    /// Hessian scales in physical units.
    pub sigmas: Vec<f64>,
    /// Optional enhancement before the Hessian.
    pub unsharp: Option<UnsharpMask>,
    /// Sheetness measure.
    pub method: SheetnessMethod,
    /// Which sheets produce a positive response.
    pub polarity: SheetPolarity,
    /// Multiplier applied to the combined sheetness.
    pub intensity_scaling: f64,
    /// Offset added to the combined sheetness before scaling.
    pub intensity_shift: f64,
    /// Execution strategy of every stage.
    pub strategy: ExecutionStrategy,
    /// Optional cooperative cancellation.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub cancel: Option<CancellationToken>,
}

impl Default for SheetnessConfig {
    fn default() -> Self {
        Self {
            sigmas: vec![0.75, 1.0],
            unsharp: Some(UnsharpMask::default()),
            method: SheetnessMethod::default(),
            polarity: SheetPolarity::Bright,
            intensity_scaling: 1.0,
            intensity_shift: 0.0,
            strategy: ExecutionStrategy::default(),
            cancel: None,
        }
    }
}

impl SheetnessConfig {
    /// Set the Hessian scales.
    pub fn with_sigmas(mut self, sigmas: Vec<f64>) -> Self {
        self.sigmas = sigmas;
        self
    }

    /// Set or disable the unsharp-mask enhancement.
    pub fn with_unsharp(mut self, unsharp: Option<UnsharpMask>) -> Self {
        self.unsharp = unsharp;
        self
    }

    /// Set the sheetness measure.
    pub fn with_method(mut self, method: SheetnessMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the sheet polarity.
    pub fn with_polarity(mut self, polarity: SheetPolarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the output multiplier.
    pub fn with_intensity_scaling(mut self, scaling: f64) -> Self {
        self.intensity_scaling = scaling;
        self
    }

    /// Set the output offset.
    pub fn with_intensity_shift(mut self, shift: f64) -> Self {
        self.intensity_shift = shift;
        self
    }

    /// Set the execution strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Check the configuration before any processing.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting: an empty scale list, a non-positive sigma, a
    /// non-positive shape parameter, an estimation scale outside (0, 1], or a non-finite
    /// output transform.
    pub fn validate(&self) -> Result<(), SheetnessError> {
        if self.sigmas.is_empty() {
            return Err(SheetnessError::EmptySigmas);
        }
        if let Some(&sigma) = self.sigmas.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(SheetnessError::InvalidSigma(sigma));
        }

        if let Some(unsharp) = &self.unsharp {
            if let Some(sigma) = unsharp.sigma {
                if !(sigma.is_finite() && sigma > 0.0) {
                    return Err(SheetnessError::InvalidSigma(sigma));
                }
            }
            if !unsharp.amount.is_finite() {
                return Err(SheetnessError::InvalidParameter {
                    name: "amount",
                    value: unsharp.amount,
                });
            }
        }

        match self.method {
            SheetnessMethod::Krcah {
                alpha, beta, gamma, ..
            }
            | SheetnessMethod::Femur { alpha, beta, gamma } => {
                SheetnessError::check_positive("alpha", alpha)?;
                SheetnessError::check_positive("beta", beta)?;
                SheetnessError::check_positive("gamma", gamma)?;
            }
            SheetnessMethod::Descoteaux { alpha, beta, noise } => {
                SheetnessError::check_positive("alpha", alpha)?;
                SheetnessError::check_positive("beta", beta)?;
                validate_noise(&noise)?;
            }
            SheetnessMethod::Modified { alpha, noise } => {
                SheetnessError::check_positive("alpha", alpha)?;
                validate_noise(&noise)?;
            }
        }

        for (name, value) in [
            ("intensity_scaling", self.intensity_scaling),
            ("intensity_shift", self.intensity_shift),
        ] {
            if !value.is_finite() {
                return Err(SheetnessError::InvalidParameter { name, value });
            }
        }

        Ok(())
    }
}

fn validate_noise(noise: &NoiseNormalization) -> Result<(), SheetnessError> {
    match *noise {
        NoiseNormalization::Fixed(c) => SheetnessError::check_positive("c", c),
        NoiseNormalization::Automatic { scale, .. } => {
            if scale > 0.0 && scale <= 1.0 {
                Ok(())
            } else {
                Err(SheetnessError::InvalidScale(scale))
            }
        }
    }
}

/// Computes a multi-scale sheetness volume from an intensity volume.
///
/// For every scale the input is enhanced, its Hessian is eigen-decomposed and the
/// configured measure is evaluated; the scales are merged with
/// [`crate::combine::max_abs`] and the result is shifted and scaled. The generator only
/// holds its configuration, so one instance can process any number of volumes.
#[derive(Debug, Clone)]
pub struct SheetnessFeatureGenerator {
    config: SheetnessConfig,
}

impl SheetnessFeatureGenerator {
    /// Create a generator, validating the configuration.
    pub fn new(config: SheetnessConfig) -> Result<Self, SheetnessError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration of the generator.
    pub fn config(&self) -> &SheetnessConfig {
        &self.config
    }

    /// Compute the sheetness of `input`.
    ///
    /// # Arguments
    ///
    /// * `input` - The intensity volume, e.g. CT in Hounsfield units.
    /// * `mask` - Optional label mask restricting automatic noise estimation.
    ///
    /// # Returns
    ///
    /// A sheetness volume with the size and geometry of `input`.
    pub fn generate<T>(
        &self,
        input: &Volume<T>,
        mask: Option<&Volume<u8>>,
    ) -> Result<Volume<f32>, SheetnessError>
    where
        T: Copy + NumCast,
    {
        let config = &self.config;
        let strategy = config.strategy;
        let cancel = config.cancel.as_ref();

        let source = input.cast::<f64>()?;
        info!(
            "computing sheetness of {} at {} scale(s)",
            source.size(),
            config.sigmas.len()
        );

        let mut combined: Option<Volume<f64>> = None;
        for &sigma in &config.sigmas {
            let sheetness = self.single_scale(&source, sigma, mask, strategy, cancel)?;
            combined = Some(match combined {
                Some(current) => maximum_absolute_value(&current, &sheetness, strategy, cancel)?,
                None => sheetness,
            });
        }

        let combined = combined.ok_or(SheetnessError::EmptySigmas)?;
        let mut scaled = combined.graft(0.0);
        shift_scale(
            &combined,
            &mut scaled,
            config.intensity_shift,
            config.intensity_scaling,
            strategy,
        )?;

        Ok(scaled.map(|&v| v as f32))
    }

    fn single_scale(
        &self,
        source: &Volume<f64>,
        sigma: f64,
        mask: Option<&Volume<u8>>,
        strategy: ExecutionStrategy,
        cancel: Option<&CancellationToken>,
    ) -> Result<Volume<f64>, SheetnessError> {
        let config = &self.config;
        info!("sigma {sigma}: enhancing and computing the Hessian");

        let enhanced_storage;
        let enhanced = match &config.unsharp {
            Some(unsharp) => {
                let mut out = source.graft(0.0);
                let blur_sigma = unsharp.sigma.unwrap_or(sigma);
                unsharp_mask(source, &mut out, blur_sigma, unsharp.amount, strategy, cancel)?;
                enhanced_storage = out;
                &enhanced_storage
            }
            None => source,
        };

        let hessian = hessian_gaussian(enhanced, sigma, strategy, cancel)?;
        let eigenvalues = eigen_analysis(&hessian, strategy, cancel)?;

        let sheetness = match config.method {
            SheetnessMethod::Krcah {
                alpha,
                beta,
                gamma,
                reference,
            } => {
                let trace = trace_image(&hessian, strategy, cancel)?;
                let reference = mean_trace(&trace, reference, strategy)?;
                let functor = KrcahSheetness {
                    alpha,
                    beta,
                    gamma,
                    polarity: config.polarity,
                    convention: ExponentConvention::Unit,
                };
                broadcast_binary_filter(&eigenvalues, &reference, &functor, strategy, cancel)?
            }
            SheetnessMethod::Descoteaux { alpha, beta, noise } => {
                let c = noise_constant(&noise, &eigenvalues, mask, strategy, cancel)?;
                debug!("noise reference {c}");
                let functor = DescoteauxSheetness {
                    alpha,
                    beta,
                    gamma: 1.0,
                    polarity: config.polarity,
                    convention: ExponentConvention::Half,
                };
                let reference = Volume::new(VolumeSize::new(1, 1, 1), vec![c])?;
                broadcast_binary_filter(&eigenvalues, &reference, &functor, strategy, cancel)?
            }
            SheetnessMethod::Femur { alpha, beta, gamma } => {
                let functor = FemurSheetness {
                    alpha,
                    beta,
                    gamma,
                    polarity: config.polarity,
                    convention: ExponentConvention::Unit,
                };
                unary_functor_filter(&eigenvalues, &functor, strategy, cancel)?
            }
            SheetnessMethod::Modified { alpha, noise } => {
                let c = noise_constant(&noise, &eigenvalues, mask, strategy, cancel)?;
                let functor = ModifiedSheetness {
                    alpha,
                    c,
                    polarity: config.polarity,
                };
                unary_functor_filter(&eigenvalues, &functor, strategy, cancel)?
            }
        };

        Ok(sheetness)
    }
}

/// Mean Hessian trace as a broadcastable reference volume.
fn mean_trace(
    trace: &Volume<f64>,
    reference: TraceReference,
    strategy: ExecutionStrategy,
) -> Result<Volume<f64>, SheetnessError> {
    match reference {
        TraceReference::Global => {
            let mean = statistics(trace, strategy)?.mean;
            debug!("mean trace {mean}");
            Ok(Volume::new(VolumeSize::new(1, 1, 1), vec![mean])?)
        }
        TraceReference::PerSlice => {
            let slice_len = trace.size().slice_len().max(1) as f64;
            let means = (0..trace.depth())
                .map(|z| trace.slice(z).iter().sum::<f64>() / slice_len)
                .collect::<Vec<_>>();
            debug!("mean trace per slice {means:?}");
            Ok(Volume::new(VolumeSize::new(1, 1, trace.depth()), means)?)
        }
    }
}

fn noise_constant(
    noise: &NoiseNormalization,
    eigenvalues: &Volume<EigenvalueTriple>,
    mask: Option<&Volume<u8>>,
    strategy: ExecutionStrategy,
    cancel: Option<&CancellationToken>,
) -> Result<f64, SheetnessError> {
    match *noise {
        NoiseNormalization::Fixed(c) => Ok(c),
        NoiseNormalization::Automatic { scale, label } => {
            let estimator = SheetnessParameterEstimator::new(scale, label);
            Ok(estimator.estimate(eigenvalues, mask, strategy, cancel)?.c)
        }
    }
}
