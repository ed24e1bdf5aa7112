use sheetness_volume::VolumeError;

use crate::parallel::ParallelError;

/// An error type for the sheetness filters and pipeline.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SheetnessError {
    /// Error when no smoothing scale was requested.
    #[error("At least one sigma is required")]
    EmptySigmas,

    /// Error when a smoothing scale is not strictly positive or not finite.
    #[error("Invalid sigma {0}, must be finite and > 0")]
    InvalidSigma(f64),

    /// Error when a shape parameter (alpha, beta, gamma or C) is not strictly positive.
    #[error("Invalid parameter {name} = {value}, must be finite and > 0")]
    InvalidParameter {
        /// The name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Error when the estimation scale is outside (0, 1].
    #[error("Invalid scale {0}, must be in (0, 1]")]
    InvalidScale(f64),

    /// Error when the requested label does not occur in the label mask.
    #[error("Label {0} not found in the label mask")]
    LabelNotFound(i64),

    /// Error raised by a volume operation.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// Error raised while scheduling parallel work.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

impl SheetnessError {
    pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), Self> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(SheetnessError::InvalidParameter { name, value })
        }
    }
}
