#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// broadcasting binary functor filter.
pub mod broadcast;

/// multi-scale combination of responses.
pub mod combine;

/// symmetric eigen-analysis of Hessian volumes.
pub mod eigen;

/// volume enhancement module.
pub mod enhance;

/// error types for the crate.
pub mod error;

/// data-driven sheetness parameter estimation.
pub mod estimation;

/// volume filtering module.
pub mod filter;

/// per-voxel functors.
pub mod functor;

/// the multi-scale sheetness pipeline.
pub mod generator;

/// Gaussian-derivative Hessian computation.
pub mod hessian;

/// module containing parallization utilities.
pub mod parallel;

/// voxel statistics.
pub mod statistics;

/// operations to threshold volumes.
pub mod threshold;

pub use error::SheetnessError;
pub use generator::{
    NoiseNormalization, SheetnessConfig, SheetnessFeatureGenerator, SheetnessMethod,
    TraceReference, UnsharpMask,
};
pub use parallel::{CancellationToken, ExecutionStrategy};
