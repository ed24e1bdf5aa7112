#![deny(missing_docs)]
//! Volume types for 3D scalar and tensor-valued medical images

/// dense 3D volume representation.
pub mod volume;

/// per-voxel tensor types such as symmetric matrices and eigenvalue triples.
pub mod tensor;

/// Error types for the volume module.
pub mod error;

pub use crate::error::VolumeError;
pub use crate::tensor::{EigenvalueTriple, SymmetricMatrix};
pub use crate::volume::{Volume, VolumeGeometry, VolumeSize};
