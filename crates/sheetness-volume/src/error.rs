use crate::volume::VolumeSize;

/// An error type for the volume module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VolumeError {
    /// Error when the data length does not match the volume size.
    #[error("Data length ({0}) does not match the volume size ({1})")]
    InvalidDataLength(usize, usize),

    /// Error when two volumes that must share a size do not.
    #[error("Volume size mismatch: expected {0}, got {1}")]
    InvalidVolumeSize(VolumeSize, VolumeSize),

    /// Error when the second operand of a broadcasting operation cannot be
    /// broadcast along a given axis.
    #[error("Cannot broadcast extent {extent} onto extent {target} along axis {axis}")]
    BroadcastMismatch {
        /// The axis (0 = x, 1 = y, 2 = z) where the extents disagree.
        axis: usize,
        /// The extent of the broadcast operand.
        extent: usize,
        /// The extent of the full-resolution operand.
        target: usize,
    },

    /// Error when a voxel index is outside the volume.
    #[error("Voxel index ({0}, {1}, {2}) is out of bounds for {3}")]
    VoxelIndexOutOfBounds(usize, usize, usize, VolumeSize),

    /// Error when a sample cannot be converted to the requested type.
    #[error("Failed to cast sample to {0}")]
    CastError(String),

    /// Error when the voxel spacing is not strictly positive.
    #[error("Invalid voxel spacing {0:?}, all components must be > 0")]
    InvalidSpacing([f64; 3]),

    /// Error when a filter kernel is unusable.
    #[error("Invalid kernel length {0}")]
    InvalidKernelLength(usize),

    /// Error when a volume has no voxels.
    #[error("Volume is empty")]
    EmptyVolume,
}
