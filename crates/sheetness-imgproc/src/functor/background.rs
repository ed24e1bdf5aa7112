use super::BinaryFunctor;

/// Marks background voxels of a thresholded intensity / sheetness pair.
///
/// A voxel is foreground (`0`) when its thresholded intensity reaches `lower_threshold`
/// and its sheetness is positive; every other voxel is background (`1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KrcahBackground {
    /// Minimum thresholded intensity of a foreground voxel.
    pub lower_threshold: f64,
}

impl Default for KrcahBackground {
    fn default() -> Self {
        Self {
            lower_threshold: 400.0,
        }
    }
}

impl BinaryFunctor<f64, f64, u8> for KrcahBackground {
    fn call(&self, intensity: &f64, sheetness: &f64) -> u8 {
        if *intensity >= self.lower_threshold && *sheetness > 0.0 {
            0
        } else {
            1
        }
    }
}

/// Complement of [`KrcahBackground`]: `1` for foreground voxels, `0` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KrcahNotBackground {
    /// The background rule this functor inverts.
    pub background: KrcahBackground,
}

impl BinaryFunctor<f64, f64, u8> for KrcahNotBackground {
    fn call(&self, intensity: &f64, sheetness: &f64) -> u8 {
        1 - self.background.call(intensity, sheetness)
    }
}
