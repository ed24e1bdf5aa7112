use rayon::prelude::*;
use sheetness_volume::{Volume, VolumeError};

use crate::error::SheetnessError;
use crate::parallel::ExecutionStrategy;

/// Summary statistics of a set of voxel values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Number of voxels.
    pub count: usize,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Sum of the values.
    pub sum: f64,
    /// Arithmetic mean of the values.
    pub mean: f64,
}

#[derive(Clone, Copy)]
struct Accumulator {
    count: usize,
    min: f64,
    max: f64,
    sum: f64,
}

impl Accumulator {
    const EMPTY: Accumulator = Accumulator {
        count: 0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
        sum: 0.0,
    };

    fn push(mut self, v: f64) -> Self {
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += v;
        self
    }

    fn merge(self, other: Self) -> Self {
        Accumulator {
            count: self.count + other.count,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            sum: self.sum + other.sum,
        }
    }

    fn finish(self) -> Option<Statistics> {
        (self.count > 0).then(|| Statistics {
            count: self.count,
            min: self.min,
            max: self.max,
            sum: self.sum,
            mean: self.sum / self.count as f64,
        })
    }
}

/// Compute the statistics of every voxel of a volume.
///
/// # Errors
///
/// Returns an error if the volume is empty.
pub fn statistics(
    src: &Volume<f64>,
    strategy: ExecutionStrategy,
) -> Result<Statistics, SheetnessError> {
    let data = src.as_slice();
    let acc = strategy.run(data.len(), |parallel| {
        if parallel {
            data.par_iter()
                .fold(|| Accumulator::EMPTY, |acc, &v| acc.push(v))
                .reduce(|| Accumulator::EMPTY, Accumulator::merge)
        } else {
            data.iter().fold(Accumulator::EMPTY, |acc, &v| acc.push(v))
        }
    })?;

    acc.finish().ok_or(VolumeError::EmptyVolume.into())
}

/// Compute the statistics of the voxels of `src` whose label in `labels` equals `label`.
///
/// # Arguments
///
/// * `src` - The value volume.
/// * `labels` - The label mask, with the same size as `src`.
/// * `label` - The label selecting the voxels.
/// * `strategy` - The execution strategy.
///
/// # Errors
///
/// Returns an error if the volumes differ in size or no voxel carries `label`.
pub fn label_statistics<L>(
    src: &Volume<f64>,
    labels: &Volume<L>,
    label: L,
    strategy: ExecutionStrategy,
) -> Result<Statistics, SheetnessError>
where
    L: Copy + PartialEq + Sync + Send + Into<i64>,
{
    if src.size() != labels.size() {
        return Err(VolumeError::InvalidVolumeSize(src.size(), labels.size()).into());
    }

    let data = src.as_slice();
    let mask = labels.as_slice();
    let acc = strategy.run(data.len(), |parallel| {
        if parallel {
            data.par_iter()
                .zip(mask.par_iter())
                .filter(|&(_, &l)| l == label)
                .fold(|| Accumulator::EMPTY, |acc, (&v, _)| acc.push(v))
                .reduce(|| Accumulator::EMPTY, Accumulator::merge)
        } else {
            data.iter()
                .zip(mask.iter())
                .filter(|&(_, &l)| l == label)
                .fold(Accumulator::EMPTY, |acc, (&v, _)| acc.push(v))
        }
    })?;

    acc.finish()
        .ok_or(SheetnessError::LabelNotFound(label.into()))
}
