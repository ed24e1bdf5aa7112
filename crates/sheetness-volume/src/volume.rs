use crate::error::VolumeError;

/// Volume size in voxels
///
/// A struct to represent the extent of a 3D volume along the x, y and z axes.
///
/// # Examples
///
/// ```
/// use sheetness_volume::VolumeSize;
///
/// let size = VolumeSize {
///     width: 10,
///     height: 20,
///     depth: 5,
/// };
///
/// assert_eq!(size.num_voxels(), 1000);
/// assert_eq!(size.extent(2), 5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeSize {
    /// Extent along the x axis (fastest varying).
    pub width: usize,
    /// Extent along the y axis.
    pub height: usize,
    /// Extent along the z axis (slowest varying, the slice axis).
    pub depth: usize,
}

impl VolumeSize {
    /// Create a new volume size from its x, y and z extents.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Number of voxels in one z-slice.
    pub fn slice_len(&self) -> usize {
        self.width * self.height
    }

    /// Extent along `axis` (0 = x, 1 = y, 2 = z).
    ///
    /// PRECONDITION: `axis < 3`.
    pub fn extent(&self, axis: usize) -> usize {
        match axis {
            0 => self.width,
            1 => self.height,
            _ => self.depth,
        }
    }

    /// The extents as an `[x, y, z]` array.
    pub fn extents(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    /// Linear offset of voxel `(x, y, z)` in raster order.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    /// Check whether `(x, y, z)` lies inside the volume.
    #[inline]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        x < self.width && y < self.height && z < self.depth
    }
}

impl std::fmt::Display for VolumeSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "VolumeSize {{ width: {}, height: {}, depth: {} }}",
            self.width, self.height, self.depth
        )
    }
}

impl From<[usize; 3]> for VolumeSize {
    fn from(size: [usize; 3]) -> Self {
        VolumeSize {
            width: size[0],
            height: size[1],
            depth: size[2],
        }
    }
}

/// Physical-space metadata of a volume.
///
/// Filters never interpret the direction cosines; they are carried from input to output.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolumeGeometry {
    /// Physical position of the first voxel.
    pub origin: [f64; 3],
    /// Physical distance between voxel centers along x, y and z.
    pub spacing: [f64; 3],
    /// Direction cosines, one row per axis.
    pub direction: [[f64; 3]; 3],
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

impl VolumeGeometry {
    /// Geometry with unit direction, zero origin and the given spacing.
    pub fn with_spacing(spacing: [f64; 3]) -> Self {
        Self {
            spacing,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), VolumeError> {
        if self.spacing.iter().any(|s| !(*s > 0.0)) {
            return Err(VolumeError::InvalidSpacing(self.spacing));
        }
        Ok(())
    }
}

/// A dense 3D volume of samples.
///
/// Samples are stored in raster order: x varies fastest, then y, then z. The sample type
/// may be a scalar (`f32`, `i16`, `u8`, ...) or a fixed-size value such as an eigenvalue
/// triple or a symmetric matrix.
///
/// A volume produced by a filter is never modified by a downstream filter; every stage
/// allocates its own output.
#[derive(Clone, Debug, PartialEq)]
pub struct Volume<T> {
    data: Vec<T>,
    size: VolumeSize,
    geometry: VolumeGeometry,
}

impl<T> Volume<T> {
    /// Create a new volume from sample data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the volume in voxels.
    /// * `data` - The samples in raster order.
    ///
    /// # Errors
    ///
    /// If the length of the data does not match the volume size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetness_volume::{Volume, VolumeSize};
    ///
    /// let volume = Volume::<f32>::new(VolumeSize::new(2, 2, 2), vec![0.0; 8]).unwrap();
    ///
    /// assert_eq!(volume.depth(), 2);
    /// assert_eq!(volume.num_voxels(), 8);
    /// ```
    pub fn new(size: VolumeSize, data: Vec<T>) -> Result<Self, VolumeError> {
        if data.len() != size.num_voxels() {
            return Err(VolumeError::InvalidDataLength(
                data.len(),
                size.num_voxels(),
            ));
        }

        Ok(Self {
            data,
            size,
            geometry: VolumeGeometry::default(),
        })
    }

    /// Create a new volume with every voxel set to `val`.
    pub fn from_size_val(size: VolumeSize, val: T) -> Result<Self, VolumeError>
    where
        T: Clone,
    {
        Self::new(size, vec![val; size.num_voxels()])
    }

    /// Create a new volume by evaluating `f` at every voxel index `[x, y, z]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetness_volume::{Volume, VolumeSize};
    ///
    /// let ramp = Volume::from_fn(VolumeSize::new(4, 1, 1), |[x, _, _]| x as f32);
    ///
    /// assert_eq!(ramp.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
    /// ```
    pub fn from_fn(size: VolumeSize, f: impl Fn([usize; 3]) -> T) -> Self {
        let mut data = Vec::with_capacity(size.num_voxels());
        for z in 0..size.depth {
            for y in 0..size.height {
                for x in 0..size.width {
                    data.push(f([x, y, z]));
                }
            }
        }

        Self {
            data,
            size,
            geometry: VolumeGeometry::default(),
        }
    }

    /// Replace the physical-space metadata of the volume.
    ///
    /// # Errors
    ///
    /// Returns an error if any spacing component is not strictly positive.
    pub fn with_geometry(mut self, geometry: VolumeGeometry) -> Result<Self, VolumeError> {
        geometry.validate()?;
        self.geometry = geometry;
        Ok(self)
    }

    /// Get the size of the volume in voxels.
    pub fn size(&self) -> VolumeSize {
        self.size
    }

    /// Get the physical-space metadata of the volume.
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Get the voxel spacing along x, y and z.
    pub fn spacing(&self) -> [f64; 3] {
        self.geometry.spacing
    }

    /// Get the extent along the x axis.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the extent along the y axis.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the extent along the z axis.
    pub fn depth(&self) -> usize {
        self.size.depth
    }

    /// Get the total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.data.len()
    }

    /// Get the samples as a slice in raster order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Get the samples as a mutable slice in raster order.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Get the sample at voxel `[x, y, z]`, or `None` if it is out of bounds.
    pub fn get(&self, [x, y, z]: [usize; 3]) -> Option<&T> {
        if !self.size.contains(x, y, z) {
            return None;
        }
        self.data.get(self.size.offset(x, y, z))
    }

    /// Get a mutable reference to the sample at voxel `[x, y, z]`.
    pub fn get_mut(&mut self, [x, y, z]: [usize; 3]) -> Option<&mut T> {
        if !self.size.contains(x, y, z) {
            return None;
        }
        let offset = self.size.offset(x, y, z);
        self.data.get_mut(offset)
    }

    /// Set the sample at voxel `[x, y, z]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of bounds.
    pub fn set(&mut self, [x, y, z]: [usize; 3], val: T) -> Result<(), VolumeError> {
        let size = self.size;
        let sample = self
            .get_mut([x, y, z])
            .ok_or(VolumeError::VoxelIndexOutOfBounds(x, y, z, size))?;
        *sample = val;
        Ok(())
    }

    /// Get the samples of z-slice `z`.
    ///
    /// PRECONDITION: `z < self.depth()`.
    pub fn slice(&self, z: usize) -> &[T] {
        let len = self.size.slice_len();
        &self.data[z * len..(z + 1) * len]
    }

    /// Allocate a new volume with the same size and geometry, filled with `val`.
    ///
    /// The samples of `self` are not copied.
    pub fn graft<U: Clone>(&self, val: U) -> Volume<U> {
        Volume {
            data: vec![val; self.size.num_voxels()],
            size: self.size,
            geometry: self.geometry,
        }
    }

    /// Apply `f` to every sample, producing a new volume with the same geometry.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Volume<U> {
        Volume {
            data: self.data.iter().map(f).collect(),
            size: self.size,
            geometry: self.geometry,
        }
    }

    /// Cast the samples to a different numeric type.
    ///
    /// # Errors
    ///
    /// If a sample cannot be represented in the target type, an error is returned.
    pub fn cast<U>(&self) -> Result<Volume<U>, VolumeError>
    where
        T: Copy + num_traits::NumCast,
        U: num_traits::NumCast,
    {
        let data = self
            .data
            .iter()
            .map(|&x| {
                U::from(x).ok_or_else(|| VolumeError::CastError(std::any::type_name::<U>().to_string()))
            })
            .collect::<Result<Vec<U>, VolumeError>>()?;

        Ok(Volume {
            data,
            size: self.size,
            geometry: self.geometry,
        })
    }
}
