use crate::enums::{Axis, DataType, Orientation};
use crate::error::VolumeError;

use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;

/// Sampling grid of a volume. All triples are in (x, y, z) order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub size: [usize; 3],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
}

impl Grid {
    /// Physical end of the grid along `axis`: `origin + size * spacing`.
    pub fn extent(&self, axis: Axis) -> f64 {
        let a = axis.index();
        self.origin[a] + self.size[a] as f64 * self.spacing[a]
    }

    /// Array shape for this grid (depth, height, width).
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.size[2], self.size[1], self.size[0])
    }

    #[inline]
    pub fn index_to_physical(&self, index: [f64; 3]) -> [f64; 3] {
        [
            self.origin[0] + index[0] * self.spacing[0],
            self.origin[1] + index[1] * self.spacing[1],
            self.origin[2] + index[2] * self.spacing[2],
        ]
    }

    #[inline]
    pub fn physical_to_continuous_index(&self, point: [f64; 3]) -> [f64; 3] {
        [
            (point[0] - self.origin[0]) / self.spacing[0],
            (point[1] - self.origin[1]) / self.spacing[1],
            (point[2] - self.origin[2]) / self.spacing[2],
        ]
    }

    pub fn validate_spacing(&self) -> Result<(), VolumeError> {
        if self.spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
            Ok(())
        } else {
            Err(VolumeError::InvalidSpacing(self.spacing))
        }
    }
}

/// A dense scalar volume with physical geometry.
///
/// Samples are stored as `f32` and indexed `[z, y, x]`; `origin` and `spacing`
/// are in (x, y, z) order.
#[derive(Debug, Clone, Default)]
pub struct Volume {
    pub data: Array3<f32>,
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub data_type: DataType,
}

impl Volume {
    pub fn new(data: Array3<f32>, origin: [f64; 3], spacing: [f64; 3]) -> Self {
        Self {
            data,
            origin,
            spacing,
            data_type: DataType::F32,
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Number of samples per axis in (x, y, z) order
    pub fn size(&self) -> [usize; 3] {
        let (depth, height, width) = self.data.dim();
        [width, height, depth]
    }

    pub fn grid(&self) -> Grid {
        Grid {
            size: self.size(),
            origin: self.origin,
            spacing: self.spacing,
        }
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        self.grid().extent(axis)
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    /// Copy out the axis-aligned region starting at `start` with `size` samples
    /// per axis, both in (x, y, z) order. The origin moves with the region.
    pub fn subimage(&self, start: [usize; 3], size: [usize; 3]) -> Result<Volume, VolumeError> {
        let bounds = self.size();
        let fits = (0..3).all(|a| size[a] > 0 && start[a] + size[a] <= bounds[a]);
        if !fits {
            return Err(VolumeError::OutOfBounds {
                start,
                size,
                bounds,
            });
        }

        let data = self
            .data
            .slice(s![
                start[2]..start[2] + size[2],
                start[1]..start[1] + size[1],
                start[0]..start[0] + size[0]
            ])
            .to_owned();
        let origin = self.grid().index_to_physical(start.map(|i| i as f64));

        Ok(Volume {
            data,
            origin,
            spacing: self.spacing,
            data_type: self.data_type,
        })
    }

    /// Drop `margin` slices from both ends of the z axis.
    pub fn trim_margin(&self, margin: usize) -> Result<Volume, VolumeError> {
        let [width, height, depth] = self.size();
        let trimmed = margin
            .checked_mul(2)
            .filter(|&both_ends| both_ends < depth)
            .ok_or(VolumeError::MarginTooLarge { margin, depth })?;
        self.subimage([0, 0, margin], [width, height, depth - trimmed])
    }

    /// Grow the volume by `lower`/`upper` samples per axis, filling the new
    /// border with `fill`. Original samples keep their physical position.
    pub fn pad(&self, lower: [usize; 3], upper: [usize; 3], fill: f32) -> Volume {
        self.pad_with_coverage(lower, upper, fill).0
    }

    /// Like [`Volume::pad`], additionally returning a mask that is `true` on the
    /// original samples and `false` on the padding.
    pub fn pad_with_coverage(
        &self,
        lower: [usize; 3],
        upper: [usize; 3],
        fill: f32,
    ) -> (Volume, Array3<bool>) {
        let [width, height, depth] = self.size();
        let shape = (
            depth + lower[2] + upper[2],
            height + lower[1] + upper[1],
            width + lower[0] + upper[0],
        );
        let inner = s![
            lower[2]..lower[2] + depth,
            lower[1]..lower[1] + height,
            lower[0]..lower[0] + width
        ];

        let mut data = Array3::from_elem(shape, fill);
        data.slice_mut(inner).assign(&self.data);
        let mut coverage = Array3::from_elem(shape, false);
        coverage.slice_mut(inner).fill(true);

        let origin = self.grid().index_to_physical(lower.map(|p| -(p as f64)));
        let padded = Volume {
            data,
            origin,
            spacing: self.spacing,
            data_type: self.data_type,
        };
        (padded, coverage)
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: &Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        if !self.is_valid_index(index, orientation) {
            return None;
        }
        let slice_result = match orientation {
            Orientation::Axial => self.data().slice(s![index, .., ..]),
            Orientation::Coronal => self.data().slice(s![.., index, ..]),
            Orientation::Sagittal => self.data().slice(s![.., .., index]),
        };
        Some(slice_result)
    }

    fn is_valid_index(&self, index: usize, orientation: &Orientation) -> bool {
        let dim = self.data.dim();
        let max_index = match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        };
        index < max_index
    }
}
