use crate::enums::{Axis, DataType, Interpolation, OverlapPolicy, SingleInputPolicy, TrimProbe};
use crate::error::{StitchError, VolumeError};
use crate::ops;
use crate::resample::resample_with_coverage;
use crate::volume::Volume;

use ndarray::Array3;
use ndarray::Axis as ArrayAxis;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Volumes are concatenated along this axis.
pub const STITCH_AXIS: Axis = Axis::Z;

const SPACING_TOLERANCE: f64 = 1e-4;
const ORIGIN_TOLERANCE: f64 = 1e-3;
const PADDING_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Default)]
pub struct StitchOptions {
    /// Slices dropped from both ends of every input before alignment.
    pub margin: usize,
    pub overlap: OverlapPolicy,
    pub interpolation: Interpolation,
    pub trim_probe: TrimProbe,
    pub single_input: SingleInputPolicy,
}

impl StitchOptions {
    pub fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_trim_probe(mut self, trim_probe: TrimProbe) -> Self {
        self.trim_probe = trim_probe;
        self
    }

    pub fn with_single_input(mut self, single_input: SingleInputPolicy) -> Self {
        self.single_input = single_input;
        self
    }
}

/// Merges volumes that overlap along the z axis into one volume covering
/// their union.
///
/// Inputs must share the in-plane grid (size, spacing and origin along x and
/// y); they may differ in z position and z spacing. The first input defines
/// the output grid; every other input is resampled onto it.
#[derive(Debug, Clone, Default)]
pub struct VolumeStitcher {
    options: StitchOptions,
}

impl VolumeStitcher {
    pub fn new(options: StitchOptions) -> Self {
        Self { options }
    }

    /// Stitch `volumes` in order of priority.
    ///
    /// # Errors
    ///
    /// * [`StitchError::InsufficientInput`] for an empty list, or a single
    ///   volume under [`SingleInputPolicy::Reject`]
    /// * [`StitchError::IncompatibleGeometry`] if the in-plane grids differ
    /// * [`StitchError::Volume`] if the margin consumes a whole volume
    pub fn stitch(&self, volumes: &[Volume]) -> Result<Volume, StitchError> {
        let margin = self.options.margin;

        if let [single] = volumes {
            return match self.options.single_input {
                SingleInputPolicy::Reject => Err(StitchError::InsufficientInput { count: 1 }),
                SingleInputPolicy::PassThrough => {
                    info!("Single input volume, passing through");
                    Ok(single.trim_margin(margin)?.with_data_type(DataType::F32))
                }
            };
        }

        let trimmed: Vec<Volume> = volumes
            .iter()
            .map(|volume| volume.trim_margin(margin))
            .collect::<Result<_, _>>()?;
        let Some((first, rest)) = trimmed.split_first() else {
            return Err(StitchError::InsufficientInput { count: 0 });
        };

        info!("Stitching {} volumes (margin {})", trimmed.len(), margin);
        Self::validate_geometry(first, rest)?;

        let (min_extent, max_extent) = Self::stitch_range(&trimmed);
        debug!("Stitched range along z: [{min_extent}, {max_extent})");

        let mut accumulator = Accumulator::seed(first, min_extent, max_extent);
        for (i, candidate) in rest.iter().enumerate() {
            let contributed =
                accumulator.accumulate(candidate, self.options.interpolation, self.options.overlap)?;
            debug!("Volume {} contributed {} voxels", i + 1, contributed);
        }

        let depth = accumulator.counts.dim().0;
        let range = accumulator
            .covered_range(self.options.trim_probe)
            .unwrap_or_else(|| {
                warn!("Trim probe found no covered slice, keeping all {depth} slices");
                0..depth
            });
        debug!("Keeping slices {:?} of {}", range, depth);

        let stitched = accumulator.finish()?;
        let [width, height, _] = stitched.size();
        let cropped = stitched
            .subimage([0, 0, range.start], [width, height, range.len()])?
            .with_data_type(DataType::F32);

        info!("Stitched volume size {:?}", cropped.size());
        Ok(cropped)
    }

    fn validate_geometry(first: &Volume, rest: &[Volume]) -> Result<(), StitchError> {
        first.grid().validate_spacing()?;

        for (i, volume) in rest.iter().enumerate() {
            let index = i + 1;
            volume.grid().validate_spacing()?;

            let incompatible = |reason: String| StitchError::IncompatibleGeometry { index, reason };

            for axis in [Axis::X, Axis::Y] {
                let a = axis.index();
                if volume.size()[a] != first.size()[a] {
                    return Err(incompatible(format!(
                        "size along {:?} is {}, expected {}",
                        axis,
                        volume.size()[a],
                        first.size()[a]
                    )));
                }

                let spacing = first.spacing[a];
                if (volume.spacing[a] - spacing).abs() > SPACING_TOLERANCE * spacing {
                    return Err(incompatible(format!(
                        "spacing along {:?} is {}, expected {}",
                        axis, volume.spacing[a], spacing
                    )));
                }

                if (volume.origin[a] - first.origin[a]).abs() > ORIGIN_TOLERANCE * spacing {
                    return Err(incompatible(format!(
                        "origin along {:?} is {}, expected {}",
                        axis, volume.origin[a], first.origin[a]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Physical range along the stitching axis covered by any volume.
    fn stitch_range(volumes: &[Volume]) -> (f64, f64) {
        let axis = STITCH_AXIS.index();
        volumes.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min_extent, max_extent), volume| {
                (
                    min_extent.min(volume.origin[axis]),
                    max_extent.max(volume.extent(STITCH_AXIS)),
                )
            },
        )
    }
}

/// Number of whole slices of `spacing` needed to bridge `distance`.
fn padding_slices(distance: f64, spacing: f64) -> usize {
    let slices = (distance / spacing - PADDING_TOLERANCE).ceil();
    if slices > 0.0 { slices as usize } else { 0 }
}

/// Running sum of contributions and per-voxel contributor counts on the
/// output grid.
struct Accumulator {
    target: Volume,
    counts: Array3<f32>,
}

impl Accumulator {
    /// Pad `first` along z to span `[min_extent, max_extent)` and take it as
    /// the initial contribution.
    fn seed(first: &Volume, min_extent: f64, max_extent: f64) -> Self {
        let axis = STITCH_AXIS.index();
        let spacing = first.spacing[axis];
        let pad_min = padding_slices(first.origin[axis] - min_extent, spacing);
        let pad_max = padding_slices(max_extent - first.extent(STITCH_AXIS), spacing);
        debug!("Padding first volume by {pad_min} slices below and {pad_max} above");

        let mut lower = [0; 3];
        let mut upper = [0; 3];
        lower[axis] = pad_min;
        upper[axis] = pad_max;
        let (target, coverage) = first.pad_with_coverage(lower, upper, 0.0);

        Self {
            target,
            counts: ops::mask_to_binary(&coverage),
        }
    }

    /// Add `candidate` into the running sum. Returns the number of voxels it
    /// contributed to.
    fn accumulate(
        &mut self,
        candidate: &Volume,
        interpolation: Interpolation,
        overlap: OverlapPolicy,
    ) -> Result<usize, VolumeError> {
        let mut empty = Array3::zeros(self.counts.dim());
        ops::threshold(&self.counts, &mut empty, 0.0, 0.0)?;

        let (mut resampled, coverage) =
            resample_with_coverage(candidate, &self.target.grid(), interpolation);
        let mut binary = ops::mask_to_binary(&coverage);

        if overlap == OverlapPolicy::FirstContributor {
            ops::mul(&mut binary, &empty)?;
        }

        ops::mul(resampled.data_mut(), &binary)?;
        ops::add(self.target.data_mut(), resampled.data())?;
        ops::add(&mut self.counts, &binary)?;

        Ok(binary.iter().filter(|&&b| b > 0.0).count())
    }

    /// Slices of the output that hold any contribution according to `probe`.
    fn covered_range(&self, probe: TrimProbe) -> Option<Range<usize>> {
        let (depth, height, width) = self.counts.dim();
        let is_covered = |z: usize| match probe {
            TrimProbe::AnySample => self
                .counts
                .index_axis(ArrayAxis(0), z)
                .iter()
                .any(|&c| c > 0.0),
            TrimProbe::CentralColumn => self.counts[[z, height / 2, width / 2]] > 0.0,
        };

        let start = (0..depth).find(|&z| is_covered(z))?;
        let end = (start..depth).rev().find(|&z| is_covered(z))? + 1;
        Some(start..end)
    }

    /// Divide the sum by the counts. Voxels without contributors become `0`.
    fn finish(mut self) -> Result<Volume, VolumeError> {
        let mut uncovered = Array3::zeros(self.counts.dim());
        ops::threshold(&self.counts, &mut uncovered, 0.0, 0.0)?;
        ops::add(&mut self.counts, &uncovered)?;
        ops::div(self.target.data_mut(), &self.counts)?;
        Ok(self.target)
    }
}
