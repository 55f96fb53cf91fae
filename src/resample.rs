use crate::enums::Interpolation;
use crate::interpolator::Interpolator;
use crate::volume::{Grid, Volume};

use ndarray::{Array3, Zip};

/// Default fill for samples outside the source volume. Implausible for real
/// data, but never used to decide coverage.
pub const SENTINEL: f32 = -123456789.0;

/// Slack, in index units, for a target sample to count as inside the source.
const BOUNDS_TOLERANCE: f64 = 1e-4;

/// Continuous indices this close to an integer are snapped onto it.
const SNAP_TOLERANCE: f64 = 1e-6;

#[inline]
fn snap(index: f64) -> f64 {
    let rounded = index.round();
    if (index - rounded).abs() < SNAP_TOLERANCE {
        rounded
    } else {
        index
    }
}

fn sample_at(
    src: &Volume,
    src_grid: &Grid,
    grid: &Grid,
    interpolation: Interpolation,
    (z, y, x): (usize, usize, usize),
) -> Option<f32> {
    let point = grid.index_to_physical([x as f64, y as f64, z as f64]);
    let index = src_grid.physical_to_continuous_index(point).map(snap);

    let inside = (0..3).all(|a| {
        index[a] >= -BOUNDS_TOLERANCE
            && index[a] <= (src_grid.size[a] - 1) as f64 + BOUNDS_TOLERANCE
    });
    if !inside {
        return None;
    }

    let value = match interpolation {
        Interpolation::Linear => Interpolator::trilinear(&src.data, index[2], index[1], index[0]),
        Interpolation::Nearest => Interpolator::nearest(&src.data, index[2], index[1], index[0]),
    };
    Some(value)
}

/// Resample `src` onto `grid`. Samples outside `src` are set to `fill`.
pub fn resample(src: &Volume, grid: &Grid, interpolation: Interpolation, fill: f32) -> Volume {
    let src_grid = src.grid();
    let mut values = Array3::zeros(grid.dim());

    Zip::indexed(&mut values).par_for_each(|index, value| {
        *value = sample_at(src, &src_grid, grid, interpolation, index).unwrap_or(fill);
    });

    Volume::new(values, grid.origin, grid.spacing).with_data_type(src.data_type)
}

/// Resample `src` onto `grid`, returning the values together with a mask of
/// the target samples that fall inside `src`. Uncovered samples are `0.0`.
pub fn resample_with_coverage(
    src: &Volume,
    grid: &Grid,
    interpolation: Interpolation,
) -> (Volume, Array3<bool>) {
    let src_grid = src.grid();
    let mut values = Array3::zeros(grid.dim());
    let mut coverage = Array3::from_elem(grid.dim(), false);

    Zip::indexed(&mut values)
        .and(&mut coverage)
        .par_for_each(|index, value, covered| {
            match sample_at(src, &src_grid, grid, interpolation, index) {
                Some(v) => {
                    *value = v;
                    *covered = true;
                }
                None => {
                    *value = 0.0;
                    *covered = false;
                }
            }
        });

    let volume = Volume::new(values, grid.origin, grid.spacing).with_data_type(src.data_type);
    (volume, coverage)
}
