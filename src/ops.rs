//! Pointwise operations on same-shaped sample arrays.
//!
//! Binary operations update their first argument in place.

use crate::error::VolumeError;

use ndarray::{Array3, Zip};

fn check_shape(left: &Array3<f32>, right: &Array3<f32>) -> Result<(), VolumeError> {
    if left.dim() != right.dim() {
        return Err(VolumeError::ShapeMismatch {
            left: left.dim(),
            right: right.dim(),
        });
    }
    Ok(())
}

/// Write `1.0` into `dst` where `src` lies within `[low, high]`, else `0.0`.
pub fn threshold(
    src: &Array3<f32>,
    dst: &mut Array3<f32>,
    low: f32,
    high: f32,
) -> Result<(), VolumeError> {
    check_shape(dst, src)?;
    Zip::from(dst).and(src).par_for_each(|d, &s| {
        *d = if s >= low && s <= high { 1.0 } else { 0.0 };
    });
    Ok(())
}

/// `dst = 1 - dst` for a 0/1 valued array.
pub fn invert_binary(dst: &mut Array3<f32>) {
    dst.par_mapv_inplace(|v| 1.0 - v);
}

pub fn mul(dst: &mut Array3<f32>, rhs: &Array3<f32>) -> Result<(), VolumeError> {
    check_shape(dst, rhs)?;
    Zip::from(dst).and(rhs).par_for_each(|d, &r| *d *= r);
    Ok(())
}

pub fn add(dst: &mut Array3<f32>, rhs: &Array3<f32>) -> Result<(), VolumeError> {
    check_shape(dst, rhs)?;
    Zip::from(dst).and(rhs).par_for_each(|d, &r| *d += r);
    Ok(())
}

pub fn div(dst: &mut Array3<f32>, rhs: &Array3<f32>) -> Result<(), VolumeError> {
    check_shape(dst, rhs)?;
    Zip::from(dst).and(rhs).par_for_each(|d, &r| *d /= r);
    Ok(())
}

/// Convert a coverage mask into a 0/1 valued array.
pub fn mask_to_binary(mask: &Array3<bool>) -> Array3<f32> {
    mask.mapv(|covered| if covered { 1.0 } else { 0.0 })
}
