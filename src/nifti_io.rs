//! NIfTI-1 reading and writing.
//!
//! Only axis-aligned geometry is supported. The voxel-to-world affine comes
//! from the sform, else the qform (with qfac), else `pixdim`. Axes running
//! towards decreasing world coordinates are flipped so that array index
//! always grows with the physical coordinate; oblique affines are rejected.

use crate::enums::DataType;
use crate::volume::Volume;
use crate::volume_loader::VolumeLoaderError;

use ndarray::{Array3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::typedef::NiftiType;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// Whether `path` names a `.nii` or `.nii.gz` file
pub fn is_nifti_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_ascii_lowercase())
        .is_some_and(|name| name.ends_with(".nii") || name.ends_with(".nii.gz"))
}

pub fn read_nifti(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
    let obj = ReaderOptions::new().read_file(path.as_ref())?;
    let header = obj.header().clone();

    let array = obj.into_volume().into_ndarray::<f32>()?;
    let ndim = array.ndim();
    // A trailing singleton time axis is common for single volumes
    let array = if ndim == 4 && array.shape()[3] == 1 {
        array.index_axis_move(Axis(3), 0)
    } else {
        array
    };
    let array = array
        .into_dimensionality::<Ix3>()
        .map_err(|_| VolumeLoaderError::NotThreeDimensional(ndim))?;

    let (array, origin, spacing) = align_to_axes(array, &affine_of(&header))?;

    // NIfTI arrays are indexed [x, y, z]
    let data = array.permuted_axes([2, 1, 0]).as_standard_layout().into_owned();

    Ok(Volume::new(data, origin, spacing).with_data_type(data_type_of(&header)))
}

/// Write `volume` as a float NIfTI file with axis-aligned sform and qform.
pub fn write_nifti(volume: &Volume, path: impl AsRef<Path>) -> Result<(), nifti::error::NiftiError> {
    let header = header_for(volume);
    let array = volume.data().view().permuted_axes([2, 1, 0]);

    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(&array)
}

/// Relative size of an off-axis affine component still treated as zero.
const AXIS_TOLERANCE: f64 = 1e-4;

/// Voxel-to-world affine as three rows `[m0, m1, m2, t]`.
fn affine_of(header: &NiftiHeader) -> [[f64; 4]; 3] {
    if header.sform_code > 0 {
        return [header.srow_x, header.srow_y, header.srow_z].map(|row| row.map(f64::from));
    }

    let pixdim = header.pixdim.map(f64::from);
    if header.qform_code > 0 {
        let (b, c, d) = (
            header.quatern_b as f64,
            header.quatern_c as f64,
            header.quatern_d as f64,
        );
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let (dx, dy, dz) = (pixdim[1], pixdim[2], pixdim[3] * qfac);

        return [
            [
                (a * a + b * b - c * c - d * d) * dx,
                2.0 * (b * c - a * d) * dy,
                2.0 * (b * d + a * c) * dz,
                header.quatern_x as f64,
            ],
            [
                2.0 * (b * c + a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                2.0 * (c * d - a * b) * dz,
                header.quatern_y as f64,
            ],
            [
                2.0 * (b * d - a * c) * dx,
                2.0 * (c * d + a * b) * dy,
                (a * a + d * d - b * b - c * c) * dz,
                header.quatern_z as f64,
            ],
        ];
    }

    [
        [pixdim[1], 0.0, 0.0, 0.0],
        [0.0, pixdim[2], 0.0, 0.0],
        [0.0, 0.0, pixdim[3], 0.0],
    ]
}

/// Turn an `[x, y, z]` indexed array and its affine into ascending
/// axis-aligned geometry, flipping axes whose direction is negative.
fn align_to_axes(
    mut array: Array3<f32>,
    affine: &[[f64; 4]; 3],
) -> Result<(Array3<f32>, [f64; 3], [f64; 3]), VolumeLoaderError> {
    let mut origin = [affine[0][3], affine[1][3], affine[2][3]];
    let mut spacing = [1.0; 3];
    let shape = array.shape().to_vec();

    for j in 0..3 {
        let column = [affine[0][j], affine[1][j], affine[2][j]];
        let norm = column.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm <= 0.0 || !norm.is_finite() {
            continue;
        }

        let oblique = (0..3).any(|i| i != j && column[i].abs() > AXIS_TOLERANCE * norm);
        if oblique {
            return Err(VolumeLoaderError::NotAxisAligned(format!(
                "voxel axis {} maps to direction {:?}",
                j, column
            )));
        }

        spacing[j] = norm;
        if column[j] < 0.0 {
            let last = shape[j].saturating_sub(1) as f64;
            for (i, o) in origin.iter_mut().enumerate() {
                *o += last * column[i];
            }
            array.invert_axis(Axis(j));
        }
    }

    Ok((array, origin, spacing))
}

fn data_type_of(header: &NiftiHeader) -> DataType {
    match header.data_type() {
        Ok(NiftiType::Uint8) => DataType::U8,
        Ok(NiftiType::Int16) => DataType::I16,
        Ok(NiftiType::Uint16) => DataType::U16,
        Ok(NiftiType::Int32) => DataType::I32,
        Ok(NiftiType::Float64) => DataType::F64,
        _ => DataType::F32,
    }
}

fn header_for(volume: &Volume) -> NiftiHeader {
    let [sx, sy, sz] = volume.spacing.map(|s| s as f32);
    let [ox, oy, oz] = volume.origin.map(|o| o as f32);

    NiftiHeader {
        pixdim: [1.0, sx, sy, sz, 0.0, 0.0, 0.0, 0.0],
        sform_code: 1,
        qform_code: 1,
        srow_x: [sx, 0.0, 0.0, ox],
        srow_y: [0.0, sy, 0.0, oy],
        srow_z: [0.0, 0.0, sz, oz],
        quatern_b: 0.0,
        quatern_c: 0.0,
        quatern_d: 0.0,
        quatern_x: ox,
        quatern_y: oy,
        quatern_z: oz,
        // millimetres
        xyzt_units: 2,
        ..NiftiHeader::default()
    }
}
