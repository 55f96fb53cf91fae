use crate::enums::Orientation;
use crate::volume::Volume;

use image::ImageBuffer;
use image::Luma;
use ndarray::ArrayView2;
use rayon::prelude::*;
use std::path::Path;

pub type PreviewImage = ImageBuffer<Luma<u8>, Vec<u8>>;

#[inline]
fn normalize_to_u8(value: f32, min: f32, range: f32) -> u8 {
    (((value - min) / range) * 255.0).clamp(0.0, 255.0) as u8
}

/// Render a slice as an 8-bit image, scaled between its own minimum and
/// maximum. Rows run from the highest z down for coronal and sagittal slices.
pub fn slice_to_image(slice: &ArrayView2<'_, f32>, flip_rows: bool) -> Option<PreviewImage> {
    let (height, width) = slice.dim();
    let (min, max) = slice
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = if max > min { max - min } else { 1.0 };

    let rows: Vec<_> = if flip_rows {
        (0..height).rev().collect()
    } else {
        (0..height).collect()
    };
    let pixel_data: Vec<u8> = rows
        .into_par_iter()
        .flat_map_iter(|row| {
            (0..width).map(move |col| normalize_to_u8(slice[[row, col]], min, range))
        })
        .collect();
    ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
}

/// The slice through the middle of `volume` in the given orientation.
pub fn central_slice_image(volume: &Volume, orientation: Orientation) -> Option<PreviewImage> {
    let (depth, height, width) = volume.dim();
    let index = match orientation {
        Orientation::Axial => depth / 2,
        Orientation::Coronal => height / 2,
        Orientation::Sagittal => width / 2,
    };
    let slice = volume.get_slice_from_axis(index, &orientation)?;
    slice_to_image(&slice, !matches!(orientation, Orientation::Axial))
}

/// Save the central coronal slice of `volume` as a PNG.
pub fn save_preview(volume: &Volume, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
    match central_slice_image(volume, Orientation::Coronal) {
        Some(image) => image.save(path),
        None => Err(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn coronal_preview_puts_top_slice_first() {
        let data = Array3::from_shape_fn((3, 4, 2), |(z, _, _)| z as f32);
        let volume = Volume::new(data, [0.0; 3], [1.0; 3]);
        let image = central_slice_image(&volume, Orientation::Coronal).unwrap();
        assert_eq!(image.dimensions(), (2, 3));
        assert_eq!(image.get_pixel(0, 0).0[0], 255);
        assert_eq!(image.get_pixel(1, 2).0[0], 0);
    }

    #[test]
    fn flat_slice_maps_to_black() {
        let data = Array3::from_elem((2, 2, 2), 7.0);
        let volume = Volume::new(data, [0.0; 3], [1.0; 3]);
        let image = central_slice_image(&volume, Orientation::Axial).unwrap();
        assert!(image.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn preview_is_written_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let data = Array3::from_shape_fn((4, 4, 4), |(z, y, x)| (z + y + x) as f32);
        save_preview(&Volume::new(data, [0.0; 3], [1.0; 3]), &path).unwrap();
        assert!(path.exists());
    }
}
