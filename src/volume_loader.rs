use crate::{
    enums::{DataType, SortBy},
    nifti_io,
    volume::Volume,
};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, s};
use std::{fs, path::Path};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("Missing image position")]
    MissingPosition,

    #[error("Unsupported volume format: {0}")]
    UnsupportedFormat(String),

    #[error("Only axis-aligned volumes are supported: {0}")]
    NotAxisAligned(String),

    #[error("Expected a 3D volume, found {0} dimensions")]
    NotThreeDimensional(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),
}

struct DecodedSlice {
    order: Option<f32>,
    position: Option<[f64; 3]>,
    pixels: Array2<f32>,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load a volume from a DICOM series directory or a `.nii` / `.nii.gz` file
    pub fn load(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        let path = path.as_ref();
        let volume = if path.is_dir() {
            Self::load_from_directory(path, SortBy::default())?
        } else if nifti_io::is_nifti_path(path) {
            nifti_io::read_nifti(path)?
        } else {
            return Err(VolumeLoaderError::UnsupportedFormat(
                path.display().to_string(),
            ));
        };

        info!(
            "Loaded {} with size {:?}, spacing {:?}, origin {:?}",
            path.display(),
            volume.size(),
            volume.spacing,
            volume.origin
        );
        Ok(volume)
    }

    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found, dimensions are inconsistent or
    /// the geometry of the series cannot be determined
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut slices: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_slice(dicom_object, &sort_by))
            .collect();

        if slices.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::sort_slices(&mut slices, &sort_by);
        Self::validate_dimensions(&slices)?;

        let origin = slices[0]
            .position
            .ok_or(VolumeLoaderError::MissingPosition)?;
        let (pixel_spacing, slice_thickness) =
            Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;
        let z_spacing = Self::slice_distance(&slices).unwrap_or(slice_thickness);
        // PixelSpacing is (row spacing, column spacing), i.e. (y, x)
        let spacing = [pixel_spacing.1, pixel_spacing.0, z_spacing];
        let data_type = Self::get_data_type(dicom_objects);
        debug!("DICOM series of {} slices, {:?}", slices.len(), data_type);

        let volume_array = Self::build_volume_array(&slices);
        Ok(Volume::new(volume_array, origin, spacing).with_data_type(data_type))
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn extract_slice(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<DecodedSlice> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let pixels = Self::decode_image(dicom_object)?;
        Some(DecodedSlice {
            order,
            position: Self::get_position(dicom_object),
            pixels,
        })
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<[f64; 3]> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match pos[..] {
            [x, y, z] => Some([x, y, z]),
            _ => None,
        }
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = Self::get_position(dicom_object)?;
                Some(Some(pos[2] as f32))
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<f32>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::Default);
        pixel_data
            .to_ndarray_with_options::<f32>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    /// Ascending order along the slice axis, so that increasing array index
    /// means increasing physical z.
    fn sort_slices(slices: &mut [DecodedSlice], sort_by: &SortBy) {
        if !matches!(sort_by, SortBy::None) {
            slices.sort_by(|a, b| {
                a.order
                    .partial_cmp(&b.order)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    fn validate_dimensions(slices: &[DecodedSlice]) -> Result<(), VolumeLoaderError> {
        let first_dim = slices[0].pixels.dim();
        if slices.iter().any(|slice| slice.pixels.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(slices: &[DecodedSlice]) -> Array3<f32> {
        let (height, width) = slices[0].pixels.dim();
        let depth = slices.len();
        let mut volume = Array3::<f32>::zeros((depth, height, width));

        for (i, slice) in slices.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(&slice.pixels);
        }

        volume
    }

    /// Mean distance between consecutive slice positions along z.
    fn slice_distance(slices: &[DecodedSlice]) -> Option<f64> {
        let positions: Vec<f64> = slices
            .iter()
            .map(|slice| slice.position.map(|p| p[2]))
            .collect::<Option<_>>()?;
        if positions.len() < 2 {
            return None;
        }
        let total: f64 = positions.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        let mean = total / (positions.len() - 1) as f64;
        (mean > 0.0).then_some(mean)
    }

    fn get_spacing(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
    ) -> Option<((f64, f64), f64)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float64()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float64()
                .ok()?;

            Some((
                (*pixel_spacing.first()?, *pixel_spacing.get(1)?),
                slice_thickness,
            ))
        })
    }

    fn get_data_type(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> DataType {
        dicom_objects
            .iter()
            .find_map(|dicom_object| {
                let bits = dicom_object
                    .element(tags::BITS_ALLOCATED)
                    .ok()?
                    .to_int::<u16>()
                    .ok()?;
                let signed = dicom_object
                    .element(tags::PIXEL_REPRESENTATION)
                    .ok()?
                    .to_int::<u16>()
                    .ok()?
                    == 1;
                Some(match (bits, signed) {
                    (8, _) => DataType::U8,
                    (16, true) => DataType::I16,
                    (16, false) => DataType::U16,
                    (32, _) => DataType::I32,
                    _ => DataType::F32,
                })
            })
            .unwrap_or_default()
    }
}
