use crate::{nifti_io, volume::Volume};

use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum VolumeWriterError {
    #[error("Unsupported output format: {0}, expected .nii or .nii.gz")]
    UnsupportedFormat(String),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),
}

pub struct VolumeWriter;

impl VolumeWriter {
    /// Save a volume. Only NIfTI output is supported.
    pub fn save(volume: &Volume, path: impl AsRef<Path>) -> Result<(), VolumeWriterError> {
        let path = path.as_ref();
        if !nifti_io::is_nifti_path(path) {
            return Err(VolumeWriterError::UnsupportedFormat(
                path.display().to_string(),
            ));
        }

        nifti_io::write_nifti(volume, path)?;
        info!("Saved {} with size {:?}", path.display(), volume.size());
        Ok(())
    }
}
