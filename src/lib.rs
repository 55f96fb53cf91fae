//! # Volume-stitch library
//!
//! This crate merges overlapping 3D volumes, e.g. the stations of a
//! whole-body MR or CT acquisition, into one continuous volume along the
//! slice (z) axis.
//!
//! Volumes can be loaded from DICOM series directories or NIfTI files and
//! the stitched result is written as a float NIfTI file. Inputs are assumed
//! to be already aligned in-plane: they must share the in-plane grid and may
//! only differ in their position and spacing along z. This is not a
//! registration algorithm.
//!
//! Stitching works as follows:
//!  - Drop `margin` slices from both ends of every input
//!  - Pad the first input along z so that it spans all inputs
//!  - Resample every further input onto that grid (trilinear by default)
//!    and accumulate it where it has coverage
//!  - Resolve overlaps either first-contributor-wins or by averaging
//!  - Crop slices without any coverage
//!
//! Coverage is tracked in an explicit mask next to the values, so no sample
//! value is reserved as a marker.
//!
//! # Roadmap
//!
//!  - Direction cosines (oblique acquisitions)
//!  - DICOM output
//!  - Intensity matching between stations
//!
//! # Examples
//!
//! ## Stitching two NIfTI volumes with averaging in the overlap
//!
//! ```no_run
//! # use volume_stitch::{OverlapPolicy, StitchOptions, VolumeLoader, VolumeStitcher, VolumeWriter};
//! let upper = VolumeLoader::load("upper.nii.gz").expect("should have loaded upper station");
//! let lower = VolumeLoader::load("lower.nii.gz").expect("should have loaded lower station");
//!
//! let stitcher = VolumeStitcher::new(
//!     StitchOptions::default()
//!         .with_margin(2)
//!         .with_overlap(OverlapPolicy::Average),
//! );
//! let stitched = stitcher
//!     .stitch(&[upper, lower])
//!     .expect("should have stitched the volumes");
//! VolumeWriter::save(&stitched, "whole_body.nii.gz").expect("should have saved result");
//! ```

pub mod enums;
pub mod error;
mod interpolator;
pub mod nifti_io;
pub mod ops;
pub mod preview;
pub mod resample;
pub mod stitcher;
pub mod volume;
pub mod volume_loader;
pub mod volume_writer;

pub use enums::{
    Axis, DataType, Interpolation, Orientation, OverlapPolicy, SingleInputPolicy, SortBy,
    TrimProbe,
};
pub use error::{StitchError, VolumeError};
pub use stitcher::{StitchOptions, VolumeStitcher};
pub use volume::{Grid, Volume};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
pub use volume_writer::{VolumeWriter, VolumeWriterError};
