use thiserror::Error;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },

    #[error("Region starting at {start:?} with size {size:?} exceeds volume size {bounds:?}")]
    OutOfBounds {
        start: [usize; 3],
        size: [usize; 3],
        bounds: [usize; 3],
    },

    #[error("Margin {margin} leaves no slices of a volume with {depth} slices")]
    MarginTooLarge { margin: usize, depth: usize },

    #[error("Spacing must be finite and positive, got {0:?}")]
    InvalidSpacing([f64; 3]),
}

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("At least two volumes are required for stitching, got {count}")]
    InsufficientInput { count: usize },

    #[error("Volume {index} is incompatible with the first volume: {reason}")]
    IncompatibleGeometry { index: usize, reason: String },

    #[error("Volume error: {0}")]
    Volume(#[from] VolumeError),
}
