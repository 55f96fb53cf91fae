/// Spatial axis in (x, y, z) order. Volumes are always stitched along [`Axis::Z`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Nearest,
}

/// How voxels covered by more than one input are resolved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Keep the value of the earliest input covering the voxel.
    #[default]
    FirstContributor,
    /// Arithmetic mean of all inputs covering the voxel.
    Average,
}

/// How the stitched volume is probed for slices without coverage before cropping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TrimProbe {
    /// A slice is kept if any of its voxels is covered.
    #[default]
    AnySample,
    /// A slice is kept if the voxel at the in-plane center is covered.
    /// Assumes uniform in-plane coverage.
    CentralColumn,
}

/// Behaviour when only one input volume is given.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SingleInputPolicy {
    #[default]
    Reject,
    /// Return the margin-trimmed input as a float volume.
    PassThrough,
}

#[derive(Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

/// Sample type of a volume as stored on disk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    U8,
    I16,
    U16,
    I32,
    #[default]
    F32,
    F64,
}
