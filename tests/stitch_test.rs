use ndarray::Array3;
use volume_stitch::{
    Axis, DataType, OverlapPolicy, SingleInputPolicy, StitchError, StitchOptions, TrimProbe,
    Volume, VolumeError, VolumeStitcher,
};

const TOLERANCE: f32 = 1e-5;

/// A 10x10 in-plane volume whose samples encode their own indices.
fn station(depth: usize, origin_z: f64, offset: f32) -> Volume {
    let data = Array3::from_shape_fn((depth, 10, 10), |(z, y, x)| {
        offset + z as f32 * 10.0 + y as f32 * 0.5 + x as f32 * 0.25
    });
    Volume::new(data, [0.0, 0.0, origin_z], [1.0, 1.0, 1.0])
}

fn stitch(volumes: &[Volume], overlap: OverlapPolicy) -> Volume {
    VolumeStitcher::new(StitchOptions::default().with_overlap(overlap))
        .stitch(volumes)
        .expect("should have stitched volumes")
}

fn assert_close(actual: f32, expected: f32, what: &str) {
    assert!(
        (actual - expected).abs() <= TOLERANCE * expected.abs().max(1.0),
        "{}: expected {}, got {}",
        what,
        expected,
        actual
    );
}

#[test]
fn test_overlap_scenario_in_both_modes() {
    // A covers z in [0, 6), B covers z in [4, 10)
    let a = station(6, 0.0, 100.0);
    let b = station(6, 4.0, 500.0);

    for overlap in [OverlapPolicy::Average, OverlapPolicy::FirstContributor] {
        let out = stitch(&[a.clone(), b.clone()], overlap);
        assert_eq!(out.size(), [10, 10, 10]);
        assert!((out.origin[2] - 0.0).abs() < 1e-9, "origin {:?}", out.origin);
        assert_eq!(out.data_type, DataType::F32);

        for z in 0..10 {
            for (y, x) in [(0, 0), (3, 7), (9, 9)] {
                let value = out.data[[z, y, x]];
                let what = format!("{:?} at z={} y={} x={}", overlap, z, y, x);
                match z {
                    0..4 => assert_close(value, a.data[[z, y, x]], &what),
                    4..6 => {
                        let from_a = a.data[[z, y, x]];
                        let from_b = b.data[[z - 4, y, x]];
                        let expected = match overlap {
                            OverlapPolicy::Average => (from_a + from_b) / 2.0,
                            OverlapPolicy::FirstContributor => from_a,
                        };
                        assert_close(value, expected, &what);
                    }
                    _ => assert_close(value, b.data[[z - 4, y, x]], &what),
                }
            }
        }
    }
}

#[test]
fn test_first_contributor_follows_input_order() {
    let a = station(6, 0.0, 100.0);
    let b = station(6, 4.0, 500.0);

    let out = stitch(&[b.clone(), a.clone()], OverlapPolicy::FirstContributor);
    assert_eq!(out.size(), [10, 10, 10]);
    for z in 4..6 {
        assert_close(out.data[[z, 2, 2]], b.data[[z - 4, 2, 2]], "overlap taken from b");
    }
    assert_close(out.data[[0, 2, 2]], a.data[[0, 2, 2]], "lower part from a");
}

#[test]
fn test_average_of_three_contributors() {
    let volumes: Vec<Volume> = [1.0, 4.0, 10.0]
        .iter()
        .map(|&v| Volume::new(Array3::from_elem((4, 10, 10), v), [0.0; 3], [1.0; 3]))
        .collect();
    let out = stitch(&volumes, OverlapPolicy::Average);
    assert_eq!(out.size(), [10, 10, 4]);
    assert!(out.data.iter().all(|&v| (v - 5.0).abs() < TOLERANCE));
}

#[test]
fn test_gap_between_volumes_resolves_to_zero() {
    // A covers [0, 3), B covers [5, 8); slices 3 and 4 have no contributor
    let a = station(3, 0.0, 100.0);
    let b = station(3, 5.0, 500.0);

    for overlap in [OverlapPolicy::Average, OverlapPolicy::FirstContributor] {
        let out = stitch(&[a.clone(), b.clone()], overlap);
        assert_eq!(out.size(), [10, 10, 8]);
        for z in 3..5 {
            assert!(
                out.data.index_axis(ndarray::Axis(0), z).iter().all(|&v| v == 0.0),
                "slice {} should be zero",
                z
            );
        }
        assert!(out.data.iter().all(|v| v.is_finite()));
        assert_close(out.data[[5, 1, 1]], b.data[[0, 1, 1]], "first slice of b");
    }
}

#[test]
fn test_extent_matches_union_of_inputs() {
    let a = station(7, 12.0, 0.0);
    let b = station(5, 3.0, 0.0);
    let c = station(4, 17.0, 0.0);

    let out = stitch(&[a, b, c], OverlapPolicy::Average);
    let spacing = out.spacing[2];
    assert!((out.origin[2] - 3.0).abs() <= spacing, "origin {}", out.origin[2]);
    assert!(
        (out.extent(Axis::Z) - 21.0).abs() <= spacing,
        "extent {}",
        out.extent(Axis::Z)
    );
}

#[test]
fn test_stitching_same_volume_twice_is_idempotent() {
    let a = station(6, 2.0, 42.0);
    for overlap in [OverlapPolicy::Average, OverlapPolicy::FirstContributor] {
        let out = stitch(&[a.clone(), a.clone()], overlap);
        assert_eq!(out.size(), a.size());
        assert!((out.origin[2] - a.origin[2]).abs() < 1e-9);
        for (got, expected) in out.data.iter().zip(a.data.iter()) {
            assert_close(*got, *expected, "idempotent stitch");
        }
    }
}

#[test]
fn test_margin_is_removed_before_alignment() {
    let a = station(8, 0.0, 100.0);
    let b = station(8, 5.0, 500.0);

    let out = VolumeStitcher::new(StitchOptions::default().with_margin(2))
        .stitch(&[a.clone(), b])
        .expect("should have stitched volumes");

    // First surviving slice of a is its third one, at z = 2
    assert!((out.origin[2] - 2.0).abs() < 1e-9, "origin {:?}", out.origin);
    assert_close(out.data[[0, 4, 4]], a.data[[2, 4, 4]], "first surviving slice");
    // Trimmed: a covers [2, 6), b covers [7, 11)
    assert_eq!(out.size()[2], 9);
    assert_close(out.data[[4, 0, 0]], 0.0, "gap left by the margins");
}

#[test]
fn test_finer_second_volume_is_resampled() {
    let a = station(4, 0.0, 0.0);
    let data = Array3::from_shape_fn((8, 10, 10), |(z, _, _)| z as f32);
    let b = Volume::new(data, [0.0, 0.0, 4.0], [1.0, 1.0, 0.5]);

    let out = stitch(&[a, b], OverlapPolicy::FirstContributor);
    // b spans [4, 8) with samples at 4.0, 4.5, ..., 7.5
    assert_eq!(out.size()[2], 8);
    assert_close(out.data[[4, 5, 5]], 0.0, "b at z=4");
    assert_close(out.data[[6, 5, 5]], 4.0, "b at z=6");
    assert_close(out.data[[7, 5, 5]], 6.0, "b at z=7");
}

#[test]
fn test_central_probe_trims_like_any_sample_for_full_slices() {
    let a = station(6, 0.0, 100.0);
    let b = station(6, 4.0, 500.0);
    let any = stitch(&[a.clone(), b.clone()], OverlapPolicy::Average);
    let central = VolumeStitcher::new(
        StitchOptions::default()
            .with_overlap(OverlapPolicy::Average)
            .with_trim_probe(TrimProbe::CentralColumn),
    )
    .stitch(&[a, b])
    .expect("should have stitched volumes");
    assert_eq!(any.size(), central.size());
    assert_eq!(any.data, central.data);
}

#[test]
fn test_sentinel_valued_samples_are_kept() {
    let mut a = station(4, 0.0, 0.0);
    a.data[[1, 1, 1]] = volume_stitch::resample::SENTINEL;
    let b = station(4, 4.0, 0.0);
    let out = stitch(&[a, b], OverlapPolicy::Average);
    assert_eq!(out.data[[1, 1, 1]], volume_stitch::resample::SENTINEL);
}

#[test]
fn test_insufficient_input() {
    let stitcher = VolumeStitcher::default();
    assert!(matches!(
        stitcher.stitch(&[]),
        Err(StitchError::InsufficientInput { count: 0 })
    ));
    assert!(matches!(
        stitcher.stitch(&[station(4, 0.0, 0.0)]),
        Err(StitchError::InsufficientInput { count: 1 })
    ));
}

#[test]
fn test_single_input_pass_through() {
    let a = station(6, 0.0, 1.0);
    let out = VolumeStitcher::new(
        StitchOptions::default()
            .with_margin(1)
            .with_single_input(SingleInputPolicy::PassThrough),
    )
    .stitch(std::slice::from_ref(&a))
    .expect("should have passed single volume through");
    assert_eq!(out.size(), [10, 10, 4]);
    assert_eq!(out.data[[0, 3, 3]], a.data[[1, 3, 3]]);
    assert_eq!(out.data_type, DataType::F32);
}

#[test]
fn test_incompatible_in_plane_geometry() {
    let a = station(4, 0.0, 0.0);

    let narrow = Volume::new(Array3::zeros((4, 10, 9)), [0.0, 0.0, 4.0], [1.0; 3]);
    assert!(matches!(
        VolumeStitcher::default().stitch(&[a.clone(), narrow]),
        Err(StitchError::IncompatibleGeometry { index: 1, .. })
    ));

    let coarse = Volume::new(Array3::zeros((4, 10, 10)), [0.0, 0.0, 4.0], [1.2, 1.0, 1.0]);
    assert!(matches!(
        VolumeStitcher::default().stitch(&[a.clone(), a.clone(), coarse]),
        Err(StitchError::IncompatibleGeometry { index: 2, .. })
    ));

    let shifted = Volume::new(Array3::zeros((4, 10, 10)), [0.0, 3.0, 4.0], [1.0; 3]);
    assert!(matches!(
        VolumeStitcher::default().stitch(&[a, shifted]),
        Err(StitchError::IncompatibleGeometry { index: 1, .. })
    ));
}

#[test]
fn test_margin_larger_than_volume() {
    let result = VolumeStitcher::new(StitchOptions::default().with_margin(2))
        .stitch(&[station(4, 0.0, 0.0), station(10, 4.0, 0.0)]);
    assert!(matches!(
        result,
        Err(StitchError::Volume(VolumeError::MarginTooLarge { margin: 2, depth: 4 }))
    ));
}

#[test]
fn test_overflowing_margin_is_reported() {
    let result = VolumeStitcher::new(StitchOptions::default().with_margin(usize::MAX))
        .stitch(&[station(4, 0.0, 0.0), station(4, 4.0, 0.0)]);
    assert!(matches!(
        result,
        Err(StitchError::Volume(VolumeError::MarginTooLarge { margin: usize::MAX, .. }))
    ));
}
