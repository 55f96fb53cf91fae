use ndarray::Array3;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Nearest sample to the continuous index `(z, y, x)`, which must lie
    /// within the array bounds.
    #[inline]
    pub(crate) fn nearest(volume: &Array3<f32>, z: f64, y: f64, x: f64) -> f32 {
        let (depth, height, width) = volume.dim();
        let z = (z.round().max(0.0) as usize).min(depth - 1);
        let y = (y.round().max(0.0) as usize).min(height - 1);
        let x = (x.round().max(0.0) as usize).min(width - 1);
        volume[[z, y, x]]
    }

    /// Trilinear interpolation at the continuous index `(z, y, x)`, which must
    /// lie within the array bounds.
    #[inline]
    pub(crate) fn trilinear(volume: &Array3<f32>, z: f64, y: f64, x: f64) -> f32 {
        let (depth, height, width) = volume.dim();

        let z0 = (z.floor().max(0.0) as usize).min(depth - 1);
        let y0 = (y.floor().max(0.0) as usize).min(height - 1);
        let x0 = (x.floor().max(0.0) as usize).min(width - 1);
        let z1 = (z0 + 1).min(depth - 1);
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dz = (z - z0 as f64).clamp(0.0, 1.0) as f32;
        let dy = (y - y0 as f64).clamp(0.0, 1.0) as f32;
        let dx = (x - x0 as f64).clamp(0.0, 1.0) as f32;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;
        let one_minus_dz = 1.0 - dz;

        let lerp_x = |zi: usize, yi: usize| {
            let v0 = volume[[zi, yi, x0]];
            let v1 = volume[[zi, yi, x1]];
            v0.mul_add(one_minus_dx, v1 * dx)
        };

        let c0 = lerp_x(z0, y0).mul_add(one_minus_dy, lerp_x(z0, y1) * dy);
        let c1 = lerp_x(z1, y0).mul_add(one_minus_dy, lerp_x(z1, y1) * dy);

        c0.mul_add(one_minus_dz, c1 * dz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trilinear_is_exact_on_grid_points() {
        let volume = Array3::from_shape_fn((3, 3, 3), |(z, y, x)| (z * 9 + y * 3 + x) as f32);
        assert_eq!(Interpolator::trilinear(&volume, 2.0, 1.0, 0.0), 21.0);
        assert_eq!(Interpolator::trilinear(&volume, 2.0, 2.0, 2.0), 26.0);
    }

    #[test]
    fn trilinear_blends_between_slices() {
        let volume = Array3::from_shape_fn((2, 2, 2), |(z, _, _)| z as f32 * 10.0);
        let value = Interpolator::trilinear(&volume, 0.25, 0.5, 0.5);
        assert!((value - 2.5).abs() < 1e-6, "Expected 2.5, got {}", value);
    }

    #[test]
    fn nearest_rounds_to_closest_sample() {
        let volume = Array3::from_shape_fn((4, 1, 1), |(z, _, _)| z as f32);
        assert_eq!(Interpolator::nearest(&volume, 1.4, 0.0, 0.0), 1.0);
        assert_eq!(Interpolator::nearest(&volume, 2.6, 0.0, 0.0), 3.0);
    }
}
