pub mod arc_2d;
pub mod polygon_2d;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 4x4 transformation matrix.
pub type Matrix4 = nalgebra::Matrix4<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Greatest common divisor (Euclid).
#[must_use]
pub fn gcd(a: u32, b: u32) -> u32 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Transforms a point by a 4x4 matrix (homogeneous coordinates).
#[must_use]
pub fn transform_point(matrix: &Matrix4, point: &Point3) -> Point3 {
    let v = matrix * nalgebra::Vector4::new(point.x, point.y, point.z, 1.0);
    Point3::new(v.x, v.y, v.z)
}

/// Builds a 4x4 rotation about an axis through `origin` (Rodrigues).
///
/// The axis does not need to be normalized but must be non-zero; callers
/// check that.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn rotation_about(origin: &Point3, axis: &Vector3, angle: f64) -> Matrix4 {
    let axis = axis / axis.norm();
    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    #[rustfmt::skip]
    let rot = Matrix4::new(
        t * x * x + c,     t * x * y - s * z, t * x * z + s * y, 0.0,
        t * x * y + s * z, t * y * y + c,     t * y * z - s * x, 0.0,
        t * x * z - s * y, t * y * z + s * x, t * z * z + c,     0.0,
        0.0,               0.0,               0.0,               1.0,
    );
    let t_neg = Matrix4::new_translation(&(-origin.coords));
    let t_pos = Matrix4::new_translation(&origin.coords);
    t_pos * rot * t_neg
}

/// Builds the 4x4 reflection across the plane `a·x + b·y + c·z + d = 0`.
///
/// Returns `None` when `(a, b, c)` is the zero vector.
#[must_use]
pub fn reflection_across(plane: [f64; 4]) -> Option<Matrix4> {
    let [a, b, c, d] = plane;
    let n2 = a * a + b * b + c * c;
    if n2 < TOLERANCE {
        return None;
    }
    // p' = p - 2 (n·p + d) / |n|² n
    #[rustfmt::skip]
    let m = Matrix4::new(
        1.0 - 2.0 * a * a / n2, -2.0 * a * b / n2,       -2.0 * a * c / n2,       -2.0 * a * d / n2,
        -2.0 * b * a / n2,       1.0 - 2.0 * b * b / n2, -2.0 * b * c / n2,       -2.0 * b * d / n2,
        -2.0 * c * a / n2,       -2.0 * c * b / n2,       1.0 - 2.0 * c * c / n2, -2.0 * c * d / n2,
        0.0,                     0.0,                     0.0,                     1.0,
    );
    Some(m)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn gcd_basic() {
        assert_eq!(gcd(12, 4), 4);
        assert_eq!(gcd(9, 8), 1);
        assert_eq!(gcd(36, 8), 4);
        assert_eq!(gcd(7, 7), 7);
    }

    #[test]
    fn rotate_90_around_z() {
        let m = rotation_about(&Point3::origin(), &Vector3::z(), FRAC_PI_2);
        let p = transform_point(&m, &Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotate_about_offset_origin() {
        let m = rotation_about(&Point3::new(1.0, 0.0, 0.0), &Vector3::z(), FRAC_PI_2);
        let p = transform_point(&m, &Point3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn reflect_across_xz_plane() {
        let m = reflection_across([0.0, 1.0, 0.0, 0.0]).unwrap();
        let p = transform_point(&m, &Point3::new(0.3, 0.7, 0.1));
        assert_relative_eq!(p.x, 0.3);
        assert_relative_eq!(p.y, -0.7);
        assert_relative_eq!(p.z, 0.1);
    }

    #[test]
    fn reflect_across_offset_plane() {
        // x = 1
        let m = reflection_across([2.0, 0.0, 0.0, -2.0]).unwrap();
        let p = transform_point(&m, &Point3::new(3.0, 5.0, 0.0));
        assert_relative_eq!(p.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_plane_normal_rejected() {
        assert!(reflection_across([0.0, 0.0, 0.0, 1.0]).is_none());
    }
}
