//! Rigid transformations between element frames.
//!
//! A [`Transform3`] maps a point expressed in an element's local frame into
//! its parent's frame: $\mathbf{p}_{\text{parent}} = \mathbf{R}\,\mathbf{p}_{\text{local}} + \mathbf{t}$.
//! Chains of transforms are composed once when an optical system is built
//! and cached, so the tracer only ever applies a single transform per
//! surface.
//!
//! Transforms whose rotation is exactly the identity carry
//! `use_rotation = false`; [`Transform3::apply_point`] and
//! [`Transform3::apply_vector`] then skip the matrix multiply entirely.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Three-component vector used for points, directions and normals.
pub type Vec3 = Vector3<f64>;

/// A rigid transformation: orthonormal rotation matrix + translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3 {
    /// 3x3 orthonormal rotation matrix.
    pub rotation: Matrix3<f64>,
    /// Translation vector (system length units).
    pub translation: Vec3,
    /// Whether `rotation` differs from the identity.
    pub use_rotation: bool,
}

impl Default for Transform3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform3 {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vec3::zeros(),
            use_rotation: false,
        }
    }

    /// Create a pure translation.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vec3::new(dx, dy, dz),
            use_rotation: false,
        }
    }

    /// Create a transform from an arbitrary rotation matrix and translation.
    ///
    /// The rotation flag is derived by exact comparison with the identity,
    /// so a matrix produced by zero tilt angles keeps the fast path.
    pub fn new(rotation: Matrix3<f64>, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
            use_rotation: rotation != Matrix3::identity(),
        }
    }

    /// Rotation about the local x, then y, then z axes (degrees), followed by
    /// a translation.
    ///
    /// This is the tilt convention used by prescriptions: `tilt[0]` tips the
    /// element about x (moving its axis in the y-z plane).
    pub fn from_tilt_degrees(tilt: [f64; 3], translation: Vec3) -> Self {
        if tilt.iter().all(|a| *a == 0.0) {
            return Self {
                rotation: Matrix3::identity(),
                translation,
                use_rotation: false,
            };
        }
        let rotation = Rotation3::from_euler_angles(
            tilt[0].to_radians(),
            tilt[1].to_radians(),
            tilt[2].to_radians(),
        );
        Self {
            rotation: *rotation.matrix(),
            translation,
            use_rotation: true,
        }
    }

    /// Map a point from the local frame into the parent frame.
    #[inline]
    pub fn apply_point(&self, point: &Vec3) -> Vec3 {
        self.apply_vector(point) + self.translation
    }

    /// Rotate a direction (or normal) from the local frame into the parent
    /// frame. Translations do not act on directions.
    #[inline]
    pub fn apply_vector(&self, vector: &Vec3) -> Vec3 {
        if self.use_rotation {
            self.rotation * vector
        } else {
            *vector
        }
    }

    /// Compose a parent transform with a child's local transform.
    ///
    /// The result maps the child's local frame directly into the frame the
    /// parent maps into: `t = R_p t_c + t_p`, `R = R_p R_c`.
    pub fn compose(&self, child: &Transform3) -> Transform3 {
        let use_rotation = self.use_rotation || child.use_rotation;
        let rotation = if use_rotation {
            self.rotation * child.rotation
        } else {
            Matrix3::identity()
        };
        Transform3 {
            rotation,
            translation: self.apply_vector(&child.translation) + self.translation,
            use_rotation,
        }
    }

    /// Compose two transforms: self followed by other.
    pub fn then(&self, other: &Transform3) -> Transform3 {
        other.compose(self)
    }

    /// Closed-form inverse of a rigid transform: transpose the rotation and
    /// rotate the negated translation.
    pub fn inverse(&self) -> Transform3 {
        if !self.use_rotation {
            return Transform3::translation(
                -self.translation.x,
                -self.translation.y,
                -self.translation.z,
            );
        }
        let rotation = self.rotation.transpose();
        Transform3 {
            rotation,
            translation: rotation * (-self.translation),
            use_rotation: true,
        }
    }

    /// Whether this transform equals the identity within `tolerance`
    /// (element-wise on both rotation and translation).
    pub fn is_identity(&self, tolerance: f64) -> bool {
        let rotation_ok = (self.rotation - Matrix3::identity())
            .iter()
            .all(|v| v.abs() <= tolerance);
        rotation_ok && self.translation.iter().all(|v| v.abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_transform() {
        let t = Transform3::default();
        let p = Vec3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert_abs_diff_eq!(result, p, epsilon = 1e-12);
        assert!(!t.use_rotation);
    }

    #[test]
    fn test_translate_then_rotate() {
        let shift = Transform3::translation(1.0, 0.0, 0.0);
        let quarter_turn = Transform3::from_tilt_degrees([0.0, 0.0, 90.0], Vec3::zeros());
        let t = shift.then(&quarter_turn);
        let result = t.apply_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(result, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_compose_matches_sequential_application() {
        let parent = Transform3::from_tilt_degrees([10.0, -5.0, 30.0], Vec3::new(0.5, -1.0, 12.0));
        let child = Transform3::from_tilt_degrees([0.0, 3.0, 0.0], Vec3::new(0.0, 2.0, 4.0));
        let composed = parent.compose(&child);
        let p = Vec3::new(0.3, -0.7, 1.1);
        let expected = parent.apply_point(&child.apply_point(&p));
        assert_abs_diff_eq!(composed.apply_point(&p), expected, epsilon = 1e-12);
        assert!(composed.use_rotation);
    }

    #[test]
    fn test_rotation_flag_is_or_of_chain() {
        let a = Transform3::translation(0.0, 0.0, 5.0);
        let b = Transform3::translation(1.0, 0.0, 0.0);
        assert!(!a.compose(&b).use_rotation);
        let c = Transform3::from_tilt_degrees([45.0, 0.0, 0.0], Vec3::zeros());
        assert!(a.compose(&c).use_rotation);
        assert!(c.compose(&a).use_rotation);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform3::from_tilt_degrees([20.0, 40.0, -15.0], Vec3::new(3.0, -2.0, 7.5));
        assert!(t.compose(&t.inverse()).is_identity(1e-12));
        assert!(t.inverse().compose(&t).is_identity(1e-12));

        let pure = Transform3::translation(1.0, 2.0, 3.0);
        assert!(pure.inverse().compose(&pure).is_identity(0.0));
    }
}
