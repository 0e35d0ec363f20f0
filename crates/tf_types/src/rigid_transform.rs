use glam::{DMat4, DQuat, DVec3};

/// A rigid-body transform: a rotation followed by a translation.
///
/// The rotation is kept a unit quaternion at all times (composition
/// re-normalizes, deserialization does not validate). `q` and `-q` describe
/// the same rotation and compare equal under [`Self::abs_diff_eq`].
///
/// Composition uses the matrix convention: `a * b` is the transform that
/// applies `b` first and then `a`, so a frame's world transform is
/// `world_from_parent * parent_from_frame`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RigidTransform {
    /// Translation, applied after the rotation.
    pub translation: DVec3,

    /// Unit quaternion `(x, y, z, w)`.
    pub rotation: DQuat,
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    #[inline]
    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    #[inline]
    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation,
        }
    }

    /// The inverse transform, such that `t * t.inverse()` is the identity
    /// (up to floating point error).
    #[inline]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    /// Rotates `point`, then translates it.
    #[inline]
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// Column-major 4×4 matrix form, as consumed by renderers.
    #[inline]
    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Decomposes a 4×4 matrix back into a rigid transform.
    ///
    /// The rotation is extracted from the upper-left 3×3 and re-normalized;
    /// any scale or shear in the matrix is discarded.
    #[inline]
    pub fn from_mat4(mat: &DMat4) -> Self {
        let (_scale, rotation, translation) = mat.to_scale_rotation_translation();
        Self {
            translation,
            rotation: rotation.normalize(),
        }
    }

    /// Interpolates between `self` (at `t == 0.0`) and `other` (at `t == 1.0`):
    /// component-wise LERP of the translation, shortest-arc SLERP of the
    /// rotation.
    pub fn lerp_slerp(&self, other: &Self, t: f64) -> Self {
        // Negate one operand when the quaternions point into opposite
        // half-spheres, otherwise 180° rotations take the long way round.
        let other_rotation = if self.rotation.dot(other.rotation) < 0.0 {
            -other.rotation
        } else {
            other.rotation
        };

        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other_rotation, t),
        }
    }

    /// Compares two transforms within `epsilon`.
    ///
    /// Rotations are compared as `|q₁ · q₂| ≈ 1`, making `q` and `-q` equal.
    #[inline]
    pub fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.translation.abs_diff_eq(other.translation, epsilon)
            && (self.rotation.dot(other.rotation).abs() - 1.0).abs() <= epsilon
    }
}

impl Default for RigidTransform {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for RigidTransform {
    type Output = Self;

    /// `a * b` applies `b` first, then `a`.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            translation: self.translation + self.rotation * rhs.translation,
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{DQuat, DVec3, dvec3};

    use super::RigidTransform;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_compose_then_invert_is_identity() {
        let transform = RigidTransform::new(
            dvec3(1.0, -2.0, 3.5),
            DQuat::from_axis_angle(dvec3(0.0, 1.0, 0.0), 1.2),
        );

        let roundtrip = transform * transform.inverse();
        assert!(roundtrip.abs_diff_eq(&RigidTransform::IDENTITY, EPSILON));

        let roundtrip = transform.inverse() * transform;
        assert!(roundtrip.abs_diff_eq(&RigidTransform::IDENTITY, EPSILON));
    }

    #[test]
    fn test_transform_point_rotates_then_translates() {
        let quarter_turn_z = DQuat::from_axis_angle(DVec3::Z, std::f64::consts::FRAC_PI_2);
        let transform = RigidTransform::new(dvec3(10.0, 0.0, 0.0), quarter_turn_z);

        // (1, 0, 0) rotates onto (0, 1, 0) and then translates to (10, 1, 0).
        let point = transform.transform_point(dvec3(1.0, 0.0, 0.0));
        assert!(point.abs_diff_eq(dvec3(10.0, 1.0, 0.0), 1e-9));
    }

    #[test]
    fn test_mat4_roundtrip() {
        let transform = RigidTransform::new(
            dvec3(0.5, 1.5, -4.0),
            DQuat::from_euler(glam::EulerRot::XYZ, 0.4, -0.8, 2.2),
        );

        let decomposed = RigidTransform::from_mat4(&transform.to_mat4());
        assert!(decomposed.abs_diff_eq(&transform, 1e-9));
    }

    #[test]
    fn test_slerp_takes_shortest_arc() {
        let start = RigidTransform::from_rotation(DQuat::IDENTITY);
        // Same rotation as a small positive turn about Z, but with the
        // quaternion flipped into the opposite half-sphere.
        let end = RigidTransform::from_rotation(-DQuat::from_axis_angle(DVec3::Z, 0.2));

        let halfway = start.lerp_slerp(&end, 0.5);
        let expected = RigidTransform::from_rotation(DQuat::from_axis_angle(DVec3::Z, 0.1));
        assert!(halfway.abs_diff_eq(&expected, 1e-9));
    }

    #[test]
    fn test_serde_wire_shape() {
        let json = serde_json::to_string(&RigidTransform::from_translation(dvec3(1.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(
            json,
            r#"{"translation":[1.0,0.0,0.0],"rotation":[0.0,0.0,0.0,1.0]}"#
        );
    }
}
