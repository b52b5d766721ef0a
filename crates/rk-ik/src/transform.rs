//! Rigid transform (position and orientation)

use std::ops::Mul;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position + orientation in some reference frame.
///
/// Composition follows glam's affine convention: `a * b` applies `b` first,
/// so a child's world transform is `parent_world * child_local`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation,
        }
    }

    /// Build from xyz + roll/pitch/yaw in radians (intrinsic XYZ)
    pub fn from_xyz_rpy(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from(xyz),
            rotation: Quat::from_euler(glam::EulerRot::XYZ, rpy[0], rpy[1], rpy[2]),
        }
    }

    /// Get position as Vec3
    pub fn location(&self) -> Vec3 {
        self.translation
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    /// Express this transform relative to `parent` (both in the same frame)
    pub fn relative_to(&self, parent: &Transform) -> Self {
        parent.inverse() * *self
    }

    pub fn normalize_rotation(&mut self) {
        self.rotation = self.rotation.normalize();
    }

    pub fn normalized(mut self) -> Self {
        self.normalize_rotation();
        self
    }

    /// Whether the orientation quaternion is unit length within `tolerance`
    pub fn is_rotation_normalized(&self, tolerance: f32) -> bool {
        (self.rotation.length() - 1.0).abs() <= tolerance
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn abs_diff_eq(&self, other: &Transform, max_abs_diff: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            translation: self.rotation * rhs.translation + self.translation,
            rotation: self.rotation * rhs.rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn compose_applies_rhs_first() {
        let parent = Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2));
        let child = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0));

        let world = parent * child;
        assert_relative_eq!(world.translation.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(world.translation.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(world.translation.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn relative_to_inverts_composition() {
        let parent = Transform::new(Vec3::new(0.5, -2.0, 3.0), Quat::from_rotation_y(0.7));
        let local = Transform::new(Vec3::new(0.0, 1.0, 0.25), Quat::from_rotation_x(-0.3));

        let world = parent * local;
        let recovered = world.relative_to(&parent);
        assert!(recovered.abs_diff_eq(&local, 1e-5), "{recovered:?} != {local:?}");
    }

    #[test]
    fn inverse_round_trips_points() {
        let t = Transform::from_xyz_rpy([1.0, 2.0, 3.0], [0.1, 0.2, 0.3]);
        let p = Vec3::new(-4.0, 0.5, 9.0);
        let back = t.inverse().transform_point(t.transform_point(p));
        assert!(back.abs_diff_eq(p, 1e-4));
    }

    #[test]
    fn normalize_rotation_restores_unit_length() {
        let mut t = Transform::from_rotation(Quat::from_xyzw(0.0, 0.0, 0.5, 0.5));
        assert!(!t.is_rotation_normalized(1e-4));
        t.normalize_rotation();
        assert!(t.is_rotation_normalized(1e-5));
    }
}
