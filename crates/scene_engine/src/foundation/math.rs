//! Math utilities and types
//!
//! Provides the fundamental math types used throughout the scene core.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
///
/// Composition order is fixed: a point is scaled, then rotated, then
/// translated. This keeps parent-to-child transform propagation in the
/// scene graph consistent with [`Transform::to_matrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform with only scale
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Compose this (parent) transform with a child transform
    ///
    /// The result maps the child's local space into the space this
    /// transform is expressed in. Equivalent to multiplying the two TRS
    /// matrices, but stays in decomposed form so the scene graph can cache
    /// world transforms without re-extracting position/rotation/scale.
    pub fn combine(&self, child: &Self) -> Self {
        Self {
            position: self.position + self.rotation * self.scale.component_mul(&child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale.component_mul(&child.scale),
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * self.scale.component_mul(&point)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_combine_matches_matrix_product() {
        let parent = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), 0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let child = Transform {
            position: Vec3::new(-0.5, 0.0, 1.0),
            rotation: Quat::from_axis_angle(&Vec3::x_axis(), -0.3),
            scale: Vec3::new(1.0, 0.5, 1.0),
        };

        let combined = parent.combine(&child).to_matrix();
        let expected = parent.to_matrix() * child.to_matrix();
        assert_relative_eq!(combined, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_combine_with_identity_is_noop() {
        let t = Transform::from_position(Vec3::new(0.3, 0.0, 0.0));
        assert_eq!(Transform::identity().combine(&t), t);
        assert_eq!(t.combine(&Transform::identity()), t);
    }

    #[test]
    fn test_transform_point_scales_before_translating() {
        let t = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::identity(),
            scale: Vec3::new(2.0, 1.0, 1.0),
        };
        let p = t.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vec3::new(3.0, 0.0, 0.0));
    }
}
