use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Half-space `dot(normal, p) + distance >= 0`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Builds a plane from `(a, b, c, d)` coefficients and normalizes it so that
    /// `signed_distance_to_point` is a true euclidean distance.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.truncate();
        let length = normal.length();

        if length <= f32::EPSILON {
            return Self::new(normal, coefficients.w);
        }

        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    pub fn signed_distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}
