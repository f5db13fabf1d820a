use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::math::plane::Plane;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Frustum {
    // Planes are in the order: left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extracts inward facing planes from a view-projection matrix with a 0..1 depth range.
    pub fn from_view_projection(view_projection: Mat4) -> Frustum {
        let row0 = view_projection.row(0);
        let row1 = view_projection.row(1);
        let row2 = view_projection.row(2);
        let row3 = view_projection.row(3);

        let planes = [
            // Left
            Plane::from_coefficients(row3 + row0),
            // Right
            Plane::from_coefficients(row3 - row0),
            // Bottom
            Plane::from_coefficients(row3 + row1),
            // Top
            Plane::from_coefficients(row3 - row1),
            // Near
            Plane::from_coefficients(row2),
            // Far
            Plane::from_coefficients(row3 - row2),
        ];

        Frustum { planes }
    }

    /// Axis-aligned box volume, useful for orthographic or debug culling.
    pub fn from_box(min: Vec3, max: Vec3) -> Frustum {
        let (min, max) = (min.min(max), min.max(max));

        let planes = [
            Plane::from_point_normal(min, Vec3::X),
            Plane::from_point_normal(max, -Vec3::X),
            Plane::from_point_normal(min, Vec3::Y),
            Plane::from_point_normal(max, -Vec3::Y),
            Plane::from_point_normal(min, Vec3::Z),
            Plane::from_point_normal(max, -Vec3::Z),
        ];

        Frustum { planes }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.signed_distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_frustum_contains_target_but_not_eye_behind() {
        let view = Mat4::look_at_lh(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_lh(45f32.to_radians(), 1.0, 0.1, 100.0);
        let frustum = Frustum::from_view_projection(projection * view);

        assert!(frustum.contains_point(Vec3::ZERO));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -20.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, 200.0)));
        assert!(!frustum.contains_point(Vec3::new(50.0, 0.0, 0.0)));
    }

    #[test]
    fn box_frustum_bounds() {
        let frustum = Frustum::from_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(frustum.contains_point(Vec3::new(0.9, -0.9, 0.0)));
        assert!(!frustum.contains_point(Vec3::new(1.1, 0.0, 0.0)));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -1.5)));
    }
}
