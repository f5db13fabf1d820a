use glam::{Mat4, Vec3};

use crate::math::frustum::Frustum;

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        Self {
            eye,
            target,
            up: Vec3::Y,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn get_vp_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let view = Mat4::look_at_lh(self.eye, self.target, self.up);
        let projection = Mat4::perspective_lh(
            self.fov_y_degrees.to_radians(),
            aspect_ratio,
            self.near,
            self.far,
        );
        projection * view
    }

    pub fn frustum(&self, aspect_ratio: f32) -> Frustum {
        Frustum::from_view_projection(self.get_vp_matrix(aspect_ratio))
    }
}
