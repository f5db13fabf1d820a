use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3, Vec3Swizzles};
use rayon::prelude::*;

use crate::rendering::instancing::{instance_group::DrawKeyGroup, packed_matrix::PackedMatrix};

/// Instances per rayon work item.
const UPDATE_CHUNK_SIZE: usize = 64;

/// Below this horizontal distance from the orbit origin an instance is treated as stationary.
pub const MIN_ORBIT_RADIUS: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Stays at its anchor.
    Static,
    /// Circles `origin` in the horizontal plane at `move_speed` units per second,
    /// at the origin's height.
    Orbit { origin: Vec3, move_speed: f32 },
    /// Bobs up and down around its anchor following `sin(move_speed * t)`.
    Bob { move_speed: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSettings {
    /// Spin about the up axis, in degrees per second.
    pub rotate_speed: f32,
    pub motion: Motion,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 0.0,
            motion: Motion::Static,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    pub delta: f32,
    /// Seconds since the scene started.
    pub elapsed: f32,
}

pub fn orbit_position(anchor: Vec3, origin: Vec3, move_speed: f32, elapsed: f32) -> Vec3 {
    let relative = (anchor - origin).xz();
    let radius = relative.length();

    if radius < MIN_ORBIT_RADIUS {
        return anchor;
    }

    let start_angle = relative.y.atan2(relative.x);
    let angular_speed = move_speed / radius;
    let angle = (start_angle + angular_speed * elapsed).rem_euclid(TAU);
    let (sin, cos) = angle.sin_cos();

    Vec3::new(origin.x + cos * radius, origin.y, origin.z + sin * radius)
}

pub fn bob_position(anchor: Vec3, move_speed: f32, elapsed: f32) -> Vec3 {
    anchor + Vec3::Y * (move_speed * elapsed).sin()
}

pub fn spin(rotation: Quat, rotate_speed: f32, delta: f32) -> Quat {
    (rotation * Quat::from_rotation_y((delta * rotate_speed).to_radians())).normalize()
}

impl MotionSettings {
    pub fn position(&self, anchor: Vec3, time: FrameTime) -> Vec3 {
        match self.motion {
            Motion::Static => anchor,
            Motion::Orbit { origin, move_speed } => {
                orbit_position(anchor, origin, move_speed, time.elapsed)
            }
            Motion::Bob { move_speed } => bob_position(anchor, move_speed, time.elapsed),
        }
    }
}

fn update_instance(
    settings: &MotionSettings,
    time: FrameTime,
    anchor: Vec3,
    rotation: &mut Quat,
    object_to_world: &mut PackedMatrix,
    world_to_object: &mut PackedMatrix,
) {
    *rotation = spin(*rotation, settings.rotate_speed, time.delta);

    let matrix = Mat4::from_rotation_translation(*rotation, settings.position(anchor, time));
    *object_to_world = PackedMatrix::pack(&matrix);
    *world_to_object = PackedMatrix::pack(&matrix.inverse());
}

/// Advances every instance of the group one frame and re-derives its packed matrices.
/// Instances are independent, so the work is split across the rayon pool.
pub fn update_group(group: &mut DrawKeyGroup, settings: &MotionSettings, time: FrameTime) {
    let DrawKeyGroup {
        anchors,
        rotations,
        object_to_world,
        world_to_object,
        ..
    } = group;

    (
        anchors.par_iter(),
        rotations.par_iter_mut(),
        object_to_world.par_iter_mut(),
        world_to_object.par_iter_mut(),
    )
        .into_par_iter()
        .with_min_len(UPDATE_CHUNK_SIZE)
        .for_each(|(anchor, rotation, object_to_world, world_to_object)| {
            update_instance(
                settings,
                time,
                *anchor,
                rotation,
                object_to_world,
                world_to_object,
            );
        });
}
