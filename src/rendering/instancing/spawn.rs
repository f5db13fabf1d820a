use std::f32::consts::TAU;

use glam::{Quat, UVec2, Vec3, Vec4};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const DEFAULT_SEED: u64 = 83729;

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// HSV to RGBA with alpha 1. Hue wraps at 1.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vec4 {
    let hue = hue.rem_euclid(1.0) * 6.0;
    let sector = hue.floor();
    let f = hue - sector;

    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match sector as u32 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    Vec4::new(r, g, b, 1.0)
}

/// Rainbow color for the `index`th of `max_count` instances.
pub fn compute_color(index: u32, max_count: u32, saturation: f32) -> Vec4 {
    let t = index as f32 / max_count.saturating_sub(1).max(1) as f32;
    hsv_to_rgb(t, saturation, 1.0)
}

/// Grid cell `index` of a `dim` grid spread over `scale.x` by `scale.z` around `origin`,
/// at the origin's height.
pub fn compute_position(index: u32, dim: UVec2, origin: Vec3, scale: Vec3) -> Vec3 {
    let columns = dim.x.max(1);
    let x = index % columns;
    let y = index / columns;

    let u = x as f32 / dim.x.saturating_sub(1).max(1) as f32;
    let v = y as f32 / dim.y.saturating_sub(1).max(1) as f32;

    let extent = Vec3::new(scale.x, 0.0, scale.z) / 2.0;
    let min = origin - extent;
    let max = origin + extent;

    Vec3::new(
        min.x + (max.x - min.x) * u,
        origin.y,
        min.z + (max.z - min.z) * v,
    )
}

/// Smallest square grid holding `count` cells.
pub fn square_grid(count: u32) -> UVec2 {
    let side = (count as f64).sqrt().ceil() as u32;
    UVec2::splat(side.max(1))
}

/// Uniformly distributed unit quaternion.
pub fn random_rotation(rng: &mut impl Rng) -> Quat {
    let u1: f32 = rng.gen();
    let u2: f32 = rng.gen::<f32>() * TAU;
    let u3: f32 = rng.gen::<f32>() * TAU;

    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();

    Quat::from_xyzw(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos()).normalize()
}

/// Uniformly distributed unit vector.
pub fn random_direction(rng: &mut impl Rng) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let phi: f32 = rng.gen::<f32>() * TAU;
    let r = (1.0 - z * z).max(0.0).sqrt();

    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Uniformly distributed point inside a ball.
pub fn random_in_ball(rng: &mut impl Rng, center: Vec3, radius: f32) -> Vec3 {
    let distance = rng.gen::<f32>().cbrt() * radius;
    center + random_direction(rng) * distance
}

pub fn random_color(rng: &mut impl Rng) -> Vec4 {
    Vec4::new(rng.gen(), rng.gen(), rng.gen(), 1.0)
}
