use glam::Vec3;

use crate::math::plane::Plane;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Intersection {
    Out,
    Partial,
    In,
}

impl Intersection {
    pub fn is_visible(self) -> bool {
        self != Intersection::Out
    }
}

/// Axis-aligned bounding box in center/extents form.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Aabb {
    pub center: Vec3,
    pub extents: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, extents: Vec3) -> Self {
        Self { center, extents }
    }

    pub fn from_min_max(point1: Vec3, point2: Vec3) -> Self {
        let min = point1.min(point2);
        let max = point1.max(point2);
        Self {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    /// Transforms the box by an affine transform given as its four columns
    /// (three basis columns and the translation column).
    pub fn transform_affine(&self, columns: &[Vec3; 4]) -> Aabb {
        let [c0, c1, c2, c3] = *columns;

        let extents = (c0 * self.extents.x).abs()
            + (c1 * self.extents.y).abs()
            + (c2 * self.extents.z).abs();
        let center = c0 * self.center.x + c1 * self.center.y + c2 * self.center.z + c3;

        Aabb { center, extents }
    }

    pub fn intersect_planes(&self, planes: &[Plane]) -> Intersection {
        let mut inside = 0;

        for plane in planes {
            let distance = plane.normal.dot(self.center) + plane.distance;
            let radius = self.extents.dot(plane.normal.abs());

            if distance + radius <= 0.0 {
                return Intersection::Out;
            }

            if distance > radius {
                inside += 1;
            }
        }

        if inside == planes.len() {
            Intersection::In
        } else {
            Intersection::Partial
        }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        let min = self.min();
        let max = self.max();

        point.x >= min.x
            && point.x <= max.x
            && point.y >= min.y
            && point.y <= max.y
            && point.z >= min.z
            && point.z <= max.z
    }
}
