use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

/// Lit shaders read `unity_ObjectToWorld` and `unity_WorldToObject` as 48 bytes:
/// the xyz of each of the four columns, back to back, with the constant
/// `(0, 0, 0, 1)` bottom row dropped.
///
/// Stored as three float4 so a packed matrix array can be copied straight into
/// a float4 addressed instance buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Default, Pod, Zeroable)]
pub struct PackedMatrix {
    pub packed: [Vec4; 3],
}

impl PackedMatrix {
    pub const IDENTITY: PackedMatrix = PackedMatrix {
        packed: [
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
        ],
    };

    pub fn pack(matrix: &Mat4) -> Self {
        let c0 = matrix.x_axis;
        let c1 = matrix.y_axis;
        let c2 = matrix.z_axis;
        let c3 = matrix.w_axis;

        Self {
            packed: [
                Vec4::new(c0.x, c0.y, c0.z, c1.x),
                Vec4::new(c1.y, c1.z, c2.x, c2.y),
                Vec4::new(c2.z, c3.x, c3.y, c3.z),
            ],
        }
    }

    /// The three basis columns followed by the translation column.
    pub fn columns(&self) -> [Vec3; 4] {
        let [p1, p2, p3] = self.packed;

        [
            p1.xyz(),
            Vec3::new(p1.w, p2.x, p2.y),
            Vec3::new(p2.z, p2.w, p3.x),
            p3.yzw(),
        ]
    }

    pub fn unpack(&self) -> Mat4 {
        let [c0, c1, c2, c3] = self.columns();
        Mat4::from_cols(c0.extend(0.0), c1.extend(0.0), c2.extend(0.0), c3.extend(1.0))
    }

    pub fn as_floats(&self) -> &[f32; 12] {
        bytemuck::cast_ref(self)
    }
}

impl From<Mat4> for PackedMatrix {
    fn from(matrix: Mat4) -> Self {
        Self::pack(&matrix)
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;

    #[test]
    fn identity_constant_matches_pack() {
        assert_eq!(PackedMatrix::pack(&Mat4::IDENTITY), PackedMatrix::IDENTITY);
    }

    #[test]
    fn float_order_is_column_xyz() {
        let matrix = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 0.0, //
            4.0, 5.0, 6.0, 0.0, //
            7.0, 8.0, 9.0, 0.0, //
            10.0, 11.0, 12.0, 1.0,
        ]);

        let packed = PackedMatrix::pack(&matrix);
        let expected: [f32; 12] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        assert_eq!(packed.as_floats(), &expected);
        assert_eq!(std::mem::size_of::<PackedMatrix>(), 48);
    }

    #[test]
    fn rigid_transform_round_trips_exactly() {
        let matrix = Mat4::from_rotation_translation(
            Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-1.2),
            Vec3::new(3.0, -2.0, 40.0),
        );

        assert_eq!(PackedMatrix::pack(&matrix).unpack(), matrix);
    }

    #[test]
    fn columns_expose_translation() {
        let packed = PackedMatrix::from(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));
        let [c0, c1, c2, c3] = packed.columns();

        assert_eq!(c0, Vec3::X);
        assert_eq!(c1, Vec3::Y);
        assert_eq!(c2, Vec3::Z);
        assert_eq!(c3, Vec3::new(1.0, 2.0, 3.0));
    }
}
