use cubestorm::{
    math::{bounds::Aabb, frustum::Frustum},
    rendering::instancing::{
        batch_partitioner::BatchPlan,
        layout::{count_for_instances, size_for_instances},
        PackedMatrix,
    },
};
use glam::{Mat4, Quat, Vec3};
use proptest::prelude::*;

proptest! {
    #[test]
    fn count_grows_with_instances(
        bytes_per_instance in 1u32..512,
        extra_bytes in 0u32..1024,
        instances in 0u32..100_000,
    ) {
        let fewer = count_for_instances(bytes_per_instance, instances, extra_bytes).unwrap();
        let more = count_for_instances(bytes_per_instance, instances + 1, extra_bytes).unwrap();
        prop_assert!(fewer <= more);
    }

    #[test]
    fn size_is_a_multiple_of_alignment(
        bytes_per_instance in 0u32..512,
        extra_bytes in 0u32..1024,
        instances in 0u32..10_000,
        alignment_log2 in 0u32..12,
    ) {
        let alignment = 1 << alignment_log2;
        let size = size_for_instances(bytes_per_instance, instances, alignment, extra_bytes).unwrap();
        prop_assert_eq!(size % alignment, 0);
        prop_assert!(size >= bytes_per_instance * instances + extra_bytes);
    }

    #[test]
    fn batches_cover_every_instance_once(count in 0u32..5_000, max_per_batch in 1u32..600) {
        let plan = BatchPlan::with_max_instances(count, max_per_batch).unwrap();

        prop_assert_eq!(plan.batch_count() as u32, count.div_ceil(max_per_batch));
        prop_assert_eq!(plan.slices.iter().map(|s| s.instance_count).sum::<u32>(), count);

        let mut next_instance = 0;
        let mut next_float4 = 0;
        for slice in &plan.slices {
            prop_assert_eq!(slice.instance_offset, next_instance);
            prop_assert!(slice.instance_count >= 1 && slice.instance_count <= max_per_batch);
            prop_assert!(slice.buffer_offset_in_float4 >= next_float4);
            next_instance += slice.instance_count;
            next_float4 = slice.buffer_offset_in_float4 + 4 + slice.instance_count * 7;
        }
        prop_assert!(next_float4 <= plan.buffer_size_in_float4);
    }

    #[test]
    fn boxes_inside_the_volume_are_kept(
        center in prop::array::uniform3(-5.0f32..5.0),
        extents in prop::array::uniform3(0.01f32..4.0),
    ) {
        let center = Vec3::from_array(center);
        let extents = Vec3::from_array(extents);
        let frustum = Frustum::from_box(center - extents - 1.0, center + extents + 1.0);

        let bounds = Aabb::new(center, extents);
        prop_assert!(bounds.intersect_planes(&frustum.planes).is_visible());
    }

    #[test]
    fn boxes_beyond_one_plane_are_rejected(
        center in prop::array::uniform3(-5.0f32..5.0),
        extents in prop::array::uniform3(0.01f32..4.0),
        gap in 0.01f32..20.0,
    ) {
        let center = Vec3::from_array(center);
        let extents = Vec3::from_array(extents);
        // The volume ends `gap` short of the box along -x.
        let max_x = center.x - extents.x - gap;
        let frustum = Frustum::from_box(
            Vec3::new(max_x - 30.0, -100.0, -100.0),
            Vec3::new(max_x, 100.0, 100.0),
        );

        let bounds = Aabb::new(center, extents);
        prop_assert!(!bounds.intersect_planes(&frustum.planes).is_visible());
    }

    #[test]
    fn rigid_transforms_survive_packing(
        axis in prop::array::uniform3(-1.0f32..1.0),
        angle in -6.3f32..6.3,
        translation in prop::array::uniform3(-1000.0f32..1000.0),
    ) {
        let axis = Vec3::from_array(axis);
        prop_assume!(axis.length() > 0.1);

        let matrix = Mat4::from_rotation_translation(
            Quat::from_axis_angle(axis.normalize(), angle),
            Vec3::from_array(translation),
        );
        prop_assert_eq!(PackedMatrix::pack(&matrix).unpack(), matrix);
    }
}
