use glam::Vec4;
use rayon::prelude::*;

use crate::{
    error::Result,
    rendering::instancing::{
        batch_partitioner::SrpBatch, instance_buffer::InstanceBufferWriter,
        instance_group::DrawKeyGroup, layout::HEADER_FLOAT4_COUNT, packed_matrix::PackedMatrix,
    },
};

fn packed_as_float4s(matrices: &[PackedMatrix]) -> &[Vec4] {
    bytemuck::cast_slice(matrices)
}

/// Writes one batch region: zeroed header, object-to-world, world-to-object, colors.
fn write_batch(
    writer: &mut InstanceBufferWriter<'_>,
    batch: &SrpBatch,
    object_to_world: &[PackedMatrix],
    world_to_object: &[PackedMatrix],
    colors: &[Vec4],
) -> Result<()> {
    let range = batch.instance_range();

    writer.zero(batch.header_offset(), HEADER_FLOAT4_COUNT as usize)?;
    writer.write(
        batch.object_to_world_offset(),
        packed_as_float4s(&object_to_world[range.clone()]),
    )?;
    writer.write(
        batch.world_to_object_offset(),
        packed_as_float4s(&world_to_object[range.clone()]),
    )?;
    writer.write(batch.color_offset(), &colors[range])?;

    Ok(())
}

/// Copies a group's current instance arrays into its buffer. The buffer is held
/// for writing until every batch region is written.
pub fn upload_group(group: &mut DrawKeyGroup) -> Result<()> {
    let DrawKeyGroup {
        object_to_world,
        world_to_object,
        colors,
        batches,
        instance_buffer,
        ..
    } = group;

    let Some(buffer) = instance_buffer else {
        return Ok(());
    };

    let mut writer = buffer.lock_for_write();
    for batch in batches.iter() {
        write_batch(&mut writer, batch, object_to_world, world_to_object, colors)?;
    }

    Ok(())
}

pub fn upload_main_thread<'a>(groups: impl IntoIterator<Item = &'a mut DrawKeyGroup>) -> Result<()> {
    groups.into_iter().try_for_each(upload_group)
}

/// One upload task per draw key. Returns once every task has finished writing.
pub fn upload_parallel(groups: &mut [&mut DrawKeyGroup]) -> Result<()> {
    groups
        .par_iter_mut()
        .try_for_each(|group| upload_group(group))
}
