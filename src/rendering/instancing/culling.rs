use std::sync::mpsc;

use itertools::izip;
use rayon::prelude::*;

use crate::{
    error::{InstancingError, Result},
    math::{bounds::Aabb, plane::Plane},
    rendering::instancing::{
        batch_partitioner::SrpBatch,
        draw_commands::{DrawCommand, FrameDrawCommands},
        instance_group::DrawKeyGroup,
        packed_matrix::PackedMatrix,
    },
};

/// One batch's share of the frame's visible instance array.
struct CullTask<'a> {
    batch: &'a SrpBatch,
    visible_offset: u32,
    window: &'a mut [u32],
}

/// Writes the batch-relative indices of every instance of `batch` that survives
/// the plane tests to the front of `visible`, and returns how many there were.
///
/// `visible` must have room for the whole batch.
pub fn cull_batch(
    batch: &SrpBatch,
    local_bounds: &[Aabb],
    object_to_world: &[PackedMatrix],
    planes: &[Plane],
    visible: &mut [u32],
) -> u32 {
    let range = batch.instance_range();
    let mut count = 0;

    for (local_index, bounds, matrix) in izip!(
        0u32..,
        &local_bounds[range.clone()],
        &object_to_world[range]
    ) {
        let world_bounds = bounds.transform_affine(&matrix.columns());
        if world_bounds.intersect_planes(planes).is_visible() {
            visible[count] = local_index;
            count += 1;
        }
    }

    count as u32
}

fn draw_command(batch: &SrpBatch, visible_offset: u32, visible_count: u32) -> DrawCommand {
    DrawCommand {
        visible_offset,
        visible_count,
        batch_id: batch.batch_id,
        material: batch.draw_key.material,
        mesh: batch.draw_key.mesh,
        submesh_index: batch.draw_key.submesh as u16,
        split_visibility_mask: DrawCommand::ALL_SPLITS,
        sorting_position: 0,
    }
}

fn run_task(group: &DrawKeyGroup, planes: &[Plane], task: CullTask<'_>) -> Option<DrawCommand> {
    let count = cull_batch(
        task.batch,
        &group.local_bounds,
        &group.object_to_world,
        planes,
        task.window,
    );

    (count > 0).then(|| draw_command(task.batch, task.visible_offset, count))
}

/// Carves `visible` into one disjoint window per batch. A batch's window starts at
/// the instance total of the draw keys before it plus its own instance offset.
fn split_tasks<'a>(
    groups: &[&'a DrawKeyGroup],
    visible: &'a mut [u32],
) -> Result<Vec<Vec<CullTask<'a>>>> {
    let mut rest = visible;
    let mut cursor = 0u32;
    let mut group_base = 0u32;
    let mut tasks = Vec::with_capacity(groups.len());

    for &group in groups {
        let mut group_tasks = Vec::with_capacity(group.batches.len());

        for batch in &group.batches {
            let visible_offset = group_base + batch.instance_offset;
            if visible_offset < cursor || batch.instance_range().end > group.len() {
                return Err(InstancingError::InvalidCullingOutput(format!(
                    "batch {:?} covers instances {:?} of a draw key with {} instances",
                    batch.batch_id,
                    batch.instance_range(),
                    group.len()
                )));
            }

            let skip = (visible_offset - cursor) as usize;
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(skip);
            let (window, tail) = tail.split_at_mut(batch.instance_count as usize);
            rest = tail;
            cursor = visible_offset + batch.instance_count;

            group_tasks.push(CullTask {
                batch,
                visible_offset,
                window,
            });
        }

        group_base += group.instance_count();
        tasks.push(group_tasks);
    }

    Ok(tasks)
}

fn visible_buffer(groups: &[&DrawKeyGroup]) -> Vec<u32> {
    let total: usize = groups.iter().map(|group| group.len()).sum();
    vec![0; total]
}

/// Culls every batch of every draw key against `planes`.
///
/// Draw keys are culled concurrently and each one fans out further per batch. Batches
/// push their draw command into the draw key's queue, which is drained once the draw
/// key is done. Commands come out grouped by draw key in `groups` order and sorted by
/// visible offset within each draw key, so the result does not depend on scheduling.
pub fn cull_parallel(groups: &[&DrawKeyGroup], planes: &[Plane]) -> Result<FrameDrawCommands> {
    let mut visible_instances = visible_buffer(groups);
    let tasks = split_tasks(groups, &mut visible_instances)?;

    let per_draw_key: Vec<Vec<DrawCommand>> = tasks
        .into_par_iter()
        .zip(groups.par_iter())
        .map(|(group_tasks, group)| {
            let (sender, receiver) = mpsc::channel();

            group_tasks
                .into_par_iter()
                .for_each_with(sender, |sender, task| {
                    if let Some(command) = run_task(group, planes, task) {
                        // The receiver outlives every sender.
                        sender.send(command).ok();
                    }
                });

            let mut commands: Vec<DrawCommand> = receiver.try_iter().collect();
            commands.sort_unstable_by_key(|command| command.visible_offset);
            commands
        })
        .collect();

    Ok(FrameDrawCommands::assemble(visible_instances, per_draw_key))
}

/// Single threaded reference for [`cull_parallel`]; produces identical output.
pub fn cull_main_thread(groups: &[&DrawKeyGroup], planes: &[Plane]) -> Result<FrameDrawCommands> {
    let mut visible_instances = visible_buffer(groups);
    let tasks = split_tasks(groups, &mut visible_instances)?;

    let per_draw_key = tasks
        .into_iter()
        .zip(groups)
        .map(|(group_tasks, group)| {
            group_tasks
                .into_iter()
                .filter_map(|task| run_task(group, planes, task))
                .collect()
        })
        .collect();

    Ok(FrameDrawCommands::assemble(visible_instances, per_draw_key))
}
