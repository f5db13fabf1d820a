use std::collections::HashMap;

use id_arena::Arena;

use crate::{
    error::{InstancingError, Result},
    math::plane::Plane,
    rendering::{
        batch_renderer::{BatchRenderer, CullingCallback, CullingCompletion, CullingContext},
        config::{ExecutionStrategy, RenderConfig},
        instancing::{
            batch_partitioner::{register_batches, BatchPlan, SrpBatch},
            culling::{cull_main_thread, cull_parallel},
            draw_commands::{CullingOutput, FrameDrawCommands},
            draw_key::DrawKey,
            instance_buffer::InstanceBuffer,
            instance_group::{DrawKeyGroup, DrawKeyId, InstanceSpawn},
            instance_updater::{update_group, FrameTime, MotionSettings},
            instance_uploader::{upload_main_thread, upload_parallel},
            layout::HEADER_FLOAT4_COUNT,
        },
    },
};

/// Owns every draw key group and drives the per-frame update, upload and cull stages.
///
/// Groups live in an arena and are always visited in creation order, which keeps task
/// fan-out and the assembled draw commands stable from run to run.
pub struct InstanceManager {
    config: RenderConfig,
    groups: Arena<DrawKeyGroup>,
    group_lookup: HashMap<DrawKey, DrawKeyId>,
    batches_built: bool,
}

impl InstanceManager {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            groups: Arena::new(),
            group_lookup: HashMap::new(),
            batches_built: false,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn spawn(&mut self, draw_key: DrawKey, spawn: InstanceSpawn) -> Result<DrawKeyId> {
        if self.batches_built {
            return Err(InstancingError::BatchesAlreadyBuilt);
        }

        let groups = &mut self.groups;
        let id = *self
            .group_lookup
            .entry(draw_key)
            .or_insert_with(|| groups.alloc(DrawKeyGroup::new(draw_key)));

        self.groups[id].push_instance(spawn);
        Ok(id)
    }

    pub fn group(&self, id: DrawKeyId) -> Option<&DrawKeyGroup> {
        self.groups.get(id)
    }

    pub fn group_for(&self, draw_key: DrawKey) -> Option<&DrawKeyGroup> {
        self.group_lookup
            .get(&draw_key)
            .and_then(|&id| self.groups.get(id))
    }

    pub fn groups(&self) -> impl Iterator<Item = (DrawKeyId, &DrawKeyGroup)> {
        self.groups.iter()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn total_instances(&self) -> u32 {
        self.groups
            .iter()
            .map(|(_, group)| group.instance_count())
            .sum()
    }

    pub fn batches(&self) -> impl Iterator<Item = &SrpBatch> {
        self.groups
            .iter()
            .flat_map(|(_, group)| group.batches.iter())
    }

    pub fn instance_buffers(&self) -> impl Iterator<Item = (DrawKeyId, &InstanceBuffer)> {
        self.groups.iter().filter_map(|(id, group)| {
            group
                .instance_buffer
                .as_ref()
                .map(|buffer| (id, buffer))
        })
    }

    /// Partitions every group into batches, creates its buffer and registers the
    /// batches with the renderer. Batch headers are zeroed here once.
    ///
    /// Runs once, after all instances are spawned. Capacity problems surface here,
    /// before any buffer exists.
    pub fn build_batches(&mut self, renderer: &mut dyn BatchRenderer) -> Result<()> {
        if self.batches_built {
            return Err(InstancingError::BatchesAlreadyBuilt);
        }

        let target = self.config.buffer_target;

        let plans = self
            .groups
            .iter()
            .map(|(_, group)| {
                BatchPlan::for_target(
                    group.instance_count(),
                    target,
                    self.config.max_instances_per_batch,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        for ((_, group), plan) in self.groups.iter_mut().zip(plans) {
            if plan.slices.is_empty() {
                continue;
            }

            let handle = renderer.create_buffer(plan.buffer_size_in_bytes());
            let batches = register_batches(renderer, group.draw_key, &plan, handle, target)?;

            let mut buffer = InstanceBuffer::new(handle, plan.buffer_size_in_float4 as usize);
            {
                let mut writer = buffer.lock_for_write();
                for batch in &batches {
                    writer.zero(batch.header_offset(), HEADER_FLOAT4_COUNT as usize)?;
                }
            }

            log::info!(
                "{:?}: {} instances in {} batches of up to {}, {} byte buffer",
                group.draw_key,
                group.len(),
                batches.len(),
                plan.max_instances_per_batch,
                plan.buffer_size_in_bytes()
            );

            group.batches = batches;
            group.instance_buffer = Some(buffer);
        }

        self.batches_built = true;
        Ok(())
    }

    pub fn update(&mut self, settings: &MotionSettings, time: FrameTime) {
        for (_, group) in self.groups.iter_mut() {
            update_group(group, settings, time);
        }
    }

    /// Writes the current instance data into every group's buffer. Returns after all
    /// writes are complete, so culling can read the buffers afterwards.
    pub fn upload(&mut self) -> Result<()> {
        let groups = self.groups.iter_mut().map(|(_, group)| group);

        match self.config.upload_strategy {
            ExecutionStrategy::Parallel => upload_parallel(&mut groups.collect::<Vec<_>>()),
            ExecutionStrategy::MainThread => upload_main_thread(groups),
        }
    }

    pub fn cull(&self, planes: &[Plane]) -> Result<FrameDrawCommands> {
        let groups: Vec<&DrawKeyGroup> = self.groups.iter().map(|(_, group)| group).collect();

        match self.config.cull_strategy {
            ExecutionStrategy::Parallel => cull_parallel(&groups, planes),
            ExecutionStrategy::MainThread => cull_main_thread(&groups, planes),
        }
    }
}

impl CullingCallback for InstanceManager {
    fn on_perform_culling(
        &self,
        context: &CullingContext<'_>,
        output: &mut CullingOutput,
    ) -> CullingCompletion {
        if context.split_count != 1 || context.planes.len() != 6 {
            log::debug!(
                "Culling {} planes in {} splits as a single split",
                context.planes.len(),
                context.split_count
            );
        }

        output.draw_commands = match self.cull(context.planes) {
            Ok(draw_commands) => draw_commands,
            Err(error) => {
                log::error!("Culling failed, drawing nothing this frame: {error}");
                FrameDrawCommands::assemble(Vec::new(), Vec::new())
            }
        };

        log::trace!(
            "Culled {} planes: {} draw commands, {} visible instances",
            context.planes.len(),
            output.draw_commands.draw_commands.len(),
            output.draw_commands.visible_instance_count()
        );

        CullingCompletion::Complete
    }
}
