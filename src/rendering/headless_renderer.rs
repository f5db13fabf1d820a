use crate::{
    error::{InstancingError, Result},
    math::{bounds::Aabb, frustum::Frustum},
    rendering::{
        batch_renderer::{
            BatchId, BatchRenderer, BufferHandle, CullingCallback, CullingContext,
            MaterialDescriptor, MaterialId, MeshDescriptor, MeshId, MetadataValue,
        },
        global_uniform::BatchGlobals,
        instancing::draw_commands::{CullingOutput, FrameDrawCommands},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredBatch {
    pub metadata: Vec<MetadataValue>,
    pub buffer: BufferHandle,
    pub offset: u32,
    pub window_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub frame: u64,
    pub draw_commands: u32,
    pub visible_instances: u32,
}

/// In-process stand-in for the GPU renderer. It hands out sequential ids, records
/// everything registered with it and drives the culling callback once per frame,
/// checking the returned draw commands the way the GPU side would consume them.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    meshes: Vec<MeshDescriptor>,
    materials: Vec<MaterialDescriptor>,
    buffer_sizes: Vec<u64>,
    batches: Vec<RegisteredBatch>,
    global_bounds: Option<Aabb>,
    globals: Option<BatchGlobals>,
    frame: u64,
    last_frame: Option<FrameDrawCommands>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshDescriptor> {
        self.meshes.get(id.0 as usize)
    }

    pub fn material(&self, id: MaterialId) -> Option<&MaterialDescriptor> {
        self.materials.get(id.0 as usize)
    }

    pub fn batch(&self, id: BatchId) -> Option<&RegisteredBatch> {
        self.batches.get(id.0 as usize)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn buffer_size(&self, handle: BufferHandle) -> Option<u64> {
        self.buffer_sizes.get(handle.0 as usize).copied()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_sizes.len()
    }

    pub fn global_bounds(&self) -> Option<Aabb> {
        self.global_bounds
    }

    pub fn globals(&self) -> Option<&BatchGlobals> {
        self.globals.as_ref()
    }

    /// Draw commands of the most recent frame. Replaced by the next frame.
    pub fn last_frame(&self) -> Option<&FrameDrawCommands> {
        self.last_frame.as_ref()
    }

    /// Asks `callback` for this frame's draw commands, culling against `frustum`
    /// with a single split.
    pub fn render_frame(
        &mut self,
        callback: &dyn CullingCallback,
        frustum: &Frustum,
    ) -> Result<FrameStats> {
        let context = CullingContext {
            planes: &frustum.planes,
            split_count: 1,
        };
        let mut output = CullingOutput::default();
        callback.on_perform_culling(&context, &mut output);

        self.validate(&output.draw_commands)?;

        let stats = FrameStats {
            frame: self.frame,
            draw_commands: output.draw_commands.draw_commands.len() as u32,
            visible_instances: output.draw_commands.visible_instance_count(),
        };

        log::trace!(
            "Frame {}: {} draw commands, {} visible instances",
            stats.frame,
            stats.draw_commands,
            stats.visible_instances
        );

        self.frame += 1;
        self.last_frame = Some(output.draw_commands);
        Ok(stats)
    }

    fn validate(&self, frame: &FrameDrawCommands) -> Result<()> {
        let command_count = frame.draw_commands.len() as u32;

        match frame.draw_ranges.as_slice() {
            [range]
                if range.draw_commands_begin == 0 && range.draw_commands_count == command_count => {}
            ranges => {
                return Err(InstancingError::InvalidCullingOutput(format!(
                    "expected one draw range over {command_count} commands, got {ranges:?}"
                )))
            }
        }

        for command in &frame.draw_commands {
            if self.batch(command.batch_id).is_none() {
                return Err(InstancingError::InvalidCullingOutput(format!(
                    "unknown batch {:?}",
                    command.batch_id
                )));
            }

            if command.visible_count == 0 || frame.visible_for(command).is_none() {
                return Err(InstancingError::InvalidCullingOutput(format!(
                    "command for {:?} has visible range {}+{} outside {} indices",
                    command.batch_id,
                    command.visible_offset,
                    command.visible_count,
                    frame.visible_instances.len()
                )));
            }
        }

        Ok(())
    }
}

impl BatchRenderer for HeadlessRenderer {
    fn register_mesh(&mut self, mesh: &MeshDescriptor) -> MeshId {
        self.meshes.push(mesh.clone());
        MeshId(self.meshes.len() as u32 - 1)
    }

    fn register_material(&mut self, material: &MaterialDescriptor) -> MaterialId {
        self.materials.push(material.clone());
        MaterialId(self.materials.len() as u32 - 1)
    }

    fn create_buffer(&mut self, size_in_bytes: u64) -> BufferHandle {
        self.buffer_sizes.push(size_in_bytes);
        BufferHandle(self.buffer_sizes.len() as u32 - 1)
    }

    fn add_batch(
        &mut self,
        metadata: &[MetadataValue],
        buffer: BufferHandle,
        offset: u32,
        window_size: u32,
    ) -> BatchId {
        self.batches.push(RegisteredBatch {
            metadata: metadata.to_vec(),
            buffer,
            offset,
            window_size,
        });
        BatchId(self.batches.len() as u32 - 1)
    }

    fn set_global_bounds(&mut self, bounds: Aabb) {
        self.global_bounds = Some(bounds);
    }

    fn set_globals(&mut self, globals: &BatchGlobals) {
        self.globals = Some(*globals);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::rendering::{
        batch_renderer::CullingCompletion, instancing::draw_commands::DrawCommand,
    };

    struct FixedFrame(FrameDrawCommands);

    impl CullingCallback for FixedFrame {
        fn on_perform_culling(
            &self,
            context: &CullingContext<'_>,
            output: &mut CullingOutput,
        ) -> CullingCompletion {
            assert_eq!(context.planes.len(), 6);
            assert_eq!(context.split_count, 1);
            output.draw_commands = self.0.clone();
            CullingCompletion::Complete
        }
    }

    fn command(batch_id: BatchId, visible_offset: u32, visible_count: u32) -> DrawCommand {
        DrawCommand {
            visible_offset,
            visible_count,
            batch_id,
            material: MaterialId(0),
            mesh: MeshId(0),
            submesh_index: 0,
            split_visibility_mask: DrawCommand::ALL_SPLITS,
            sorting_position: 0,
        }
    }

    fn renderer_with_batch() -> (HeadlessRenderer, BatchId) {
        let mut renderer = HeadlessRenderer::new();
        let buffer = renderer.create_buffer(1024);
        let batch = renderer.add_batch(&[], buffer, 0, 0);
        (renderer, batch)
    }

    fn frustum() -> Frustum {
        Frustum::from_box(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn ids_are_sequential() {
        let mut renderer = HeadlessRenderer::new();
        let cube = MeshDescriptor {
            name: "cube".into(),
            bounds: Aabb::new(Vec3::ZERO, Vec3::splat(0.5)),
        };
        assert_eq!(renderer.register_mesh(&cube), MeshId(0));
        assert_eq!(renderer.register_mesh(&cube), MeshId(1));
        assert_eq!(
            renderer.register_material(&MaterialDescriptor { name: "lit".into() }),
            MaterialId(0)
        );
        assert_eq!(renderer.mesh(MeshId(1)).unwrap().name, "cube");
    }

    #[test]
    fn accepts_well_formed_frames() {
        let (mut renderer, batch) = renderer_with_batch();
        let frame = FrameDrawCommands::assemble(vec![0, 1, 0], vec![vec![command(batch, 0, 2)]]);

        let stats = renderer.render_frame(&FixedFrame(frame), &frustum()).unwrap();
        assert_eq!(stats.draw_commands, 1);
        assert_eq!(stats.visible_instances, 2);

        let empty = FixedFrame(FrameDrawCommands::assemble(Vec::new(), Vec::new()));
        let second = renderer.render_frame(&empty, &frustum()).unwrap();
        assert_eq!(second.frame, 1);
        assert_eq!(renderer.last_frame().unwrap().draw_commands.len(), 0);
    }

    #[test]
    fn rejects_out_of_range_visible_windows() {
        let (mut renderer, batch) = renderer_with_batch();
        let frame = FrameDrawCommands::assemble(vec![0], vec![vec![command(batch, 0, 2)]]);

        assert!(matches!(
            renderer.render_frame(&FixedFrame(frame), &frustum()),
            Err(InstancingError::InvalidCullingOutput(_))
        ));
    }

    #[test]
    fn rejects_unknown_batches_and_missing_ranges() {
        let (mut renderer, _) = renderer_with_batch();
        let frame = FrameDrawCommands::assemble(vec![0], vec![vec![command(BatchId(7), 0, 1)]]);
        assert!(renderer.render_frame(&FixedFrame(frame), &frustum()).is_err());

        let mut no_range = FrameDrawCommands::assemble(Vec::new(), Vec::new());
        no_range.draw_ranges.clear();
        assert!(renderer.render_frame(&FixedFrame(no_range), &frustum()).is_err());
    }
}
