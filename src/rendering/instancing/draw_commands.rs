use crate::rendering::batch_renderer::{BatchId, MaterialId, MeshId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    /// Start of this command's indices in [`FrameDrawCommands::visible_instances`].
    pub visible_offset: u32,
    pub visible_count: u32,
    pub batch_id: BatchId,
    pub material: MaterialId,
    pub mesh: MeshId,
    pub submesh_index: u16,
    pub split_visibility_mask: u16,
    pub sorting_position: i32,
}

impl DrawCommand {
    pub const ALL_SPLITS: u16 = 0xff;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionVectorMode {
    Camera,
    Object,
    ForceNoMotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowCastingMode {
    Off,
    On,
    TwoSided,
    ShadowsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSettings {
    pub rendering_layer_mask: u32,
    pub layer: u8,
    pub motion_mode: MotionVectorMode,
    pub shadow_casting_mode: ShadowCastingMode,
    pub receive_shadows: bool,
    pub static_shadow_caster: bool,
    pub all_depth_sorted: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            rendering_layer_mask: 0xffff_ffff,
            layer: 0,
            motion_mode: MotionVectorMode::Camera,
            shadow_casting_mode: ShadowCastingMode::Off,
            receive_shadows: false,
            static_shadow_caster: false,
            all_depth_sorted: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRange {
    pub draw_commands_begin: u32,
    pub draw_commands_count: u32,
    pub filter_settings: FilterSettings,
}

/// Everything the renderer needs to draw one frame. Rebuilt by every culling pass
/// and dropped by the renderer at the end of the frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDrawCommands {
    pub visible_instances: Vec<u32>,
    pub draw_commands: Vec<DrawCommand>,
    pub draw_ranges: Vec<DrawRange>,
}

impl FrameDrawCommands {
    /// Flattens per draw key command queues into one contiguous command list covered
    /// by a single draw range.
    pub fn assemble(visible_instances: Vec<u32>, per_draw_key: Vec<Vec<DrawCommand>>) -> Self {
        let total: usize = per_draw_key.iter().map(Vec::len).sum();

        let mut draw_commands = Vec::with_capacity(total);
        for commands in per_draw_key {
            draw_commands.extend(commands);
        }

        let draw_ranges = vec![DrawRange {
            draw_commands_begin: 0,
            draw_commands_count: draw_commands.len() as u32,
            filter_settings: FilterSettings::default(),
        }];

        Self {
            visible_instances,
            draw_commands,
            draw_ranges,
        }
    }

    pub fn visible_instance_count(&self) -> u32 {
        self.draw_commands
            .iter()
            .map(|command| command.visible_count)
            .sum()
    }

    /// Batch-relative instance indices drawn by `command`.
    pub fn visible_for(&self, command: &DrawCommand) -> Option<&[u32]> {
        let start = command.visible_offset as usize;
        let end = start.checked_add(command.visible_count as usize)?;
        self.visible_instances.get(start..end)
    }
}

/// The sink the culling callback fills in.
#[derive(Debug, Default)]
pub struct CullingOutput {
    pub draw_commands: FrameDrawCommands,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(batch: u32, visible_offset: u32, visible_count: u32) -> DrawCommand {
        DrawCommand {
            visible_offset,
            visible_count,
            batch_id: BatchId(batch),
            material: MaterialId(0),
            mesh: MeshId(0),
            submesh_index: 0,
            split_visibility_mask: DrawCommand::ALL_SPLITS,
            sorting_position: 0,
        }
    }

    #[test]
    fn assemble_covers_all_commands_with_one_range() {
        let frame = FrameDrawCommands::assemble(
            vec![0, 1, 0, 2, 3],
            vec![vec![command(0, 0, 2)], vec![], vec![command(1, 2, 1), command(2, 3, 2)]],
        );

        assert_eq!(frame.draw_commands.len(), 3);
        assert_eq!(frame.draw_ranges.len(), 1);
        assert_eq!(frame.draw_ranges[0].draw_commands_begin, 0);
        assert_eq!(frame.draw_ranges[0].draw_commands_count, 3);
        assert_eq!(
            frame.draw_ranges[0].filter_settings.shadow_casting_mode,
            ShadowCastingMode::Off
        );
        assert_eq!(frame.visible_instance_count(), 5);
        assert_eq!(frame.visible_for(&frame.draw_commands[2]), Some(&[2, 3][..]));
    }

    #[test]
    fn empty_frame_still_has_one_range() {
        let frame = FrameDrawCommands::assemble(Vec::new(), vec![Vec::new(), Vec::new()]);
        assert!(frame.draw_commands.is_empty());
        assert_eq!(frame.draw_ranges[0].draw_commands_count, 0);
        assert_eq!(frame.visible_instance_count(), 0);
    }
}
