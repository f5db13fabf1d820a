use glam::{Quat, Vec3, Vec4};
use id_arena::Id;

use crate::{
    math::bounds::Aabb,
    rendering::instancing::{
        batch_partitioner::SrpBatch, draw_key::DrawKey, instance_buffer::InstanceBuffer,
        packed_matrix::PackedMatrix,
    },
};

pub type DrawKeyId = Id<DrawKeyGroup>;

/// Initial state of one instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceSpawn {
    pub position: Vec3,
    pub rotation: Quat,
    pub bounds: Aabb,
    pub color: Vec4,
}

/// All instances sharing one draw key, stored as parallel arrays indexed by
/// instance, together with the batches and buffer they are drawn from.
#[derive(Debug)]
pub struct DrawKeyGroup {
    pub draw_key: DrawKey,
    /// Spawn positions. Orbiting instances are placed relative to these every frame.
    pub anchors: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub local_bounds: Vec<Aabb>,
    pub colors: Vec<Vec4>,
    pub object_to_world: Vec<PackedMatrix>,
    pub world_to_object: Vec<PackedMatrix>,
    pub batches: Vec<SrpBatch>,
    pub instance_buffer: Option<InstanceBuffer>,
}

impl DrawKeyGroup {
    pub fn new(draw_key: DrawKey) -> Self {
        Self {
            draw_key,
            anchors: Vec::new(),
            rotations: Vec::new(),
            local_bounds: Vec::new(),
            colors: Vec::new(),
            object_to_world: Vec::new(),
            world_to_object: Vec::new(),
            batches: Vec::new(),
            instance_buffer: None,
        }
    }

    pub fn push_instance(&mut self, spawn: InstanceSpawn) {
        self.anchors.push(spawn.position);
        self.rotations.push(spawn.rotation);
        self.local_bounds.push(spawn.bounds);
        self.colors.push(spawn.color);
        self.object_to_world.push(PackedMatrix::IDENTITY);
        self.world_to_object.push(PackedMatrix::IDENTITY);
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn instance_count(&self) -> u32 {
        self.len() as u32
    }

    pub fn world_position(&self, index: usize) -> Option<Vec3> {
        self.object_to_world
            .get(index)
            .map(|matrix| matrix.columns()[3])
    }
}
