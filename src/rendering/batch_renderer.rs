//! The boundary with the GPU-driven renderer that consumes batches.
//!
//! The renderer hands out opaque ids for meshes, materials, buffers and batches,
//! and once per frame calls back into a [`CullingCallback`] to obtain the draw
//! commands for that frame.

use crate::{
    error::{InstancingError, Result},
    math::{bounds::Aabb, plane::Plane},
    rendering::{global_uniform::BatchGlobals, instancing::draw_commands::CullingOutput},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Shader properties every batch overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderAttribute {
    ObjectToWorld,
    WorldToObject,
    BaseColor,
}

impl ShaderAttribute {
    pub fn name(self) -> &'static str {
        match self {
            ShaderAttribute::ObjectToWorld => "unity_ObjectToWorld",
            ShaderAttribute::WorldToObject => "unity_WorldToObject",
            ShaderAttribute::BaseColor => "_BaseColor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataValue {
    pub attribute: ShaderAttribute,
    pub value: u32,
}

impl MetadataValue {
    pub const OVERRIDE_BIT: u32 = 0x8000_0000;

    pub fn new(attribute: ShaderAttribute, address: u64, overridden: bool) -> Result<Self> {
        if address >= Self::OVERRIDE_BIT as u64 {
            return Err(InstancingError::AddressOverflow { address });
        }

        let flag = if overridden { Self::OVERRIDE_BIT } else { 0 };

        Ok(Self {
            attribute,
            value: address as u32 | flag,
        })
    }

    pub fn address(&self) -> u32 {
        self.value & !Self::OVERRIDE_BIT
    }

    pub fn is_overridden(&self) -> bool {
        self.value & Self::OVERRIDE_BIT != 0
    }
}

#[derive(Debug, Clone)]
pub struct MeshDescriptor {
    pub name: String,
    pub bounds: Aabb,
}

#[derive(Debug, Clone)]
pub struct MaterialDescriptor {
    pub name: String,
}

pub trait BatchRenderer {
    fn register_mesh(&mut self, mesh: &MeshDescriptor) -> MeshId;

    fn register_material(&mut self, material: &MaterialDescriptor) -> MaterialId;

    fn create_buffer(&mut self, size_in_bytes: u64) -> BufferHandle;

    fn add_batch(
        &mut self,
        metadata: &[MetadataValue],
        buffer: BufferHandle,
        offset: u32,
        window_size: u32,
    ) -> BatchId;

    fn set_global_bounds(&mut self, bounds: Aabb);

    fn set_globals(&mut self, globals: &BatchGlobals);
}

pub struct CullingContext<'a> {
    pub planes: &'a [Plane],
    pub split_count: u32,
}

/// Returned by the culling callback. All work is finished before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullingCompletion {
    Complete,
}

pub trait CullingCallback {
    fn on_perform_culling(
        &self,
        context: &CullingContext<'_>,
        output: &mut CullingOutput,
    ) -> CullingCompletion;
}
