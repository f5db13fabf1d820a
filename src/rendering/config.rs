use crate::rendering::instancing::layout::SIZE_OF_FLOAT4;

/// Which kind of GPU binding backs the instance buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferTarget {
    /// Raw byte-address buffer, batches address it with absolute offsets.
    #[default]
    Raw,
    /// Constant buffer, each batch binds its own window.
    Constant,
}

impl BufferTarget {
    pub const RAW_WINDOW_BYTES: u32 = 16 * 1024 * 1024;
    pub const CONSTANT_WINDOW_BYTES: u32 = 64 * 1024;
    /// Constant buffer bind offsets must be multiples of this, as wgpu's default
    /// `min_uniform_buffer_offset_alignment`.
    pub const CONSTANT_OFFSET_ALIGNMENT: u32 = 256;

    /// Largest byte span a single batch may address.
    pub fn window_bytes(self) -> u32 {
        match self {
            BufferTarget::Raw => Self::RAW_WINDOW_BYTES,
            BufferTarget::Constant => Self::CONSTANT_WINDOW_BYTES,
        }
    }

    /// Byte alignment of every batch start within its buffer.
    pub fn batch_alignment(self) -> u32 {
        match self {
            BufferTarget::Raw => SIZE_OF_FLOAT4,
            BufferTarget::Constant => Self::CONSTANT_OFFSET_ALIGNMENT,
        }
    }

    /// Window size handed to the renderer when adding a batch. Raw buffers pass 0.
    pub fn bind_window_size(self) -> u32 {
        match self {
            BufferTarget::Raw => 0,
            BufferTarget::Constant => Self::CONSTANT_WINDOW_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    #[default]
    Parallel,
    MainThread,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub buffer_target: BufferTarget,
    /// Caps instances per batch below the window maximum.
    pub max_instances_per_batch: Option<u32>,
    pub upload_strategy: ExecutionStrategy,
    pub cull_strategy: ExecutionStrategy,
    /// Mirror instance buffers into wgpu storage buffers when an adapter is available.
    pub gpu_mirror: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            buffer_target: BufferTarget::Raw,
            max_instances_per_batch: None,
            upload_strategy: ExecutionStrategy::Parallel,
            cull_strategy: ExecutionStrategy::Parallel,
            gpu_mirror: false,
        }
    }
}
