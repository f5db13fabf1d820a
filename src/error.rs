use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstancingError {
    #[error(
        "Layout overflow: {bytes_per_instance} bytes x {instances} instances + {extra_bytes} extra bytes does not fit in 32 bits"
    )]
    LayoutOverflow {
        bytes_per_instance: u32,
        instances: u32,
        extra_bytes: u32,
    },

    #[error("Alignment {0} is not a non-zero power of two")]
    InvalidAlignment(u32),

    #[error("Buffer window of {window_bytes} bytes cannot hold a single instance")]
    WindowTooSmall { window_bytes: u32 },

    #[error("Batch of {requested} instances exceeds the window maximum of {maximum}")]
    BatchCapacityExceeded { requested: u32, maximum: u32 },

    #[error("Batch capacity must be at least one instance")]
    ZeroBatchCapacity,

    #[error("Byte address {address:#x} collides with the metadata override bit")]
    AddressOverflow { address: u64 },

    #[error("Write of {len} float4 at offset {offset} exceeds buffer of {capacity} float4")]
    BufferOutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("Instances cannot be spawned after batches have been built")]
    BatchesAlreadyBuilt,

    #[error("Scene has no meshes to register")]
    EmptyMeshes,

    #[error("Scene has no materials to register")]
    EmptyMaterials,

    #[error("Invalid culling output: {0}")]
    InvalidCullingOutput(String),
}

pub type Result<T> = std::result::Result<T, InstancingError>;
