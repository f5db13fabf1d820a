//! Batched GPU instancing: packing instance data into float4 addressed buffers,
//! splitting draw keys into window sized batches and culling them every frame.

pub mod batch_partitioner;
pub mod culling;
pub mod draw_commands;
pub mod draw_key;
pub mod instance_buffer;
pub mod instance_group;
pub mod instance_manager;
pub mod instance_updater;
pub mod instance_uploader;
pub mod layout;
pub mod packed_matrix;
pub mod spawn;

pub use draw_key::DrawKey;
pub use instance_group::{DrawKeyGroup, DrawKeyId, InstanceSpawn};
pub use instance_manager::InstanceManager;
pub use instance_updater::{FrameTime, Motion, MotionSettings};
pub use packed_matrix::PackedMatrix;
