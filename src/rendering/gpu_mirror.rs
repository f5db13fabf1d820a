use std::collections::HashMap;

use anyhow::Context;

use crate::rendering::{
    global_uniform::BatchGlobals,
    instancing::{instance_group::DrawKeyId, instance_manager::InstanceManager},
};

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Requests a device without a surface. Fails when the machine has no usable adapter.
    pub fn request_headless() -> anyhow::Result<Self> {
        pollster::block_on(Self::request_headless_async())
    }

    async fn request_headless_async() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("No GPU adapter available")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: Some("Instance mirror device"),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create GPU device")?;

        Ok(Self {
            device,
            queue,
            adapter_info: adapter.get_info(),
        })
    }
}

/// Keeps a wgpu storage buffer in step with every draw key's instance buffer,
/// plus a uniform buffer for the per-frame globals.
pub struct GpuMirror {
    context: GpuContext,
    instance_buffers: HashMap<DrawKeyId, wgpu::Buffer>,
    globals_buffer: wgpu::Buffer,
}

impl GpuMirror {
    /// Allocates GPU buffers matching the manager's instance buffers. Call after the
    /// batches are built.
    pub fn new(context: GpuContext, manager: &InstanceManager) -> Self {
        let instance_buffers = manager
            .instance_buffers()
            .map(|(id, buffer)| {
                let gpu_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Instance buffer"),
                    size: buffer.size_in_bytes(),
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                (id, gpu_buffer)
            })
            .collect();

        let globals_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Batch globals buffer"),
            size: std::mem::size_of::<BatchGlobals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "Mirroring instance buffers on {} ({:?})",
            context.adapter_info.name,
            context.adapter_info.backend
        );

        Self {
            context,
            instance_buffers,
            globals_buffer,
        }
    }

    /// Queues this frame's instance data and globals for the GPU. Must run after the
    /// upload stage has finished writing.
    pub fn sync(&self, manager: &InstanceManager, globals: &BatchGlobals) {
        let queue = &self.context.queue;

        queue.write_buffer(&self.globals_buffer, 0, globals.as_bytes());

        for (id, buffer) in manager.instance_buffers() {
            match self.instance_buffers.get(&id) {
                Some(gpu_buffer) => queue.write_buffer(gpu_buffer, 0, buffer.as_bytes()),
                None => log::warn!("No GPU buffer mirrors {:?}", id),
            }
        }

        queue.submit(std::iter::empty::<wgpu::CommandBuffer>());
    }
}
