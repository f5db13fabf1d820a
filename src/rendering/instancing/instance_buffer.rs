use glam::Vec4;

use crate::{
    error::{InstancingError, Result},
    rendering::batch_renderer::BufferHandle,
};

/// Float4 addressed instance data for one draw key, as the GPU will see it.
///
/// Writes go through [`InstanceBuffer::lock_for_write`]; the returned writer holds
/// the buffer exclusively and releases it when dropped, bumping the generation.
#[derive(Debug)]
pub struct InstanceBuffer {
    handle: BufferHandle,
    data: Vec<Vec4>,
    generation: u64,
}

impl InstanceBuffer {
    pub fn new(handle: BufferHandle, len_in_float4: usize) -> Self {
        Self {
            handle,
            data: vec![Vec4::ZERO; len_in_float4],
            generation: 0,
        }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn len_in_float4(&self) -> usize {
        self.data.len()
    }

    pub fn size_in_bytes(&self) -> u64 {
        std::mem::size_of_val(self.data.as_slice()) as u64
    }

    pub fn as_float4s(&self) -> &[Vec4] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Number of completed write windows.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lock_for_write(&mut self) -> InstanceBufferWriter<'_> {
        InstanceBufferWriter { buffer: self }
    }
}

pub struct InstanceBufferWriter<'a> {
    buffer: &'a mut InstanceBuffer,
}

impl InstanceBufferWriter<'_> {
    pub fn write(&mut self, offset_in_float4: usize, values: &[Vec4]) -> Result<()> {
        let capacity = self.buffer.data.len();
        let target = offset_in_float4
            .checked_add(values.len())
            .filter(|&end| end <= capacity)
            .map(|end| &mut self.buffer.data[offset_in_float4..end])
            .ok_or(InstancingError::BufferOutOfBounds {
                offset: offset_in_float4,
                len: values.len(),
                capacity,
            })?;

        target.copy_from_slice(values);
        Ok(())
    }

    pub fn zero(&mut self, offset_in_float4: usize, len: usize) -> Result<()> {
        let capacity = self.buffer.data.len();
        let target = offset_in_float4
            .checked_add(len)
            .filter(|&end| end <= capacity)
            .map(|end| &mut self.buffer.data[offset_in_float4..end])
            .ok_or(InstancingError::BufferOutOfBounds {
                offset: offset_in_float4,
                len,
                capacity,
            })?;

        target.fill(Vec4::ZERO);
        Ok(())
    }
}

impl Drop for InstanceBufferWriter<'_> {
    fn drop(&mut self) {
        self.buffer.generation += 1;
    }
}
