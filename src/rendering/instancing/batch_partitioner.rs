use std::ops::Range;

use crate::{
    error::{InstancingError, Result},
    rendering::{
        batch_renderer::{BatchId, BatchRenderer, BufferHandle, MetadataValue, ShaderAttribute},
        config::BufferTarget,
        instancing::{
            draw_key::DrawKey,
            layout::{
                align_up, max_instances_per_window, size_for_instances, BYTES_PER_INSTANCE,
                HEADER_BYTES, HEADER_FLOAT4_COUNT, SIZE_OF_FLOAT4, SIZE_OF_PACKED_MATRIX,
            },
        },
    },
};

/// One planned batch before it is registered with the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSlice {
    pub buffer_offset_in_float4: u32,
    pub instance_offset: u32,
    pub instance_count: u32,
}

/// How one draw key's instances are split across batches of a shared buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub max_instances_per_batch: u32,
    pub aligned_batch_size_in_float4: u32,
    pub buffer_size_in_float4: u32,
    pub slices: Vec<BatchSlice>,
}

impl BatchPlan {
    /// Plans batches for the window and bind alignment of `target`.
    pub fn for_target(instance_count: u32, target: BufferTarget, limit: Option<u32>) -> Result<Self> {
        Self::for_window(
            instance_count,
            target.window_bytes(),
            target.batch_alignment(),
            limit,
        )
    }

    /// Plans batches so that no batch addresses more than `window_bytes` and every batch
    /// starts on a `batch_alignment` byte boundary.
    /// `limit` lowers the per batch maximum further; it may not raise it.
    pub fn for_window(
        instance_count: u32,
        window_bytes: u32,
        batch_alignment: u32,
        limit: Option<u32>,
    ) -> Result<Self> {
        let window_max = max_instances_per_window(window_bytes, batch_alignment)?;

        let max_instances = match limit {
            Some(requested) if requested > window_max => {
                return Err(InstancingError::BatchCapacityExceeded {
                    requested,
                    maximum: window_max,
                })
            }
            Some(requested) => requested,
            None => window_max,
        };

        Self::with_alignment(instance_count, max_instances, batch_alignment)
    }

    /// Tightly packed batches, each starting on the next float4.
    pub fn with_max_instances(instance_count: u32, max_instances_per_batch: u32) -> Result<Self> {
        Self::with_alignment(instance_count, max_instances_per_batch, SIZE_OF_FLOAT4)
    }

    pub fn with_alignment(
        instance_count: u32,
        max_instances_per_batch: u32,
        batch_alignment: u32,
    ) -> Result<Self> {
        if batch_alignment < SIZE_OF_FLOAT4 || !batch_alignment.is_power_of_two() {
            return Err(InstancingError::InvalidAlignment(batch_alignment));
        }

        if max_instances_per_batch == 0 {
            return Err(InstancingError::ZeroBatchCapacity);
        }

        if instance_count == 0 {
            return Ok(Self {
                max_instances_per_batch,
                aligned_batch_size_in_float4: 0,
                buffer_size_in_float4: 0,
                slices: Vec::new(),
            });
        }

        // Small groups get one batch sized to their count, not to the window.
        let per_batch = max_instances_per_batch.min(instance_count);
        let overflow = InstancingError::LayoutOverflow {
            bytes_per_instance: BYTES_PER_INSTANCE,
            instances: instance_count,
            extra_bytes: HEADER_BYTES,
        };

        let batch_bytes =
            size_for_instances(BYTES_PER_INSTANCE, per_batch, SIZE_OF_FLOAT4, HEADER_BYTES)?;
        let aligned_batch_size_in_float4 =
            align_up(batch_bytes, batch_alignment).ok_or(overflow.clone())? / SIZE_OF_FLOAT4;
        let batch_count = instance_count.div_ceil(per_batch);
        let buffer_size_in_float4 = batch_count
            .checked_mul(aligned_batch_size_in_float4)
            .ok_or(overflow)?;

        let slices = (0..batch_count)
            .map(|batch_index| {
                let instance_offset = batch_index * per_batch;
                BatchSlice {
                    buffer_offset_in_float4: batch_index * aligned_batch_size_in_float4,
                    instance_offset,
                    instance_count: (instance_count - instance_offset).min(per_batch),
                }
            })
            .collect();

        Ok(Self {
            max_instances_per_batch: per_batch,
            aligned_batch_size_in_float4,
            buffer_size_in_float4,
            slices,
        })
    }

    pub fn batch_count(&self) -> usize {
        self.slices.len()
    }

    pub fn buffer_size_in_bytes(&self) -> u64 {
        self.buffer_size_in_float4 as u64 * SIZE_OF_FLOAT4 as u64
    }
}

/// A registered batch: a window of a draw key's instance buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SrpBatch {
    pub batch_id: BatchId,
    pub draw_key: DrawKey,
    pub buffer_offset_in_float4: u32,
    pub instance_offset: u32,
    pub instance_count: u32,
}

impl SrpBatch {
    pub fn instance_range(&self) -> Range<usize> {
        let start = self.instance_offset as usize;
        start..start + self.instance_count as usize
    }

    pub fn header_offset(&self) -> usize {
        self.buffer_offset_in_float4 as usize
    }

    pub fn object_to_world_offset(&self) -> usize {
        self.header_offset() + HEADER_FLOAT4_COUNT as usize
    }

    pub fn world_to_object_offset(&self) -> usize {
        self.object_to_world_offset() + self.instance_count as usize * 3
    }

    pub fn color_offset(&self) -> usize {
        self.world_to_object_offset() + self.instance_count as usize * 3
    }

    /// One past the last float4 of this batch's data.
    pub fn end_offset(&self) -> usize {
        self.color_offset() + self.instance_count as usize
    }
}

/// Byte addresses of the three regions, with the override bit set.
/// `relative` addresses are measured from the batch start instead of the buffer start.
pub fn batch_metadata(slice: &BatchSlice, relative: bool) -> Result<[MetadataValue; 3]> {
    let base = if relative {
        0
    } else {
        slice.buffer_offset_in_float4 as u64 * SIZE_OF_FLOAT4 as u64
    };
    let region_stride = SIZE_OF_PACKED_MATRIX as u64 * slice.instance_count as u64;

    let object_to_world = base + HEADER_BYTES as u64;
    let world_to_object = object_to_world + region_stride;
    let color = world_to_object + region_stride;

    Ok([
        MetadataValue::new(ShaderAttribute::ObjectToWorld, object_to_world, true)?,
        MetadataValue::new(ShaderAttribute::WorldToObject, world_to_object, true)?,
        MetadataValue::new(ShaderAttribute::BaseColor, color, true)?,
    ])
}

pub fn register_batches(
    renderer: &mut dyn BatchRenderer,
    draw_key: DrawKey,
    plan: &BatchPlan,
    buffer: BufferHandle,
    target: BufferTarget,
) -> Result<Vec<SrpBatch>> {
    let mut batches = Vec::with_capacity(plan.slices.len());

    for slice in &plan.slices {
        if slice.instance_count > plan.max_instances_per_batch {
            return Err(InstancingError::BatchCapacityExceeded {
                requested: slice.instance_count,
                maximum: plan.max_instances_per_batch,
            });
        }

        let (metadata, bind_offset) = match target {
            BufferTarget::Raw => (batch_metadata(slice, false)?, 0),
            BufferTarget::Constant => {
                let offset = slice.buffer_offset_in_float4 as u64 * SIZE_OF_FLOAT4 as u64;
                let offset = u32::try_from(offset)
                    .map_err(|_| InstancingError::AddressOverflow { address: offset })?;
                (batch_metadata(slice, true)?, offset)
            }
        };

        let batch_id =
            renderer.add_batch(&metadata, buffer, bind_offset, target.bind_window_size());

        log::debug!(
            "Batch {:?} for {:?}: {} instances at float4 offset {}, {}",
            batch_id,
            draw_key,
            slice.instance_count,
            slice.buffer_offset_in_float4,
            metadata
                .iter()
                .map(|value| format!("{}@{}", value.attribute.name(), value.address()))
                .collect::<Vec<_>>()
                .join(" ")
        );

        batches.push(SrpBatch {
            batch_id,
            draw_key,
            buffer_offset_in_float4: slice.buffer_offset_in_float4,
            instance_offset: slice.instance_offset,
            instance_count: slice.instance_count,
        });
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_instances_two_per_batch() {
        let plan = BatchPlan::with_max_instances(3, 2).unwrap();

        assert_eq!(plan.batch_count(), 2);
        assert_eq!(plan.aligned_batch_size_in_float4, 4 + 2 * 7);
        assert_eq!(plan.buffer_size_in_float4, 2 * 18);
        assert_eq!(
            plan.slices,
            vec![
                BatchSlice {
                    buffer_offset_in_float4: 0,
                    instance_offset: 0,
                    instance_count: 2
                },
                BatchSlice {
                    buffer_offset_in_float4: 18,
                    instance_offset: 2,
                    instance_count: 1
                },
            ]
        );
    }

    #[test]
    fn small_group_gets_one_batch_sized_to_count() {
        let plan = BatchPlan::for_target(10, BufferTarget::Raw, None).unwrap();

        assert_eq!(plan.batch_count(), 1);
        assert_eq!(plan.max_instances_per_batch, 10);
        assert_eq!(plan.buffer_size_in_float4, 4 + 10 * 7);
    }

    #[test]
    fn even_split_fills_last_batch() {
        let plan = BatchPlan::with_max_instances(6, 3).unwrap();
        let counts: Vec<u32> = plan.slices.iter().map(|s| s.instance_count).collect();
        assert_eq!(counts, vec![3, 3]);
    }

    #[test]
    fn empty_group_has_no_batches() {
        let plan = BatchPlan::with_max_instances(0, 5).unwrap();
        assert_eq!(plan.batch_count(), 0);
        assert_eq!(plan.buffer_size_in_bytes(), 0);
    }

    #[test]
    fn rejects_limits_above_window() {
        let window_max = max_instances_per_window(
            BufferTarget::CONSTANT_WINDOW_BYTES,
            BufferTarget::CONSTANT_OFFSET_ALIGNMENT,
        )
        .unwrap();

        assert_eq!(
            BatchPlan::for_target(10_000, BufferTarget::Constant, Some(window_max + 1)),
            Err(InstancingError::BatchCapacityExceeded {
                requested: window_max + 1,
                maximum: window_max
            })
        );
        assert_eq!(
            BatchPlan::with_max_instances(3, 0),
            Err(InstancingError::ZeroBatchCapacity)
        );
        assert!(matches!(
            BatchPlan::for_window(3, 100, 16, None),
            Err(InstancingError::WindowTooSmall { .. })
        ));
        assert_eq!(
            BatchPlan::with_alignment(3, 2, 24),
            Err(InstancingError::InvalidAlignment(24))
        );
    }

    #[test]
    fn constant_window_batches_fit_window() {
        let plan = BatchPlan::for_target(2000, BufferTarget::Constant, None).unwrap();

        assert_eq!(plan.batch_count(), 4);
        // 64 + 584 * 112 = 65472 bytes, padded to the next 256 byte boundary.
        assert_eq!(plan.aligned_batch_size_in_float4, 4096);
        assert!(plan.aligned_batch_size_in_float4 * SIZE_OF_FLOAT4 <= BufferTarget::CONSTANT_WINDOW_BYTES);
        assert_eq!(plan.slices[3].instance_count, 2000 - 3 * 584);
        assert!(plan
            .slices
            .iter()
            .all(|slice| slice.buffer_offset_in_float4 * SIZE_OF_FLOAT4 % 256 == 0));
    }

    #[test]
    fn aligned_stride_pads_small_batches() {
        let plan = BatchPlan::with_alignment(3, 2, 256).unwrap();

        // 64 + 2 * 112 = 288 bytes, padded to 512.
        assert_eq!(plan.aligned_batch_size_in_float4, 32);
        assert_eq!(plan.buffer_size_in_float4, 64);
        assert_eq!(plan.slices[1].buffer_offset_in_float4, 32);
    }

    #[test]
    fn constant_batches_register_at_aligned_offsets() {
        use crate::rendering::headless_renderer::HeadlessRenderer;

        let mut renderer = HeadlessRenderer::new();
        let draw_key = DrawKey::new(
            crate::rendering::batch_renderer::MeshId(0),
            0,
            crate::rendering::batch_renderer::MaterialId(0),
        );
        let plan = BatchPlan::for_target(1500, BufferTarget::Constant, None).unwrap();
        let handle = renderer.create_buffer(plan.buffer_size_in_bytes());

        let batches =
            register_batches(&mut renderer, draw_key, &plan, handle, BufferTarget::Constant).unwrap();

        assert_eq!(batches.len(), 3);
        let offsets: Vec<u32> = batches
            .iter()
            .map(|batch| renderer.batch(batch.batch_id).unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 65536, 131072]);
        assert!(batches
            .iter()
            .map(|batch| renderer.batch(batch.batch_id).unwrap())
            .all(|registered| registered.window_size == BufferTarget::CONSTANT_WINDOW_BYTES));
    }

    #[test]
    fn metadata_addresses_follow_regions() {
        let slice = BatchSlice {
            buffer_offset_in_float4: 18,
            instance_offset: 2,
            instance_count: 1,
        };

        let absolute = batch_metadata(&slice, false).unwrap();
        assert_eq!(absolute[0].address(), 18 * 16 + 64);
        assert_eq!(absolute[1].address(), 18 * 16 + 64 + 48);
        assert_eq!(absolute[2].address(), 18 * 16 + 64 + 96);
        assert!(absolute.iter().all(MetadataValue::is_overridden));

        let relative = batch_metadata(&slice, true).unwrap();
        assert_eq!(relative[0].address(), 64);

        let names: Vec<&str> = absolute.iter().map(|value| value.attribute.name()).collect();
        assert_eq!(names, ["unity_ObjectToWorld", "unity_WorldToObject", "_BaseColor"]);
    }

    #[test]
    fn region_offsets_in_float4() {
        let batch = SrpBatch {
            batch_id: BatchId(1),
            draw_key: DrawKey::new(
                crate::rendering::batch_renderer::MeshId(0),
                0,
                crate::rendering::batch_renderer::MaterialId(0),
            ),
            buffer_offset_in_float4: 18,
            instance_offset: 2,
            instance_count: 2,
        };

        assert_eq!(batch.object_to_world_offset(), 22);
        assert_eq!(batch.world_to_object_offset(), 28);
        assert_eq!(batch.color_offset(), 34);
        assert_eq!(batch.end_offset(), 36);
        assert_eq!(batch.instance_range(), 2..4);
    }
}
