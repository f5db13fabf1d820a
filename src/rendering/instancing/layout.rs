//! Byte layout of a batch region:
//! `[4 float4 zero header][objectToWorld: N x 3 float4][worldToObject: N x 3 float4][color: N float4]`

use crate::error::{InstancingError, Result};

pub const SIZE_OF_PACKED_MATRIX: u32 = 4 * 4 * 3;
pub const SIZE_OF_FLOAT4: u32 = 4 * 4;
pub const BYTES_PER_INSTANCE: u32 = SIZE_OF_PACKED_MATRIX * 2 + SIZE_OF_FLOAT4;

pub const HEADER_FLOAT4_COUNT: u32 = 4;
pub const HEADER_BYTES: u32 = HEADER_FLOAT4_COUNT * SIZE_OF_FLOAT4;
/// Two packed matrices plus one color, in float4 units.
pub const INSTANCE_FLOAT4_COST: u32 = 2 * 3 + 1;

const WORD_SIZE: u32 = std::mem::size_of::<u32>() as u32;

pub(crate) fn align_up(value: u32, alignment: u32) -> Option<u32> {
    Some(value.checked_add(alignment - 1)? / alignment * alignment)
}

/// Byte size of `num_instances` instances plus `extra_bytes`, both rounded up to `alignment`.
pub fn size_for_instances(
    bytes_per_instance: u32,
    num_instances: u32,
    alignment: u32,
    extra_bytes: u32,
) -> Result<u32> {
    if alignment == 0 || !alignment.is_power_of_two() {
        return Err(InstancingError::InvalidAlignment(alignment));
    }

    let overflow = InstancingError::LayoutOverflow {
        bytes_per_instance,
        instances: num_instances,
        extra_bytes,
    };

    let bytes_per_instance = align_up(bytes_per_instance, alignment).ok_or(overflow.clone())?;
    let extra_bytes = align_up(extra_bytes, alignment).ok_or(overflow.clone())?;

    bytes_per_instance
        .checked_mul(num_instances)
        .and_then(|bytes| bytes.checked_add(extra_bytes))
        .ok_or(overflow)
}

/// Same as [`size_for_instances`] with 4 byte alignment, returned in 32-bit words.
pub fn count_for_instances(bytes_per_instance: u32, num_instances: u32, extra_bytes: u32) -> Result<u32> {
    Ok(size_for_instances(bytes_per_instance, num_instances, WORD_SIZE, extra_bytes)? / WORD_SIZE)
}

/// Instances that fit in one batch window after the zero header.
///
/// Batch strides are rounded up to `batch_alignment` bytes, so only the aligned part of
/// the window is usable.
pub fn max_instances_per_window(window_bytes: u32, batch_alignment: u32) -> Result<u32> {
    if batch_alignment < SIZE_OF_FLOAT4 || !batch_alignment.is_power_of_two() {
        return Err(InstancingError::InvalidAlignment(batch_alignment));
    }

    let window_float4 = window_bytes / batch_alignment * batch_alignment / SIZE_OF_FLOAT4;
    let max_instances = window_float4.saturating_sub(HEADER_FLOAT4_COUNT) / INSTANCE_FLOAT4_COST;

    if max_instances == 0 {
        return Err(InstancingError::WindowTooSmall { window_bytes });
    }

    Ok(max_instances)
}
