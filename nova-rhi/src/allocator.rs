use crate::error::{RhiError, RhiResult};

#[cfg(feature = "vulkan")]
use ash::vk;

/// A single `VkDeviceMemory` block the allocator sub-allocates linearly out
/// of. Blocks are never defragmented or shrunk; once a block is exhausted the
/// allocator opens a new one.
pub struct MemoryBlock {
    #[cfg(feature = "vulkan")]
    pub(crate) memory: vk::DeviceMemory,
    pub size: u64,
    pub cursor: u64,
    pub memory_type_index: u32,
    pub host_visible: bool,
}

impl MemoryBlock {
    /// Bump-allocate `size` bytes aligned to `alignment` out of this block.
    /// Returns `None` if the remaining space can't satisfy the request; the
    /// caller should fall back to opening a new block.
    pub fn try_alloc(&mut self, size: u64, alignment: u64) -> Option<u64> {
        let aligned = (self.cursor + alignment - 1) & !(alignment - 1);
        if aligned + size > self.size {
            return None;
        }
        self.cursor = aligned + size;
        Some(aligned)
    }
}

/// Default block size new `MemoryBlock`s are created at; large enough to
/// amortize the `vkAllocateMemory` call count for the texture/buffer traffic
/// a single frame produces, small enough that a handful of unused blocks
/// doesn't waste meaningful VRAM.
pub const BLOCK_SIZE: u64 = 256 * 1024 * 1024;

pub struct Allocator {
    blocks: Vec<MemoryBlock>,
    #[cfg(feature = "vulkan")]
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl Allocator {
    #[cfg(feature = "vulkan")]
    pub fn new(memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            blocks: Vec::new(),
            memory_properties,
        }
    }

    #[cfg(feature = "vulkan")]
    pub fn find_memory_type(&self, type_bits: u32, prefer_device_local: bool) -> RhiResult<u32> {
        let wanted = if prefer_device_local {
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        } else {
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
        };
        for i in 0..self.memory_properties.memory_type_count {
            let supported = (type_bits & (1 << i)) != 0;
            let matches = self.memory_properties.memory_types[i as usize]
                .property_flags
                .contains(wanted);
            if supported && matches {
                return Ok(i);
            }
        }
        // Fall back to any supported type; better to allocate in the wrong
        // heap than fail resource creation outright.
        for i in 0..self.memory_properties.memory_type_count {
            if (type_bits & (1 << i)) != 0 {
                return Ok(i);
            }
        }
        Err(RhiError::ResourceAllocation {
            kind: "memory type",
            size: 0,
            reason: format!("no memory type matches type_bits {type_bits:#x}"),
        })
    }

    #[cfg(feature = "vulkan")]
    pub fn alloc(&mut self, device: &ash::Device, size: u64, alignment: u64, memory_type_index: u32, host_visible: bool) -> RhiResult<(usize, u64)> {
        for (idx, block) in self.blocks.iter_mut().enumerate() {
            if block.memory_type_index == memory_type_index {
                if let Some(offset) = block.try_alloc(size, alignment) {
                    return Ok((idx, offset));
                }
            }
        }
        let block_size = size.max(BLOCK_SIZE);
        let info = vk::MemoryAllocateInfo::default()
            .allocation_size(block_size)
            .memory_type_index(memory_type_index);
        let memory = unsafe { device.allocate_memory(&info, None) }.map_err(|e| RhiError::ResourceAllocation {
            kind: "device memory",
            size: block_size,
            reason: e.to_string(),
        })?;
        let mut block = MemoryBlock {
            memory,
            size: block_size,
            cursor: 0,
            memory_type_index,
            host_visible,
        };
        let offset = block.try_alloc(size, alignment).expect("fresh block must fit first allocation");
        self.blocks.push(block);
        Ok((self.blocks.len() - 1, offset))
    }

    #[cfg(feature = "vulkan")]
    pub fn block_memory(&self, index: usize) -> vk::DeviceMemory {
        self.blocks[index].memory
    }
}
