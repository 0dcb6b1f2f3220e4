//! In-memory [`DescriptorDevice`] for unit tests.
//!
//! Pools enforce their set and per-type descriptor budgets, and sets keep the
//! contents of every array element so tests can inspect what an update wrote.

use crate::device::{DescriptorDevice, DescriptorWrite, LayoutBinding, WriteResources};
use crate::error::{GpuError, Result};
use ash::vk::{self, Handle};
use std::cell::RefCell;
use std::collections::HashMap;

/// Contents of one descriptor array element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDescriptor {
    Image {
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    },
    Buffer {
        buffer: vk::Buffer,
        offset: u64,
        range: u64,
    },
}

#[derive(Debug)]
struct MockPool {
    max_sets: u32,
    budget: HashMap<vk::DescriptorType, u32>,
    used: HashMap<vk::DescriptorType, u32>,
    sets: Vec<u64>,
}

#[derive(Debug)]
struct MockSet {
    bindings: HashMap<u32, Vec<Option<MockDescriptor>>>,
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: u64,
    layouts: HashMap<u64, Vec<LayoutBinding>>,
    pools: HashMap<u64, MockPool>,
    sets: HashMap<u64, MockSet>,
    created_pool_sizes: Vec<u32>,
    update_calls: usize,
    resets: usize,
    failing_reset: Option<usize>,
}

impl MockState {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

#[derive(Debug, Default)]
pub struct MockDescriptorDevice {
    state: RefCell<MockState>,
}

impl MockDescriptorDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layout without going through a builder.
    pub fn layout(&self, bindings: &[LayoutBinding]) -> vk::DescriptorSetLayout {
        self.create_descriptor_set_layout(bindings, vk::DescriptorSetLayoutCreateFlags::empty())
            .unwrap()
    }

    /// Layout with a single binding of `count` descriptors of `ty`.
    pub fn simple_layout(&self, ty: vk::DescriptorType, count: u32) -> vk::DescriptorSetLayout {
        self.layout(&[LayoutBinding {
            binding: 0,
            descriptor_type: ty,
            descriptor_count: count,
            stage_flags: vk::ShaderStageFlags::ALL,
            variable_count: false,
        }])
    }

    pub fn live_pools(&self) -> usize {
        self.state.borrow().pools.len()
    }

    /// `max_sets` of every pool created so far, in creation order.
    pub fn created_pool_sizes(&self) -> Vec<u32> {
        self.state.borrow().created_pool_sizes.clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state.borrow().update_calls
    }

    pub fn resets(&self) -> usize {
        self.state.borrow().resets
    }

    /// Make the reset call with the given 1-based number fail with device loss.
    pub fn fail_reset(&self, call: usize) {
        self.state.borrow_mut().failing_reset = Some(call);
    }

    pub fn live_sets(&self) -> usize {
        self.state.borrow().sets.len()
    }

    /// Array contents of one binding of a set.
    pub fn contents(&self, set: vk::DescriptorSet, binding: u32) -> Vec<Option<MockDescriptor>> {
        self.state.borrow().sets[&set.as_raw()].bindings[&binding].clone()
    }
}

impl DescriptorDevice for MockDescriptorDevice {
    fn create_descriptor_set_layout(
        &self,
        bindings: &[LayoutBinding],
        _flags: vk::DescriptorSetLayoutCreateFlags,
    ) -> Result<vk::DescriptorSetLayout> {
        let mut state = self.state.borrow_mut();
        let handle = state.next();
        state.layouts.insert(handle, bindings.to_vec());
        Ok(vk::DescriptorSetLayout::from_raw(handle))
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.state.borrow_mut().layouts.remove(&layout.as_raw());
    }

    fn create_descriptor_pool(
        &self,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        _flags: vk::DescriptorPoolCreateFlags,
    ) -> Result<vk::DescriptorPool> {
        let mut state = self.state.borrow_mut();
        let handle = state.next();
        let mut budget = HashMap::new();
        for size in pool_sizes {
            *budget.entry(size.ty).or_insert(0) += size.descriptor_count;
        }
        state.pools.insert(
            handle,
            MockPool {
                max_sets,
                budget,
                used: HashMap::new(),
                sets: Vec::new(),
            },
        );
        state.created_pool_sizes.push(max_sets);
        Ok(vk::DescriptorPool::from_raw(handle))
    }

    fn reset_descriptor_pool(&self, pool: vk::DescriptorPool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.resets += 1;
        if state.failing_reset == Some(state.resets) {
            return Err(GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
        }
        let freed = {
            let pool = state
                .pools
                .get_mut(&pool.as_raw())
                .ok_or(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN))?;
            pool.used.clear();
            std::mem::take(&mut pool.sets)
        };
        for set in freed {
            state.sets.remove(&set);
        }
        Ok(())
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        let mut state = self.state.borrow_mut();
        if let Some(pool) = state.pools.remove(&pool.as_raw()) {
            for set in pool.sets {
                state.sets.remove(&set);
            }
        }
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
        variable_descriptor_count: Option<u32>,
    ) -> Result<vk::DescriptorSet> {
        let mut state = self.state.borrow_mut();
        let mut bindings = state
            .layouts
            .get(&layout.as_raw())
            .cloned()
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN))?;

        if let (Some(count), Some(last)) = (variable_descriptor_count, bindings.last_mut()) {
            last.descriptor_count = count;
        }

        let mut needed: HashMap<vk::DescriptorType, u32> = HashMap::new();
        for b in &bindings {
            *needed.entry(b.descriptor_type).or_insert(0) += b.descriptor_count;
        }

        let handle = state.next();
        let mock_pool = state
            .pools
            .get_mut(&pool.as_raw())
            .ok_or(GpuError::Vulkan(vk::Result::ERROR_UNKNOWN))?;

        let fits = mock_pool.sets.len() < mock_pool.max_sets as usize
            && needed.iter().all(|(ty, count)| {
                mock_pool.used.get(ty).copied().unwrap_or(0) + count
                    <= mock_pool.budget.get(ty).copied().unwrap_or(0)
            });
        if !fits {
            return Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY));
        }

        for (ty, count) in needed {
            *mock_pool.used.entry(ty).or_insert(0) += count;
        }
        mock_pool.sets.push(handle);

        let contents = bindings
            .iter()
            .map(|b| (b.binding, vec![None; b.descriptor_count as usize]))
            .collect();
        state.sets.insert(handle, MockSet { bindings: contents });

        Ok(vk::DescriptorSet::from_raw(handle))
    }

    fn update_descriptor_set(&self, set: vk::DescriptorSet, writes: &[DescriptorWrite]) {
        let mut state = self.state.borrow_mut();
        state.update_calls += 1;
        let mock_set = state
            .sets
            .get_mut(&set.as_raw())
            .expect("update of a set that is not allocated");

        for write in writes {
            let elements = mock_set
                .bindings
                .get_mut(&write.binding)
                .expect("write to a binding missing from the layout");
            let descriptors: Vec<MockDescriptor> = match &write.resources {
                WriteResources::Images(infos) => infos
                    .iter()
                    .map(|i| MockDescriptor::Image {
                        view: i.image_view,
                        sampler: i.sampler,
                        layout: i.image_layout,
                    })
                    .collect(),
                WriteResources::Buffers(infos) => infos
                    .iter()
                    .map(|b| MockDescriptor::Buffer {
                        buffer: b.buffer,
                        offset: b.offset,
                        range: b.range,
                    })
                    .collect(),
            };
            for (i, descriptor) in descriptors.into_iter().enumerate() {
                elements[write.array_element as usize + i] = Some(descriptor);
            }
        }
    }
}
