//! Growable descriptor set allocation.
//!
//! [`GrowableDescriptorAllocator`] keeps a chain of descriptor pools. Pools
//! that still have room sit on the ready list, pools that reported
//! exhaustion move to the full list. When no ready pool is left a new pool is
//! created, each one larger than the last by the growth factor until the
//! per-pool cap is reached. Resetting returns every pool to the ready list
//! without releasing memory.

use crate::device::DescriptorDevice;
use crate::error::{GpuError, Result};
use ash::vk;
use gestalt_core::DescriptorPoolConfig;

/// Relative share of one descriptor type in a pool.
///
/// A pool sized for `n` sets holds `ratio * n` descriptors of `descriptor_type`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSizeRatio {
    pub descriptor_type: vk::DescriptorType,
    pub ratio: f32,
}

impl PoolSizeRatio {
    pub const fn new(descriptor_type: vk::DescriptorType, ratio: f32) -> Self {
        Self {
            descriptor_type,
            ratio,
        }
    }
}

/// Descriptor set allocator that grows by chaining new pools.
pub trait DescriptorAllocatorGrowable {
    /// Create the first pool. Must be called once before any allocation.
    fn init(
        &mut self,
        device: &dyn DescriptorDevice,
        initial_sets: u32,
        pool_ratios: &[PoolSizeRatio],
    ) -> Result<()>;

    /// Allocate one set for `layout`.
    ///
    /// A single entry in `variable_descriptor_counts` sets the size of the
    /// layout's trailing variable-count binding.
    fn allocate(
        &mut self,
        device: &dyn DescriptorDevice,
        layout: vk::DescriptorSetLayout,
        variable_descriptor_counts: &[u32],
    ) -> Result<vk::DescriptorSet>;

    /// Reset every pool, invalidating all sets allocated so far. Pool memory is kept.
    fn clear_pools(&mut self, device: &dyn DescriptorDevice) -> Result<()>;

    /// Destroy every pool. The allocator must be initialized again before reuse.
    fn destroy_pools(&mut self, device: &dyn DescriptorDevice);
}

/// Growth settings of a [`GrowableDescriptorAllocator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllocatorConfig {
    pub growth_factor: f32,
    pub max_sets_per_pool: u32,
    /// Hard cap on the number of pools, `None` for unbounded growth.
    pub max_pools: Option<usize>,
    /// When false, allocation fails once the initial pool is full.
    pub growth_enabled: bool,
    pub pool_flags: vk::DescriptorPoolCreateFlags,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::from(&DescriptorPoolConfig::default())
    }
}

impl From<&DescriptorPoolConfig> for AllocatorConfig {
    fn from(config: &DescriptorPoolConfig) -> Self {
        Self {
            growth_factor: config.growth_factor,
            max_sets_per_pool: config.max_sets_per_pool,
            max_pools: config.max_pools,
            growth_enabled: true,
            pool_flags: vk::DescriptorPoolCreateFlags::empty(),
        }
    }
}

impl AllocatorConfig {
    #[must_use]
    pub const fn with_max_pools(mut self, max_pools: usize) -> Self {
        self.max_pools = Some(max_pools);
        self
    }

    #[must_use]
    pub const fn without_growth(mut self) -> Self {
        self.growth_enabled = false;
        self
    }

    #[must_use]
    pub const fn with_pool_flags(mut self, flags: vk::DescriptorPoolCreateFlags) -> Self {
        self.pool_flags = flags;
        self
    }

    /// Set count of the pool created after one of `sets` sets.
    fn next_pool_size(&self, sets: u32) -> u32 {
        let grown = (sets as f32 * self.growth_factor) as u32;
        grown.clamp(1, self.max_sets_per_pool.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AllocatorState {
    Uninitialized,
    Ready,
}

/// Growable descriptor allocator backed by a chain of pools.
#[derive(Debug)]
pub struct GrowableDescriptorAllocator {
    config: AllocatorConfig,
    state: AllocatorState,
    ratios: Vec<PoolSizeRatio>,
    ready_pools: Vec<vk::DescriptorPool>,
    full_pools: Vec<vk::DescriptorPool>,
    sets_per_pool: u32,
}

impl Default for GrowableDescriptorAllocator {
    fn default() -> Self {
        Self::new(AllocatorConfig::default())
    }
}

impl GrowableDescriptorAllocator {
    pub const fn new(config: AllocatorConfig) -> Self {
        Self {
            config,
            state: AllocatorState::Uninitialized,
            ratios: Vec::new(),
            ready_pools: Vec::new(),
            full_pools: Vec::new(),
            sets_per_pool: 0,
        }
    }

    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state == AllocatorState::Ready
    }

    /// Total number of live pools.
    pub fn pool_count(&self) -> usize {
        self.ready_pools.len() + self.full_pools.len()
    }

    pub fn ready_pool_count(&self) -> usize {
        self.ready_pools.len()
    }

    pub fn full_pool_count(&self) -> usize {
        self.full_pools.len()
    }

    /// Set count the next created pool will have.
    pub const fn next_pool_size(&self) -> u32 {
        self.sets_per_pool
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            AllocatorState::Ready => Ok(()),
            AllocatorState::Uninitialized => Err(GpuError::InvalidState(
                "descriptor allocator used before init".to_string(),
            )),
        }
    }

    fn create_pool(&self, device: &dyn DescriptorDevice, set_count: u32) -> Result<vk::DescriptorPool> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = self
            .ratios
            .iter()
            .map(|r| vk::DescriptorPoolSize {
                ty: r.descriptor_type,
                descriptor_count: ((r.ratio * set_count as f32) as u32).max(1),
            })
            .collect();

        let pool = device.create_descriptor_pool(set_count, &pool_sizes, self.config.pool_flags)?;
        tracing::debug!(
            "Created descriptor pool with {} sets ({} pools live)",
            set_count,
            self.pool_count() + 1
        );
        Ok(pool)
    }

    /// Take a pool to allocate from. A just-created pool comes with its set count.
    fn acquire_pool(
        &mut self,
        device: &dyn DescriptorDevice,
    ) -> Result<(vk::DescriptorPool, Option<u32>)> {
        if let Some(pool) = self.ready_pools.pop() {
            return Ok((pool, None));
        }

        if !self.config.growth_enabled {
            return Err(GpuError::PoolExhausted(format!(
                "growth disabled and all {} pools are full",
                self.pool_count()
            )));
        }
        if let Some(max_pools) = self.config.max_pools {
            if self.pool_count() >= max_pools {
                tracing::warn!("Descriptor pool cap of {} reached", max_pools);
                return Err(GpuError::PoolExhausted(format!(
                    "pool cap of {max_pools} reached"
                )));
            }
        }

        let sets = self.sets_per_pool;
        let pool = self.create_pool(device, sets)?;
        let next = self.config.next_pool_size(sets);
        if next == self.config.max_sets_per_pool && sets != next {
            tracing::debug!(
                "Descriptor pool size reached the cap of {} sets",
                self.config.max_sets_per_pool
            );
        }
        self.sets_per_pool = next;
        Ok((pool, Some(sets)))
    }
}

impl DescriptorAllocatorGrowable for GrowableDescriptorAllocator {
    fn init(
        &mut self,
        device: &dyn DescriptorDevice,
        initial_sets: u32,
        pool_ratios: &[PoolSizeRatio],
    ) -> Result<()> {
        if self.state == AllocatorState::Ready {
            return Err(GpuError::InvalidState(
                "descriptor allocator initialized twice".to_string(),
            ));
        }
        if initial_sets == 0 {
            return Err(GpuError::InvalidLayout(
                "initial set count must be non-zero".to_string(),
            ));
        }
        if pool_ratios.is_empty() {
            return Err(GpuError::InvalidLayout(
                "at least one pool size ratio is required".to_string(),
            ));
        }
        if let Some(bad) = pool_ratios
            .iter()
            .find(|r| !r.ratio.is_finite() || r.ratio <= 0.0)
        {
            return Err(GpuError::InvalidLayout(format!(
                "pool size ratio for {:?} must be positive, got {}",
                bad.descriptor_type, bad.ratio
            )));
        }

        self.ratios = pool_ratios.to_vec();
        let pool = self.create_pool(device, initial_sets)?;
        self.ready_pools.push(pool);
        // the first pool created on demand is already larger
        self.sets_per_pool = self.config.next_pool_size(initial_sets);
        self.state = AllocatorState::Ready;
        Ok(())
    }

    fn allocate(
        &mut self,
        device: &dyn DescriptorDevice,
        layout: vk::DescriptorSetLayout,
        variable_descriptor_counts: &[u32],
    ) -> Result<vk::DescriptorSet> {
        self.ensure_ready()?;
        if layout == vk::DescriptorSetLayout::null() {
            return Err(GpuError::InvalidLayout(
                "cannot allocate a set for a null layout".to_string(),
            ));
        }
        if variable_descriptor_counts.len() > 1 {
            return Err(GpuError::InvalidLayout(format!(
                "one variable descriptor count per set expected, got {}",
                variable_descriptor_counts.len()
            )));
        }
        let variable_count = variable_descriptor_counts.first().copied();

        // Every ready pool gets one attempt. Only an empty pool that cannot
        // hold the set, or a refusal to grow, ends the search.
        let (mut pool, mut fresh) = self.acquire_pool(device)?;
        loop {
            match device.allocate_descriptor_set(pool, layout, variable_count) {
                Ok(set) => {
                    self.ready_pools.push(pool);
                    return Ok(set);
                }
                Err(e) if e.is_pool_out_of_memory() => {
                    if let Some(sets) = fresh {
                        self.ready_pools.push(pool);
                        return Err(GpuError::PoolExhausted(format!(
                            "set does not fit into an empty pool of {sets} sets"
                        )));
                    }
                    self.full_pools.push(pool);
                    (pool, fresh) = self.acquire_pool(device)?;
                }
                Err(e) => {
                    self.ready_pools.push(pool);
                    return Err(e);
                }
            }
        }
    }

    fn clear_pools(&mut self, device: &dyn DescriptorDevice) -> Result<()> {
        for &pool in &self.ready_pools {
            device.reset_descriptor_pool(pool)?;
        }
        // a pool leaves the full list only once its reset went through
        while let Some(&pool) = self.full_pools.last() {
            device.reset_descriptor_pool(pool)?;
            self.full_pools.pop();
            self.ready_pools.push(pool);
        }
        Ok(())
    }

    fn destroy_pools(&mut self, device: &dyn DescriptorDevice) {
        for pool in self.ready_pools.drain(..).chain(self.full_pools.drain(..)) {
            device.destroy_descriptor_pool(pool);
        }
        self.ratios.clear();
        self.sets_per_pool = 0;
        self.state = AllocatorState::Uninitialized;
    }
}

impl Drop for GrowableDescriptorAllocator {
    fn drop(&mut self) {
        if self.pool_count() > 0 {
            tracing::warn!(
                "Descriptor allocator dropped with {} live pools, call destroy_pools first",
                self.pool_count()
            );
        }
    }
}
