//! Gestalt headless runner
//!
//! Creates a Vulkan device without a surface, builds a small scene and runs
//! the descriptor binding path for a few frames: layouts, growable pool
//! allocation, per-frame and scene buffers, batched descriptor writes, pool
//! reset and teardown.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p gestalt-headless -- [CONFIG] [FRAMES]
//! ```
//!
//! `CONFIG` is a JSON engine configuration (default: `gestalt.json`, missing
//! files fall back to defaults). `FRAMES` is the number of frames to run
//! (default: 4).
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod scene;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use gestalt_core::limits::{MAX_MATERIALS, MAX_MESHES};
use gestalt_core::{EngineConfig, Extent, FrameProvider, FrameTimer, Frustum, MovementInput};
use gestalt_entity::{CameraComponent, TransformComponent};
use gestalt_gpu::ash::vk;
use gestalt_gpu::{
    AllocatorConfig, BatchedDescriptorWriter, DescriptorAllocatorGrowable, DescriptorBufferLayout,
    DescriptorBufferLayoutBuilder, DescriptorDevice, DescriptorSetLayoutBuilder, DescriptorWriter,
    GpuAllocator, GpuBuffer, GpuContext, GpuContextBuilder, GrowableDescriptorAllocator,
    PoolSizeRatio, PushConstantRanges, SamplerCache, SamplerConfig,
};
use gestalt_render::upload::{create_array_buffer, upload_slice};
use gestalt_render::{
    GpuMaterial, LightBuffers, LightPacker, MeshDrawBuffers, MeshDrawTable, PerFrameDataBuffers,
    PerFrameUniformBuffers,
};
use scene::{MeshComponent, Scene};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "gestalt.json";
const DEFAULT_FRAMES: u64 = 4;

/// Push constants of the mesh pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct MeshPushConstants {
    draw_offset: u32,
    draw_count: u32,
    material_offset: u32,
    _pad: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let frames = match args.next() {
        Some(arg) => arg
            .parse::<u64>()
            .with_context(|| format!("invalid frame count '{arg}'"))?,
        None => DEFAULT_FRAMES,
    };

    let config = EngineConfig::load_or_default(&config_path);
    info!("Starting {} ({frames} frames)", config.application_name);

    let context = GpuContextBuilder::from_config(&config)
        .build()
        .context("failed to create GPU context")?;

    run(&context, &config, frames)?;
    context.wait_idle()?;
    info!("Done");
    Ok(())
}

/// Descriptor set layouts used by the run.
struct Layouts {
    per_frame: vk::DescriptorSetLayout,
    scene: vk::DescriptorSetLayout,
}

fn scene_layout_builder(bindless: bool) -> DescriptorSetLayoutBuilder {
    let stages = vk::ShaderStageFlags::VERTEX
        | vk::ShaderStageFlags::FRAGMENT
        | vk::ShaderStageFlags::COMPUTE;
    let builder = DescriptorSetLayoutBuilder::new()
        .storage_buffer(0, stages)
        .storage_buffer(1, stages)
        .storage_buffer(2, stages)
        .storage_buffer(3, stages)
        .storage_buffer(4, stages)
        .storage_buffer(5, stages)
        .storage_buffer(6, stages);
    if bindless {
        builder.bindless(7, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stages)
    } else {
        builder
    }
}

fn run(context: &GpuContext, config: &EngineConfig, frames: u64) -> anyhow::Result<()> {
    let device = context.descriptor_device();
    let bindless = context.capabilities().supports_bindless();
    let extent = Extent::new(config.windowed_width, config.windowed_height);

    if let Some(support) = &context.capabilities().descriptor_buffer {
        let layout = describe_descriptor_buffer(support.sizes, support.offset_alignment)?;
        info!(
            "Scene descriptor buffer: {} bytes over {} bindings",
            layout.size(),
            layout.bindings().len()
        );
    }

    let push_constants = PushConstantRanges::new()
        .push::<MeshPushConstants>(vk::ShaderStageFlags::ALL_GRAPHICS)?;
    info!(
        "Push constants: {} bytes in {} ranges",
        push_constants.size(),
        push_constants.ranges().len()
    );

    let per_frame_builder =
        DescriptorSetLayoutBuilder::new().uniform_buffer(0, vk::ShaderStageFlags::ALL);
    let scene_builder = scene_layout_builder(bindless);

    let per_frame_layout = per_frame_builder.build(device)?;
    let scene_layout = match scene_builder.build(device) {
        Ok(layout) => layout,
        Err(e) => {
            device.destroy_descriptor_set_layout(per_frame_layout);
            return Err(e.into());
        }
    };
    let layouts = Layouts {
        per_frame: per_frame_layout,
        scene: scene_layout,
    };

    let mut ratios = per_frame_builder.pool_ratios();
    ratios.extend(scene_builder.pool_ratios());
    // the bindless array is allocated with a single descriptor per set
    for ratio in &mut ratios {
        if ratio.descriptor_type == vk::DescriptorType::COMBINED_IMAGE_SAMPLER {
            *ratio = PoolSizeRatio::new(ratio.descriptor_type, 1.0);
        }
    }
    let mut allocator =
        GrowableDescriptorAllocator::new(AllocatorConfig::from(&config.descriptor_pool));
    let result = allocator
        .init(device, config.descriptor_pool.initial_sets, &ratios)
        .map_err(anyhow::Error::from)
        .and_then(|()| {
            run_frames(context, config, &mut allocator, &layouts, bindless, extent, frames)
        });

    allocator.destroy_pools(device);
    device.destroy_descriptor_set_layout(layouts.per_frame);
    device.destroy_descriptor_set_layout(layouts.scene);
    result
}

fn describe_descriptor_buffer(
    sizes: gestalt_gpu::DescriptorSizes,
    alignment: vk::DeviceSize,
) -> gestalt_gpu::Result<DescriptorBufferLayout> {
    let mut builder = DescriptorBufferLayoutBuilder::new(sizes, alignment);
    for binding in 0..7 {
        builder = builder.add_binding(binding, vk::DescriptorType::STORAGE_BUFFER, 1)?;
    }
    Ok(builder.build())
}

/// Host-visible buffers bound by the scene descriptor sets.
struct FrameResources {
    per_frame: PerFrameUniformBuffers,
    lights: LightBuffers,
    meshes: MeshDrawBuffers,
    materials: GpuBuffer,
}

impl FrameResources {
    fn new(allocator: &mut GpuAllocator, config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            per_frame: PerFrameUniformBuffers::new(allocator)?,
            lights: LightBuffers::new(allocator, &config.lights)?,
            meshes: MeshDrawBuffers::new(allocator, MAX_MESHES as usize)?,
            materials: create_array_buffer::<GpuMaterial>(
                allocator,
                MAX_MATERIALS as usize,
                vk::BufferUsageFlags::STORAGE_BUFFER,
                "Material Buffer",
            )?,
        })
    }

    /// Storage buffers in scene layout binding order.
    fn scene_bindings(&self) -> [&GpuBuffer; 7] {
        [
            &self.lights.directional,
            &self.lights.point,
            &self.lights.spot,
            &self.lights.view_projections,
            &self.meshes.draws,
            &self.meshes.task_commands,
            &self.materials,
        ]
    }

    fn destroy(mut self, allocator: &mut GpuAllocator) -> anyhow::Result<()> {
        allocator.free_buffer(&mut self.materials)?;
        self.per_frame.destroy(allocator)?;
        self.lights.destroy(allocator)?;
        self.meshes.destroy(allocator)?;
        Ok(())
    }
}

fn run_frames(
    context: &GpuContext,
    config: &EngineConfig,
    allocator: &mut GrowableDescriptorAllocator,
    layouts: &Layouts,
    bindless: bool,
    extent: Extent,
    frames: u64,
) -> anyhow::Result<()> {
    let device = context.descriptor_device();
    let mut gpu_allocator = context.allocator().lock();
    let resources = FrameResources::new(&mut gpu_allocator, config)?;

    let mut samplers = SamplerCache::new();
    let result = unsafe { samplers.get_or_create_on(device.device(), &SamplerConfig::default()) }
        .map_err(anyhow::Error::from)
        .and_then(|sampler| {
            info!("Sampler cache holds {} samplers ({sampler:?})", samplers.len());
            record_frames(
                context, config, allocator, layouts, &resources, bindless, extent, frames,
            )
        });

    samplers.destroy_all(|sampler| unsafe { device.device().destroy_sampler(sampler, None) });
    resources.destroy(&mut gpu_allocator)?;
    result
}

#[allow(clippy::too_many_arguments)]
fn record_frames(
    context: &GpuContext,
    config: &EngineConfig,
    allocator: &mut GrowableDescriptorAllocator,
    layouts: &Layouts,
    resources: &FrameResources,
    bindless: bool,
    extent: Extent,
    frames: u64,
) -> anyhow::Result<()> {
    let device = context.descriptor_device();
    let mut scene = Scene::build(extent);
    let mut per_frame = PerFrameDataBuffers::new();
    let mut lights = LightPacker::new(config.lights);
    let mut draws = MeshDrawTable::default();
    let mut writer = BatchedDescriptorWriter::new();
    let mut frame_provider = FrameProvider::new();
    let mut timer = FrameTimer::new();
    let input = MovementInput {
        forward: true,
        ..MovementInput::default()
    };

    for _ in 0..frames {
        let frame = frame_provider.current_frame_index();
        let delta = timer.tick();
        scene.update(delta, &input, extent);

        // every set of the previous frame pair is released at once
        if frame == 0 {
            allocator.clear_pools(device)?;
        }

        let camera = {
            let camera = scene
                .world
                .get::<&CameraComponent>(scene.camera)
                .map_err(|e| anyhow::anyhow!("camera entity: {e}"))?;
            CameraComponent::clone(&camera)
        };
        let frame_data = *per_frame.update_from_camera(frame, &camera)?;
        resources.per_frame.upload(frame, &per_frame)?;

        let counts = lights.pack(&mut scene.world, frame_data.inv_view_proj());
        resources.lights.upload(&lights)?;

        draws.clear();
        for (_, (transform, mesh)) in scene
            .world
            .query_mut::<(&TransformComponent, &MeshComponent)>()
        {
            draws.push(transform, &mesh.surface)?;
        }
        let frustum = Frustum::from_matrix(camera.projection_matrix * camera.view_matrix);
        let commands = draws.task_commands(&frustum);
        resources.meshes.upload(&draws, &commands)?;

        let materials: Vec<GpuMaterial> = scene
            .materials
            .iter_mut()
            .map(|m| {
                m.is_dirty = false;
                GpuMaterial::from(&m.config)
            })
            .collect();
        upload_slice("materials", &resources.materials, &materials)?;

        let per_frame_set = allocator.allocate(device, layouts.per_frame, &[])?;
        let variable_counts: &[u32] = if bindless { &[1] } else { &[] };
        let scene_set = allocator.allocate(device, layouts.scene, variable_counts)?;

        let frame_buffer = resources.per_frame.buffer(frame)?;
        writer.write_buffer(
            0,
            frame_buffer.buffer,
            frame_buffer.size,
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
        );
        writer.update_set(device, per_frame_set)?;
        writer.clear();

        for (binding, buffer) in resources.scene_bindings().iter().enumerate() {
            let info = buffer.descriptor_info();
            writer.write_buffer(
                binding as u32,
                info.buffer,
                info.range,
                info.offset,
                vk::DescriptorType::STORAGE_BUFFER,
            );
        }
        writer.update_set(device, scene_set)?;
        writer.clear();

        info!(
            "Frame {} (slot {frame}): {} draws, {} visible, {} directional / {} point / {} spot lights, {} pools",
            frame_provider.current_frame_number(),
            draws.len(),
            commands.len(),
            counts.directional,
            counts.point,
            counts.spot,
            allocator.pool_count()
        );
        frame_provider.advance();
    }
    Ok(())
}
