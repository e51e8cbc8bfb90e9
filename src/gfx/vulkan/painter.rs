//! egui 的 Vulkan 绘制器
//!
//! 把 egui 的三角形列表画进交换链的渲染通道：
//! - 管线：顶点 20 字节（位置 2×f32、UV 2×f32、颜色 4×u8），预乘 alpha 混合，
//!   8 字节推送常量保存以点为单位的屏幕尺寸
//! - 纹理：R8G8B8A8_UNORM，经暂存缓冲上传，每个纹理一个描述符集
//! - 网格缓冲：每个交换链图像一组主机可见缓冲，不够时按 2 的幂扩容
//!
//! 纹理上传和释放都会等待队列空闲，egui 只在字体图集变化时才更新纹理。

use std::collections::HashMap;
use std::ffi::CStr;

use ash::vk;
use egui::epaint::{ClippedPrimitive, ImageDelta, Primitive, TextureId, Vertex};
use egui::{ImageData, TextureFilter};
use tracing::{debug, info, warn};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::shader;

use super::context::{vk_error, VulkanContext};

const GUI_SHADER: &str = include_str!("shaders/gui.wgsl");

/// egui 顶点大小
pub const VERTEX_STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

/// 推送常量：以点为单位的屏幕宽高
const PUSH_CONSTANT_SIZE: u32 = 8;

const INITIAL_VERTEX_BUFFER_SIZE: u64 = 64 * 1024;
const INITIAL_INDEX_BUFFER_SIZE: u64 = 32 * 1024;

/// 查找满足类型位和属性要求的内存类型
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..properties.memory_type_count).find(|&i| {
        type_bits & (1 << i) != 0 && properties.memory_types[i as usize].property_flags.contains(flags)
    })
}

/// 缓冲区扩容后的大小
pub fn grown_buffer_size(current: u64, required: u64) -> u64 {
    if required <= current {
        current
    } else {
        required.next_power_of_two()
    }
}

/// 裁剪矩形（点）转换为剪刀矩形（像素），裁剪到帧缓冲区以内
///
/// 结果为空时返回 `None`。
pub fn scissor_rect(clip_rect: egui::Rect, pixels_per_point: f32, extent: vk::Extent2D) -> Option<vk::Rect2D> {
    let min_x = (clip_rect.min.x * pixels_per_point).round().clamp(0.0, extent.width as f32) as u32;
    let min_y = (clip_rect.min.y * pixels_per_point).round().clamp(0.0, extent.height as f32) as u32;
    let max_x = (clip_rect.max.x * pixels_per_point).round().clamp(min_x as f32, extent.width as f32) as u32;
    let max_y = (clip_rect.max.y * pixels_per_point).round().clamp(min_y as f32, extent.height as f32) as u32;

    if max_x == min_x || max_y == min_y {
        return None;
    }

    Some(vk::Rect2D {
        offset: vk::Offset2D {
            x: min_x as i32,
            y: min_y as i32,
        },
        extent: vk::Extent2D {
            width: max_x - min_x,
            height: max_y - min_y,
        },
    })
}

/// 纹理像素展开为 RGBA8 字节
pub fn image_delta_bytes(image: &ImageData) -> Vec<u8> {
    match image {
        ImageData::Color(color) => color.pixels.iter().flat_map(|c| c.to_array()).collect(),
        ImageData::Font(font) => font.srgba_pixels(None).flat_map(|c| c.to_array()).collect(),
    }
}

/// 带内存的缓冲区
struct AllocatedBuffer {
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: u64,
}

/// 一个交换链图像使用的网格缓冲
#[derive(Default)]
struct MeshBuffers {
    vertex: Option<AllocatedBuffer>,
    index: Option<AllocatedBuffer>,
}

/// 已上传的 GUI 纹理
struct GuiTexture {
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    descriptor_set: vk::DescriptorSet,
    size: [usize; 2],
}

/// egui 的 Vulkan 绘制器
pub struct EguiPainter {
    device: ash::Device,
    queue: vk::Queue,
    descriptor_pool: vk::DescriptorPool,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    upload_pool: vk::CommandPool,
    set_layout: vk::DescriptorSetLayout,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    sampler_linear: vk::Sampler,
    sampler_nearest: vk::Sampler,
    textures: HashMap<TextureId, GuiTexture>,
    mesh_buffers: Vec<MeshBuffers>,
}

impl EguiPainter {
    /// 编译 GUI 着色器并为 `render_pass` 创建管线
    pub fn new(ctx: &VulkanContext, render_pass: vk::RenderPass) -> Result<Self> {
        let device = ctx.device.clone();

        let mut painter = Self {
            device,
            queue: ctx.queue,
            descriptor_pool: ctx.descriptor_pool,
            memory_properties: ctx.memory_properties,
            upload_pool: vk::CommandPool::null(),
            set_layout: vk::DescriptorSetLayout::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            sampler_linear: vk::Sampler::null(),
            sampler_nearest: vk::Sampler::null(),
            textures: HashMap::new(),
            mesh_buffers: Vec::new(),
        };

        // 中途失败时 destroy() 只会释放已经创建的对象
        if let Err(e) = painter.create_objects(ctx.queue_family, render_pass) {
            painter.destroy();
            return Err(e);
        }

        info!("egui painter has been bound to the Vulkan backend");
        Ok(painter)
    }

    fn create_objects(&mut self, queue_family: u32, render_pass: vk::RenderPass) -> Result<()> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(queue_family);
        self.upload_pool =
            unsafe { self.device.create_command_pool(&pool_info, None) }.map_err(vk_error("vkCreateCommandPool"))?;

        self.sampler_linear = self.create_sampler(vk::Filter::LINEAR)?;
        self.sampler_nearest = self.create_sampler(vk::Filter::NEAREST)?;

        let bindings = [
            vk::DescriptorSetLayoutBinding::builder()
                .binding(0)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(1)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
        ];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);
        self.set_layout = unsafe { self.device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(vk_error("vkCreateDescriptorSetLayout"))?;

        let push_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: PUSH_CONSTANT_SIZE,
        }];
        let set_layouts = [self.set_layout];
        let pipeline_layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_ranges);
        self.pipeline_layout = unsafe { self.device.create_pipeline_layout(&pipeline_layout_info, None) }
            .map_err(vk_error("vkCreatePipelineLayout"))?;

        self.pipeline = self.create_pipeline(render_pass)?;
        Ok(())
    }

    fn create_sampler(&self, filter: vk::Filter) -> Result<vk::Sampler> {
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .min_lod(-1000.0)
            .max_lod(1000.0)
            .max_anisotropy(1.0);
        unsafe { self.device.create_sampler(&info, None) }.map_err(vk_error("vkCreateSampler"))
    }

    fn create_pipeline(&self, render_pass: vk::RenderPass) -> Result<vk::Pipeline> {
        let code = shader::wgsl_to_spirv("gui shader", GUI_SHADER)?;
        let module_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { self.device.create_shader_module(&module_info, None) }.map_err(|e| {
            GraphicsError::ShaderCompilation {
                stage: "gui shader".to_string(),
                log: format!("vkCreateShaderModule: {:?}", e),
            }
        })?;

        let vs_entry = entry_point(b"vs_main\0")?;
        let fs_entry = entry_point(b"fs_main\0")?;

        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(module)
                .name(vs_entry)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(module)
                .name(fs_entry)
                .build(),
        ];

        let vertex_bindings = [vk::VertexInputBindingDescription {
            binding: 0,
            stride: VERTEX_STRIDE,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let vertex_attributes = [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: 8,
            },
            vk::VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: vk::Format::R8G8B8A8_UNORM,
                offset: 16,
            },
        ];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly =
            vk::PipelineInputAssemblyStateCreateInfo::builder().topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample =
            vk::PipelineMultisampleStateCreateInfo::builder().rasterization_samples(vk::SampleCountFlags::TYPE_1);

        // 顶点颜色和纹理都是预乘 alpha
        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::ONE)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_DST_ALPHA)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE)
            .alpha_blend_op(vk::BlendOp::ADD)
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .build()];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder().attachments(&blend_attachments);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder();

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(self.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0)
            .build();

        let result = unsafe {
            self.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        unsafe { self.device.destroy_shader_module(module, None) };

        let pipelines = result.map_err(|(_, e)| GraphicsError::ShaderCompilation {
            stage: "gui pipeline".to_string(),
            log: format!("vkCreateGraphicsPipelines: {:?}", e),
        })?;

        debug!("GUI pipeline created");
        pipelines
            .into_iter()
            .next()
            .ok_or_else(|| GraphicsError::ResourceCreation("No GUI pipeline was created".to_string()).into())
    }

    /// 应用纹理更新：整幅更新创建新纹理，带位置的更新写入已有纹理的子区域
    pub fn set_texture(&mut self, id: TextureId, delta: &ImageDelta) -> Result<()> {
        let size = delta.image.size();
        if size[0] == 0 || size[1] == 0 {
            return Ok(());
        }
        let pixels = image_delta_bytes(&delta.image);

        match delta.pos {
            Some(pos) => {
                let Some(texture) = self.textures.get(&id) else {
                    warn!("Partial update for unknown GUI texture {:?}", id);
                    return Ok(());
                };
                if pos[0] + size[0] > texture.size[0] || pos[1] + size[1] > texture.size[1] {
                    warn!("Partial update of GUI texture {:?} is out of bounds", id);
                    return Ok(());
                }
                let image = texture.image;
                self.upload(image, &pixels, pos, size, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;
            }
            None => {
                let filter = match delta.options.magnification {
                    TextureFilter::Nearest => vk::Filter::NEAREST,
                    TextureFilter::Linear => vk::Filter::LINEAR,
                };
                let texture = self.create_texture(size, filter)?;
                if let Err(e) = self.upload(texture.image, &pixels, [0, 0], size, vk::ImageLayout::UNDEFINED) {
                    self.destroy_texture(texture);
                    return Err(e);
                }
                if let Some(old) = self.textures.insert(id, texture) {
                    self.wait_queue_idle();
                    self.destroy_texture(old);
                }
                debug!("GUI texture {:?} uploaded: {}x{}", id, size[0], size[1]);
            }
        }
        Ok(())
    }

    /// 释放纹理，等待队列空闲后销毁
    pub fn free_texture(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.remove(&id) {
            self.wait_queue_idle();
            self.destroy_texture(texture);
            debug!("GUI texture {:?} freed", id);
        }
    }

    /// 已上传的纹理数量
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn wait_queue_idle(&self) {
        if let Err(e) = unsafe { self.device.queue_wait_idle(self.queue) } {
            warn!("vkQueueWaitIdle failed: {:?}", e);
        }
    }

    fn create_texture(&self, size: [usize; 2], filter: vk::Filter) -> Result<GuiTexture> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_UNORM)
            .extent(vk::Extent3D {
                width: size[0] as u32,
                height: size[1] as u32,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let image = unsafe { self.device.create_image(&image_info, None) }.map_err(vk_error("vkCreateImage"))?;

        let requirements = unsafe { self.device.get_image_memory_requirements(image) };
        let memory = match self.allocate(requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let mut texture = GuiTexture {
            image,
            memory,
            view: vk::ImageView::null(),
            descriptor_set: vk::DescriptorSet::null(),
            size,
        };

        let bound = unsafe { self.device.bind_image_memory(image, memory, 0) }.map_err(vk_error("vkBindImageMemory"));
        if let Err(e) = bound.and_then(|_| self.finish_texture(&mut texture, filter)) {
            self.destroy_texture(texture);
            return Err(e);
        }
        Ok(texture)
    }

    fn finish_texture(&self, texture: &mut GuiTexture, filter: vk::Filter) -> Result<()> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(texture.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(vk::Format::R8G8B8A8_UNORM)
            .subresource_range(color_subresource_range());
        texture.view =
            unsafe { self.device.create_image_view(&view_info, None) }.map_err(vk_error("vkCreateImageView"))?;

        let set_layouts = [self.set_layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&set_layouts);
        texture.descriptor_set = unsafe { self.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(vk_error("vkAllocateDescriptorSets"))?
            .into_iter()
            .next()
            .ok_or_else(|| GraphicsError::ResourceCreation("No descriptor set was allocated".to_string()))?;

        let sampler = if filter == vk::Filter::NEAREST {
            self.sampler_nearest
        } else {
            self.sampler_linear
        };

        let image_info = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: texture.view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let sampler_info = [vk::DescriptorImageInfo {
            sampler,
            image_view: vk::ImageView::null(),
            image_layout: vk::ImageLayout::UNDEFINED,
        }];
        let writes = [
            vk::WriteDescriptorSet::builder()
                .dst_set(texture.descriptor_set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .image_info(&image_info)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_set(texture.descriptor_set)
                .dst_binding(1)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .image_info(&sampler_info)
                .build(),
        ];
        unsafe { self.device.update_descriptor_sets(&writes, &[]) };
        Ok(())
    }

    /// 通过暂存缓冲把像素复制进图像，完成后图像处于着色器只读布局
    fn upload(
        &self,
        image: vk::Image,
        pixels: &[u8],
        pos: [usize; 2],
        size: [usize; 2],
        old_layout: vk::ImageLayout,
    ) -> Result<()> {
        let staging = self.create_buffer(
            pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let result = self
            .write_buffer(&staging, 0, pixels)
            .and_then(|_| self.submit_copy(staging.buffer, image, pos, size, old_layout));

        self.destroy_buffer(staging);
        result
    }

    fn submit_copy(
        &self,
        buffer: vk::Buffer,
        image: vk::Image,
        pos: [usize; 2],
        size: [usize; 2],
        old_layout: vk::ImageLayout,
    ) -> Result<()> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.upload_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe { self.device.allocate_command_buffers(&alloc_info) }
            .map_err(vk_error("vkAllocateCommandBuffers"))?
            .into_iter()
            .next()
            .ok_or_else(|| GraphicsError::ResourceCreation("No command buffer was allocated".to_string()))?;

        let result = self.record_and_submit_copy(cmd, buffer, image, pos, size, old_layout);
        unsafe { self.device.free_command_buffers(self.upload_pool, &[cmd]) };
        result
    }

    fn record_and_submit_copy(
        &self,
        cmd: vk::CommandBuffer,
        buffer: vk::Buffer,
        image: vk::Image,
        pos: [usize; 2],
        size: [usize; 2],
        old_layout: vk::ImageLayout,
    ) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            self.device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(vk_error("vkBeginCommandBuffer"))?;

            let to_transfer = vk::ImageMemoryBarrier::builder()
                .old_layout(old_layout)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_access_mask(vk::AccessFlags::SHADER_READ)
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .build();
            self.device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let region = vk::BufferImageCopy::builder()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D {
                    x: pos[0] as i32,
                    y: pos[1] as i32,
                    z: 0,
                })
                .image_extent(vk::Extent3D {
                    width: size[0] as u32,
                    height: size[1] as u32,
                    depth: 1,
                })
                .build();
            self.device.cmd_copy_buffer_to_image(
                cmd,
                buffer,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            let to_shader = vk::ImageMemoryBarrier::builder()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .build();
            self.device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader],
            );

            self.device
                .end_command_buffer(cmd)
                .map_err(vk_error("vkEndCommandBuffer"))?;

            let command_buffers = [cmd];
            let submit = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();
            self.device
                .queue_submit(self.queue, &[submit], vk::Fence::null())
                .map_err(vk_error("vkQueueSubmit"))?;
            self.device
                .queue_wait_idle(self.queue)
                .map_err(vk_error("vkQueueWaitIdle"))?;
        }
        Ok(())
    }

    /// 把网格写入第 `slot` 组缓冲并录制绘制命令
    ///
    /// 必须在渲染通道内调用。
    pub fn paint(
        &mut self,
        cmd: vk::CommandBuffer,
        slot: usize,
        extent: vk::Extent2D,
        primitives: &[ClippedPrimitive],
        pixels_per_point: f32,
    ) -> Result<()> {
        if extent.width == 0 || extent.height == 0 || pixels_per_point <= 0.0 {
            return Ok(());
        }

        let meshes: Vec<(egui::Rect, &egui::Mesh)> = primitives
            .iter()
            .filter_map(|p| match &p.primitive {
                Primitive::Mesh(mesh) if !mesh.indices.is_empty() => Some((p.clip_rect, mesh)),
                Primitive::Mesh(_) => None,
                Primitive::Callback(_) => {
                    warn!("Paint callbacks are not supported by the Vulkan painter");
                    None
                }
            })
            .collect();
        if meshes.is_empty() {
            return Ok(());
        }

        let vertex_bytes: u64 = meshes
            .iter()
            .map(|(_, m)| (m.vertices.len() * VERTEX_STRIDE as usize) as u64)
            .sum();
        let index_bytes: u64 = meshes
            .iter()
            .map(|(_, m)| (m.indices.len() * std::mem::size_of::<u32>()) as u64)
            .sum();

        self.reserve_mesh_buffers(slot, vertex_bytes, index_bytes)?;

        let (vertex_buffer, index_buffer) = {
            let buffers = &self.mesh_buffers[slot];
            match (&buffers.vertex, &buffers.index) {
                (Some(v), Some(i)) => (v, i),
                _ => return Ok(()),
            }
        };

        let mut vertex_offset = 0u64;
        let mut index_offset = 0u64;
        for (_, mesh) in &meshes {
            let vertices: &[u8] = bytemuck::cast_slice(&mesh.vertices);
            let indices: &[u8] = bytemuck::cast_slice(&mesh.indices);
            self.write_buffer(vertex_buffer, vertex_offset, vertices)?;
            self.write_buffer(index_buffer, index_offset, indices)?;
            vertex_offset += vertices.len() as u64;
            index_offset += indices.len() as u64;
        }

        let width_points = extent.width as f32 / pixels_per_point;
        let height_points = extent.height as f32 / pixels_per_point;
        let push: [f32; 2] = [width_points, height_points];

        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline);
            self.device
                .cmd_bind_vertex_buffers(cmd, 0, &[vertex_buffer.buffer], &[0]);
            self.device
                .cmd_bind_index_buffer(cmd, index_buffer.buffer, 0, vk::IndexType::UINT32);
            self.device.cmd_set_viewport(
                cmd,
                0,
                &[vk::Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: extent.width as f32,
                    height: extent.height as f32,
                    min_depth: 0.0,
                    max_depth: 1.0,
                }],
            );
            self.device.cmd_push_constants(
                cmd,
                self.pipeline_layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::cast_slice(&push),
            );
        }

        let mut first_index = 0u32;
        let mut base_vertex = 0i32;
        for (clip_rect, mesh) in &meshes {
            let index_count = mesh.indices.len() as u32;
            let vertex_count = mesh.vertices.len() as i32;

            let scissor = scissor_rect(*clip_rect, pixels_per_point, extent);
            let texture = self.textures.get(&mesh.texture_id);

            if let (Some(scissor), Some(texture)) = (scissor, texture) {
                unsafe {
                    self.device.cmd_set_scissor(cmd, 0, &[scissor]);
                    self.device.cmd_bind_descriptor_sets(
                        cmd,
                        vk::PipelineBindPoint::GRAPHICS,
                        self.pipeline_layout,
                        0,
                        &[texture.descriptor_set],
                        &[],
                    );
                    self.device
                        .cmd_draw_indexed(cmd, index_count, 1, first_index, base_vertex, 0);
                }
            }

            first_index += index_count;
            base_vertex += vertex_count;
        }

        Ok(())
    }

    fn reserve_mesh_buffers(&mut self, slot: usize, vertex_bytes: u64, index_bytes: u64) -> Result<()> {
        if self.mesh_buffers.len() <= slot {
            self.mesh_buffers.resize_with(slot + 1, MeshBuffers::default);
        }

        let current_vertex = self.mesh_buffers[slot].vertex.as_ref().map_or(0, |b| b.size);
        if current_vertex < vertex_bytes {
            let size = grown_buffer_size(current_vertex.max(INITIAL_VERTEX_BUFFER_SIZE), vertex_bytes);
            let buffer = self.create_buffer(
                size,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            if let Some(old) = self.mesh_buffers[slot].vertex.replace(buffer) {
                self.destroy_buffer(old);
            }
        }

        let current_index = self.mesh_buffers[slot].index.as_ref().map_or(0, |b| b.size);
        if current_index < index_bytes {
            let size = grown_buffer_size(current_index.max(INITIAL_INDEX_BUFFER_SIZE), index_bytes);
            let buffer = self.create_buffer(
                size,
                vk::BufferUsageFlags::INDEX_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            if let Some(old) = self.mesh_buffers[slot].index.replace(buffer) {
                self.destroy_buffer(old);
            }
        }
        Ok(())
    }

    fn allocate(&self, requirements: vk::MemoryRequirements, flags: vk::MemoryPropertyFlags) -> Result<vk::DeviceMemory> {
        let memory_type = find_memory_type(&self.memory_properties, requirements.memory_type_bits, flags)
            .ok_or_else(|| GraphicsError::ResourceCreation(format!("No memory type supports {:?}", flags)))?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        unsafe { self.device.allocate_memory(&alloc_info, None) }.map_err(vk_error("vkAllocateMemory"))
    }

    fn create_buffer(
        &self,
        size: u64,
        usage: vk::BufferUsageFlags,
        flags: vk::MemoryPropertyFlags,
    ) -> Result<AllocatedBuffer> {
        let info = vk::BufferCreateInfo::builder()
            .size(size.max(1))
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let buffer = unsafe { self.device.create_buffer(&info, None) }.map_err(vk_error("vkCreateBuffer"))?;

        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };
        let memory = match self.allocate(requirements, flags) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let allocated = AllocatedBuffer { buffer, memory, size };
        if let Err(e) = unsafe { self.device.bind_buffer_memory(buffer, memory, 0) } {
            self.destroy_buffer(allocated);
            return Err(vk_error("vkBindBufferMemory")(e));
        }
        Ok(allocated)
    }

    fn write_buffer(&self, buffer: &AllocatedBuffer, offset: u64, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if offset + bytes.len() as u64 > buffer.size {
            return Err(GraphicsError::ResourceCreation("Buffer write out of bounds".to_string()).into());
        }
        unsafe {
            let ptr = self
                .device
                .map_memory(buffer.memory, offset, bytes.len() as u64, vk::MemoryMapFlags::empty())
                .map_err(vk_error("vkMapMemory"))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, bytes.len());
            self.device.unmap_memory(buffer.memory);
        }
        Ok(())
    }

    fn destroy_buffer(&self, buffer: AllocatedBuffer) {
        unsafe {
            self.device.destroy_buffer(buffer.buffer, None);
            self.device.free_memory(buffer.memory, None);
        }
    }

    fn destroy_texture(&self, texture: GuiTexture) {
        unsafe {
            if texture.descriptor_set != vk::DescriptorSet::null() {
                if let Err(e) = self
                    .device
                    .free_descriptor_sets(self.descriptor_pool, &[texture.descriptor_set])
                {
                    warn!("vkFreeDescriptorSets failed: {:?}", e);
                }
            }
            if texture.view != vk::ImageView::null() {
                self.device.destroy_image_view(texture.view, None);
            }
            self.device.destroy_image(texture.image, None);
            self.device.free_memory(texture.memory, None);
        }
    }

    /// 销毁所有 GPU 对象，调用前设备必须空闲；重复调用是空操作
    pub fn destroy(&mut self) {
        for (_, texture) in std::mem::take(&mut self.textures) {
            self.destroy_texture(texture);
        }
        for buffers in std::mem::take(&mut self.mesh_buffers) {
            if let Some(vertex) = buffers.vertex {
                self.destroy_buffer(vertex);
            }
            if let Some(index) = buffers.index {
                self.destroy_buffer(index);
            }
        }

        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.device.destroy_pipeline(self.pipeline, None);
                self.pipeline = vk::Pipeline::null();
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                self.device.destroy_pipeline_layout(self.pipeline_layout, None);
                self.pipeline_layout = vk::PipelineLayout::null();
            }
            if self.set_layout != vk::DescriptorSetLayout::null() {
                self.device.destroy_descriptor_set_layout(self.set_layout, None);
                self.set_layout = vk::DescriptorSetLayout::null();
            }
            for sampler in [&mut self.sampler_linear, &mut self.sampler_nearest] {
                if *sampler != vk::Sampler::null() {
                    self.device.destroy_sampler(*sampler, None);
                    *sampler = vk::Sampler::null();
                }
            }
            if self.upload_pool != vk::CommandPool::null() {
                self.device.destroy_command_pool(self.upload_pool, None);
                self.upload_pool = vk::CommandPool::null();
            }
        }
    }
}

fn entry_point(bytes: &'static [u8]) -> Result<&'static CStr> {
    CStr::from_bytes_with_nul(bytes)
        .map_err(|e| GraphicsError::ResourceCreation(format!("Invalid shader entry point: {}", e)).into())
}

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, Color32, ColorImage, Rect};

    fn memory_properties(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, f) in flags.iter().enumerate() {
            props.memory_types[i].property_flags = *f;
        }
        props
    }

    #[test]
    fn test_find_memory_type() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        assert_eq!(find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL), Some(0));
        assert_eq!(find_memory_type(&props, 0b111, host), Some(2));
        // 类型位排除了 2 号
        assert_eq!(find_memory_type(&props, 0b011, host), None);
    }

    #[test]
    fn test_buffer_growth() {
        assert_eq!(grown_buffer_size(1024, 512), 1024);
        assert_eq!(grown_buffer_size(1024, 1025), 2048);
        assert_eq!(grown_buffer_size(0, 3000), 4096);
    }

    #[test]
    fn test_scissor_rect_scales_and_clamps() {
        let extent = vk::Extent2D { width: 800, height: 600 };
        let rect = Rect::from_min_max(pos2(-10.0, 10.0), pos2(300.0, 400.0));
        let scissor = scissor_rect(rect, 2.0, extent).expect("visible");
        assert_eq!(scissor.offset, vk::Offset2D { x: 0, y: 20 });
        assert_eq!(scissor.extent, vk::Extent2D { width: 600, height: 580 });
    }

    #[test]
    fn test_scissor_rect_outside_is_empty() {
        let extent = vk::Extent2D { width: 800, height: 600 };
        let rect = Rect::from_min_max(pos2(900.0, 10.0), pos2(1000.0, 20.0));
        assert!(scissor_rect(rect, 1.0, extent).is_none());
    }

    #[test]
    fn test_image_delta_bytes() {
        let image = ColorImage::new([2, 1], Color32::from_rgba_premultiplied(1, 2, 3, 4));
        let bytes = image_delta_bytes(&ImageData::Color(image.into()));
        assert_eq!(bytes, vec![1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(VERTEX_STRIDE, 20);
        assert!(shader::wgsl_to_spirv("gui shader", GUI_SHADER).is_ok());
    }
}
