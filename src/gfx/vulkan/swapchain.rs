//! Vulkan 交换链
//!
//! 管理交换链及其附属对象：
//! - 每个交换链图像一个帧槽（图像视图、帧缓冲、命令池、命令缓冲、栅栏）
//! - 每个交换链图像一对信号量（图像获取 / 渲染完成）
//! - 单个颜色附件的渲染通道（清屏后呈现）
//!
//! 渲染通道只依赖表面格式，重建交换链时保持不变，GUI 管线因此无需重建。

use ash::extensions::khr;
use ash::vk;
use tracing::{debug, info};

use crate::core::error::{GraphicsError, Result};

use super::context::{vk_error, VulkanContext};

/// 按优先级请求的交换链格式
pub const REQUESTED_FORMATS: [vk::Format; 4] = [
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::R8G8B8A8_UNORM,
    vk::Format::B8G8R8_UNORM,
    vk::Format::R8G8B8_UNORM,
];

/// 请求的颜色空间
pub const REQUESTED_COLOR_SPACE: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;

/// 选择表面格式
///
/// 表面只报告一个 `UNDEFINED` 格式时可以任选，直接使用第一个请求的格式；
/// 否则按请求顺序查找格式和颜色空间都匹配的项，找不到时使用第一个可用格式。
pub fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    requested: &[vk::Format],
    color_space: vk::ColorSpaceKHR,
) -> Option<vk::SurfaceFormatKHR> {
    let first = *available.first()?;

    if available.len() == 1 && first.format == vk::Format::UNDEFINED {
        return Some(vk::SurfaceFormatKHR {
            format: requested.first().copied().unwrap_or(vk::Format::B8G8R8A8_UNORM),
            color_space,
        });
    }

    requested
        .iter()
        .find_map(|format| {
            available
                .iter()
                .find(|a| a.format == *format && a.color_space == color_space)
                .copied()
        })
        .or(Some(first))
}

/// 选择呈现模式
///
/// 垂直同步只请求 FIFO；否则依次尝试 MAILBOX、IMMEDIATE、FIFO。
/// FIFO 是所有实现都必须支持的模式，作为兜底。
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    let requested: &[vk::PresentModeKHR] = if vsync {
        &[vk::PresentModeKHR::FIFO]
    } else {
        &[
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO,
        ]
    };

    requested
        .iter()
        .copied()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// 交换链图像数量
///
/// MAILBOX 至少需要 3 张图像；结果不低于表面的最小值，且不超过最大值（0 表示不限）。
pub fn select_image_count(caps: &vk::SurfaceCapabilitiesKHR, requested: u32, mode: vk::PresentModeKHR) -> u32 {
    let mode_min = if mode == vk::PresentModeKHR::MAILBOX { 3 } else { 2 };
    let mut count = requested.max(mode_min).max(caps.min_image_count);
    if caps.max_image_count != 0 {
        count = count.min(caps.max_image_count);
    }
    count
}

/// 交换链尺寸
///
/// `current_extent` 为 `u32::MAX` 时由应用决定尺寸，否则必须与表面一致。
pub fn select_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width == u32::MAX {
        vk::Extent2D {
            width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    } else {
        caps.current_extent
    }
}

/// 一个交换链图像对应的资源
pub struct FrameSlot {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub framebuffer: vk::Framebuffer,
    pub command_pool: vk::CommandPool,
    pub command_buffer: vk::CommandBuffer,
    pub fence: vk::Fence,
}

/// 一对帧信号量
pub struct FrameSemaphores {
    pub image_acquired: vk::Semaphore,
    pub render_complete: vk::Semaphore,
}

/// 交换链及其附属对象
pub struct Swapchain {
    pub loader: khr::Swapchain,
    pub handle: vk::SwapchainKHR,
    pub render_pass: vk::RenderPass,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub frames: Vec<FrameSlot>,
    pub semaphores: Vec<FrameSemaphores>,
    min_image_count: u32,
}

impl Swapchain {
    /// 选择格式和呈现模式，创建渲染通道和交换链
    pub fn new(ctx: &VulkanContext, width: u32, height: u32, vsync: bool, min_image_count: u32) -> Result<Self> {
        let formats = unsafe {
            ctx.surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, ctx.surface)
        }
        .map_err(vk_error("vkGetPhysicalDeviceSurfaceFormatsKHR"))?;

        let surface_format = select_surface_format(&formats, &REQUESTED_FORMATS, REQUESTED_COLOR_SPACE)
            .ok_or_else(|| GraphicsError::Surface("The surface reports no supported formats".to_string()))?;
        debug!("Surface format: {:?} / {:?}", surface_format.format, surface_format.color_space);

        let present_modes = unsafe {
            ctx.surface_loader
                .get_physical_device_surface_present_modes(ctx.physical_device, ctx.surface)
        }
        .map_err(vk_error("vkGetPhysicalDeviceSurfacePresentModesKHR"))?;
        let present_mode = select_present_mode(&present_modes, vsync);
        debug!("Present mode: {:?}", present_mode);

        let render_pass = create_render_pass(&ctx.device, surface_format.format)?;

        let mut swapchain = Self {
            loader: khr::Swapchain::new(&ctx.instance, &ctx.device),
            handle: vk::SwapchainKHR::null(),
            render_pass,
            surface_format,
            present_mode,
            extent: vk::Extent2D { width: 0, height: 0 },
            frames: Vec::new(),
            semaphores: Vec::new(),
            min_image_count,
        };

        if width > 0 && height > 0 {
            if let Err(e) = swapchain.create_or_resize(ctx, width, height) {
                swapchain.destroy(&ctx.device);
                return Err(e);
            }
        }

        Ok(swapchain)
    }

    /// 交换链图像数量
    pub fn image_count(&self) -> usize {
        self.frames.len()
    }

    /// 是否已经创建了交换链
    pub fn is_ready(&self) -> bool {
        self.handle != vk::SwapchainKHR::null() && !self.frames.is_empty()
    }

    /// 创建或按新尺寸重建交换链
    ///
    /// 旧交换链作为 `old_swapchain` 传入，创建完成后销毁。
    pub fn create_or_resize(&mut self, ctx: &VulkanContext, width: u32, height: u32) -> Result<()> {
        let device = &ctx.device;
        unsafe { device.device_wait_idle() }.map_err(vk_error("vkDeviceWaitIdle"))?;

        self.destroy_frames(device);

        let caps = unsafe {
            ctx.surface_loader
                .get_physical_device_surface_capabilities(ctx.physical_device, ctx.surface)
        }
        .map_err(vk_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR"))?;

        let image_count = select_image_count(&caps, self.min_image_count, self.present_mode);
        let extent = select_extent(&caps, width, height);
        let old_swapchain = self.handle;

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(ctx.surface)
            .min_image_count(image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let handle = unsafe { self.loader.create_swapchain(&create_info, None) };

        if old_swapchain != vk::SwapchainKHR::null() {
            unsafe { self.loader.destroy_swapchain(old_swapchain, None) };
            self.handle = vk::SwapchainKHR::null();
        }

        self.handle = handle.map_err(vk_error("vkCreateSwapchainKHR"))?;
        self.extent = extent;

        let images = unsafe { self.loader.get_swapchain_images(self.handle) }
            .map_err(vk_error("vkGetSwapchainImagesKHR"))?;

        for image in images {
            let slot = create_frame_slot(ctx, image, self.surface_format.format, self.render_pass, extent)?;
            self.frames.push(slot);
            self.semaphores.push(create_semaphores(device)?);
        }

        info!(
            "Swapchain created: {}x{}, {} images",
            extent.width,
            extent.height,
            self.frames.len()
        );
        Ok(())
    }

    fn destroy_frames(&mut self, device: &ash::Device) {
        unsafe {
            for slot in self.frames.drain(..) {
                device.destroy_fence(slot.fence, None);
                device.free_command_buffers(slot.command_pool, &[slot.command_buffer]);
                device.destroy_command_pool(slot.command_pool, None);
                device.destroy_framebuffer(slot.framebuffer, None);
                device.destroy_image_view(slot.view, None);
            }
            for pair in self.semaphores.drain(..) {
                device.destroy_semaphore(pair.image_acquired, None);
                device.destroy_semaphore(pair.render_complete, None);
            }
        }
    }

    /// 销毁全部对象，调用前设备必须空闲
    pub fn destroy(&mut self, device: &ash::Device) {
        self.destroy_frames(device);
        unsafe {
            if self.handle != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.handle, None);
                self.handle = vk::SwapchainKHR::null();
            }
            if self.render_pass != vk::RenderPass::null() {
                device.destroy_render_pass(self.render_pass, None);
                self.render_pass = vk::RenderPass::null();
            }
        }
    }
}

fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    let attachments = [vk::AttachmentDescription::builder()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .build()];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];

    let subpasses = [vk::SubpassDescription::builder()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .build()];

    let dependencies = [vk::SubpassDependency::builder()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .build()];

    let create_info = vk::RenderPassCreateInfo::builder()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe { device.create_render_pass(&create_info, None) }.map_err(vk_error("vkCreateRenderPass"))
}

fn create_frame_slot(
    ctx: &VulkanContext,
    image: vk::Image,
    format: vk::Format,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
) -> Result<FrameSlot> {
    let device = &ctx.device;

    let view_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::R,
            g: vk::ComponentSwizzle::G,
            b: vk::ComponentSwizzle::B,
            a: vk::ComponentSwizzle::A,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });
    let view = unsafe { device.create_image_view(&view_info, None) }.map_err(vk_error("vkCreateImageView"))?;

    let attachments = [view];
    let framebuffer_info = vk::FramebufferCreateInfo::builder()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);
    let framebuffer =
        unsafe { device.create_framebuffer(&framebuffer_info, None) }.map_err(vk_error("vkCreateFramebuffer"))?;

    let pool_info = vk::CommandPoolCreateInfo::builder()
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .queue_family_index(ctx.queue_family);
    let command_pool =
        unsafe { device.create_command_pool(&pool_info, None) }.map_err(vk_error("vkCreateCommandPool"))?;

    let alloc_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(command_pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);
    let command_buffer = unsafe { device.allocate_command_buffers(&alloc_info) }
        .map_err(vk_error("vkAllocateCommandBuffers"))?
        .into_iter()
        .next()
        .ok_or_else(|| GraphicsError::ResourceCreation("No command buffer was allocated".to_string()))?;

    // 初始为 signaled，第一次等待立即返回
    let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
    let fence = unsafe { device.create_fence(&fence_info, None) }.map_err(vk_error("vkCreateFence"))?;

    Ok(FrameSlot {
        image,
        view,
        framebuffer,
        command_pool,
        command_buffer,
        fence,
    })
}

fn create_semaphores(device: &ash::Device) -> Result<FrameSemaphores> {
    let info = vk::SemaphoreCreateInfo::default();
    unsafe {
        Ok(FrameSemaphores {
            image_acquired: device.create_semaphore(&info, None).map_err(vk_error("vkCreateSemaphore"))?,
            render_complete: device.create_semaphore(&info, None).map_err(vk_error("vkCreateSemaphore"))?,
        })
    }
}
