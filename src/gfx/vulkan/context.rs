//! Vulkan 设备上下文
//!
//! 负责 Vulkan 的基础对象：
//! - 实例（启用窗口系统所需的扩展）
//! - 物理设备（优先独立显卡，否则第一个设备）
//! - 图形队列族、逻辑设备和队列（启用 `VK_KHR_swapchain`）
//! - 描述符池（每种描述符类型各 1000 个）
//! - 窗口表面（检查 WSI 支持）
//!
//! 所有非成功的 `vk::Result` 都转换为 [`GraphicsError::ApiCall`] 向上传播。

use std::ffi::{CStr, CString};

use ash::extensions::khr;
use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use tracing::{debug, error, info, warn};
use winit::window::Window;

use crate::core::error::{GraphicsError, Result, SandboxError};
use crate::gfx::backend::GraphicsContext;

/// 描述符池中每种描述符类型的数量
pub const DESCRIPTORS_PER_TYPE: u32 = 1000;

/// 描述符池覆盖的描述符类型
pub const POOL_DESCRIPTOR_TYPES: [vk::DescriptorType; 11] = [
    vk::DescriptorType::SAMPLER,
    vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    vk::DescriptorType::SAMPLED_IMAGE,
    vk::DescriptorType::STORAGE_IMAGE,
    vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
    vk::DescriptorType::STORAGE_TEXEL_BUFFER,
    vk::DescriptorType::UNIFORM_BUFFER,
    vk::DescriptorType::STORAGE_BUFFER,
    vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
    vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
    vk::DescriptorType::INPUT_ATTACHMENT,
];

/// 把 `vk::Result` 转换为带调用名的错误
pub fn vk_error(call: &'static str) -> impl Fn(vk::Result) -> SandboxError {
    move |result| {
        error!("{} failed: {:?}", call, result);
        GraphicsError::ApiCall {
            call,
            code: format!("{:?}", result),
        }
        .into()
    }
}

/// Vulkan 设备上下文
pub struct VulkanContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub surface_loader: khr::Surface,
    pub surface: vk::SurfaceKHR,
    pub physical_device: vk::PhysicalDevice,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_family: u32,
    pub device: ash::Device,
    pub queue: vk::Queue,
    pub descriptor_pool: vk::DescriptorPool,
    device_name: String,
    api_version: u32,
    destroyed: bool,
}

impl VulkanContext {
    /// 创建实例、设备、描述符池和窗口表面
    ///
    /// 中途失败时已经创建的对象会被销毁。
    pub fn new(window: &Window) -> Result<Self> {
        info!("Initializing the Vulkan backend");

        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GraphicsError::DeviceCreation(format!("Failed to load the Vulkan library: {}", e)))?;

        let instance = create_instance(&entry, window)?;
        info!("Vulkan instance has been created");

        let surface_loader = khr::Surface::new(&entry, &instance);

        // 之后的步骤出错时需要手动销毁实例
        let setup = (|| -> Result<_> {
            let (physical_device, properties) = pick_physical_device(&instance)?;
            let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
                .to_string_lossy()
                .into_owned();
            info!("Vulkan device: {}", device_name);

            let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
            let queue_family = select_queue_family(&families).ok_or_else(|| {
                GraphicsError::AdapterUnavailable("No queue family supports graphics".to_string())
            })?;
            debug!("Graphics queue family: {}", queue_family);

            Ok((physical_device, properties, device_name, queue_family))
        })();

        let (physical_device, properties, device_name, queue_family) = match setup {
            Ok(v) => v,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        let device = match create_device(&instance, physical_device, queue_family) {
            Ok(device) => device,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };
        let queue = unsafe { device.get_device_queue(queue_family, 0) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };

        // 从这里开始由 destroy() 负责清理
        let mut context = Self {
            entry,
            instance,
            surface_loader,
            surface: vk::SurfaceKHR::null(),
            physical_device,
            memory_properties,
            queue_family,
            device,
            queue,
            descriptor_pool: vk::DescriptorPool::null(),
            device_name,
            api_version: properties.api_version,
            destroyed: false,
        };

        context.descriptor_pool = create_descriptor_pool(&context.device)?;

        context.surface = unsafe {
            ash_window::create_surface(
                &context.entry,
                &context.instance,
                window.raw_display_handle(),
                window.raw_window_handle(),
                None,
            )
        }
        .map_err(vk_error("vkCreateSurfaceKHR"))?;

        let supported = unsafe {
            context.surface_loader.get_physical_device_surface_support(
                context.physical_device,
                context.queue_family,
                context.surface,
            )
        }
        .map_err(vk_error("vkGetPhysicalDeviceSurfaceSupportKHR"))?;

        if !supported {
            error!("No WSI support on the selected physical device");
            return Err(GraphicsError::Surface("No WSI support on the selected physical device".to_string()).into());
        }

        info!("Vulkan backend initialized");
        Ok(context)
    }

    /// 等待设备空闲
    pub fn wait_idle(&self) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        unsafe { self.device.device_wait_idle() }.map_err(vk_error("vkDeviceWaitIdle"))
    }

    /// 销毁描述符池、设备、表面和实例，重复调用是空操作
    ///
    /// 调用前必须已经销毁所有依赖设备的对象（交换链、GUI 资源）。
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                warn!("vkDeviceWaitIdle failed before destroying the device: {:?}", e);
            }
            if self.descriptor_pool != vk::DescriptorPool::null() {
                self.device.destroy_descriptor_pool(self.descriptor_pool, None);
            }
            self.device.destroy_device(None);
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan device and instance have been destroyed");
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl GraphicsContext for VulkanContext {
    fn backend_name(&self) -> &str {
        "Vulkan"
    }

    fn device_name(&self) -> String {
        self.device_name.clone()
    }

    fn api_version(&self) -> String {
        format!(
            "{}.{}.{}",
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version)
        )
    }
}

fn create_instance(entry: &ash::Entry, window: &Window) -> Result<ash::Instance> {
    let extensions = ash_window::enumerate_required_extensions(window.raw_display_handle())
        .map_err(vk_error("vkEnumerateInstanceExtensionProperties"))?;

    for ext in extensions {
        debug!("Instance extension: {}", unsafe { CStr::from_ptr(*ext) }.to_string_lossy());
    }

    let app_name = CString::new(env!("CARGO_PKG_NAME")).unwrap_or_default();
    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&app_name)
        .api_version(vk::API_VERSION_1_0);

    let create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(extensions);

    unsafe { entry.create_instance(&create_info, None) }.map_err(vk_error("vkCreateInstance"))
}

fn pick_physical_device(instance: &ash::Instance) -> Result<(vk::PhysicalDevice, vk::PhysicalDeviceProperties)> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(vk_error("vkEnumeratePhysicalDevices"))?;

    let properties: Vec<vk::PhysicalDeviceProperties> = devices
        .iter()
        .map(|d| unsafe { instance.get_physical_device_properties(*d) })
        .collect();
    let types: Vec<vk::PhysicalDeviceType> = properties.iter().map(|p| p.device_type).collect();

    let index = select_physical_device(&types)
        .ok_or_else(|| GraphicsError::AdapterUnavailable("No Vulkan physical devices found".to_string()))?;

    debug!("Selected physical device {} of {} ({:?})", index, devices.len(), types[index]);
    Ok((devices[index], properties[index]))
}

fn create_device(instance: &ash::Instance, physical_device: vk::PhysicalDevice, queue_family: u32) -> Result<ash::Device> {
    let priorities = [1.0f32];
    let queue_info = [vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(queue_family)
        .queue_priorities(&priorities)
        .build()];

    let extensions = [khr::Swapchain::name().as_ptr()];
    let create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_info)
        .enabled_extension_names(&extensions);

    unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(vk_error("vkCreateDevice"))
}

fn create_descriptor_pool(device: &ash::Device) -> Result<vk::DescriptorPool> {
    let sizes = descriptor_pool_sizes(DESCRIPTORS_PER_TYPE);
    let create_info = vk::DescriptorPoolCreateInfo::builder()
        .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
        .max_sets(DESCRIPTORS_PER_TYPE * sizes.len() as u32)
        .pool_sizes(&sizes);

    unsafe { device.create_descriptor_pool(&create_info, None) }.map_err(vk_error("vkCreateDescriptorPool"))
}

/// 第一个独立显卡，没有时选第一个设备
pub fn select_physical_device(types: &[vk::PhysicalDeviceType]) -> Option<usize> {
    if types.is_empty() {
        return None;
    }
    Some(
        types
            .iter()
            .position(|t| *t == vk::PhysicalDeviceType::DISCRETE_GPU)
            .unwrap_or(0),
    )
}

/// 第一个支持图形命令的队列族
pub fn select_queue_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|f| f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|i| i as u32)
}

/// 描述符池大小：每种类型 `per_type` 个
pub fn descriptor_pool_sizes(per_type: u32) -> [vk::DescriptorPoolSize; 11] {
    POOL_DESCRIPTOR_TYPES.map(|ty| vk::DescriptorPoolSize {
        ty,
        descriptor_count: per_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_discrete_gpu() {
        let types = [
            vk::PhysicalDeviceType::INTEGRATED_GPU,
            vk::PhysicalDeviceType::CPU,
            vk::PhysicalDeviceType::DISCRETE_GPU,
            vk::PhysicalDeviceType::DISCRETE_GPU,
        ];
        assert_eq!(select_physical_device(&types), Some(2));
    }

    #[test]
    fn test_falls_back_to_first_device() {
        let types = [vk::PhysicalDeviceType::INTEGRATED_GPU, vk::PhysicalDeviceType::CPU];
        assert_eq!(select_physical_device(&types), Some(0));
        assert_eq!(select_physical_device(&[]), None);
    }

    #[test]
    fn test_first_graphics_queue_family() {
        let families = [
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::TRANSFER,
                queue_count: 1,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                queue_count: 4,
                ..Default::default()
            },
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::GRAPHICS,
                queue_count: 1,
                ..Default::default()
            },
        ];
        assert_eq!(select_queue_family(&families), Some(1));
        assert_eq!(select_queue_family(&families[..1]), None);
    }

    #[test]
    fn test_descriptor_pool_sizes() {
        let sizes = descriptor_pool_sizes(DESCRIPTORS_PER_TYPE);
        assert_eq!(sizes.len(), 11);
        assert!(sizes.iter().all(|s| s.descriptor_count == 1000));
        assert_eq!(sizes[2].ty, vk::DescriptorType::SAMPLED_IMAGE);
        assert_eq!(DESCRIPTORS_PER_TYPE * sizes.len() as u32, 11_000);
    }
}
