//! 固定几何体管线
//!
//! 三角形和立方体共用一套着色器：顶点着色器乘以 MVP 矩阵（三角形为单位矩阵），
//! 片元着色器输出顶点颜色。立方体额外带深度缓冲和背面剔除。

use tracing::{debug, error, info};
use wgpu::util::DeviceExt;

use crate::core::error::{GraphicsError, Result};
use crate::core::scene::GeometryKind;
use crate::geometry::{MeshData, SceneVertex};
use crate::gfx::shader;
use crate::renderer::frame::SceneFrame;

const VERTEX_SHADER: &str = include_str!("shaders/scene_vertex.wgsl");
const FRAGMENT_SHADER: &str = include_str!("shaders/scene_fragment.wgsl");

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

/// 深度缓冲
struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

/// 固定几何体的 GPU 资源
pub struct ScenePipeline {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uses_depth: bool,
    depth: Option<DepthTarget>,
}

impl ScenePipeline {
    /// 编译着色器并上传网格
    ///
    /// 任何着色器或管线错误都会带着诊断文本返回。
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        mesh: &MeshData,
        geometry: GeometryKind,
    ) -> Result<Self> {
        mesh.validate()
            .map_err(|e| GraphicsError::ResourceCreation(format!("Invalid {} mesh: {}", mesh.label(), e)))?;

        let vertex_module = compile_shader(device, "scene vertex", VERTEX_SHADER)?;
        let fragment_module = compile_shader(device, "scene fragment", FRAGMENT_SHADER)?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uses_depth = geometry == GeometryKind::Cube;

        // 管线创建相当于 GL 的程序链接，同样放进错误作用域
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: SceneVertex::STRIDE as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: uses_depth.then_some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: uses_depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });
        check_error_scope(device, "scene program link")?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Vertex Buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // GL 要求索引缓冲区长度是 4 字节的倍数
        let mut indices = mesh.indices.clone();
        if indices.len() % 2 != 0 {
            indices.push(0);
        }
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        info!(
            "Scene pipeline created: {} ({} vertices, {} triangles)",
            mesh.label(),
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        Ok(Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count() as u32,
            uniform_buffer,
            bind_group,
            uses_depth,
            depth: None,
        })
    }

    /// 把几何体绘制到 `target` 上（保留已有颜色）
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        size: (u32, u32),
        scene: &SceneFrame,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&scene.mvp));

        if self.uses_depth && self.depth.as_ref().map(|d| d.size) != Some(size) {
            self.depth = Some(create_depth_target(device, size));
        }

        let depth_attachment = self.depth.as_ref().map(|depth| wgpu::RenderPassDepthStencilAttachment {
            view: &depth.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Discard,
            }),
            stencil_ops: None,
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: depth_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// 校验并创建着色器模块
fn compile_shader(device: &wgpu::Device, stage: &str, source: &str) -> Result<wgpu::ShaderModule> {
    shader::validate_wgsl(stage, source)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(stage),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    check_error_scope(device, stage)?;

    debug!("Compiled the {} shader", stage);
    Ok(module)
}

fn check_error_scope(device: &wgpu::Device, stage: &str) -> Result<()> {
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => {
            error!("Failed to build the {}:\n{}", stage, err);
            Err(GraphicsError::ShaderCompilation {
                stage: stage.to_string(),
                log: err.to_string(),
            }
            .into())
        }
        None => Ok(()),
    }
}

fn create_depth_target(device: &wgpu::Device, size: (u32, u32)) -> DepthTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth"),
        size: wgpu::Extent3d {
            width: size.0.max(1),
            height: size.1.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    DepthTarget { _texture: texture, view, size }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_shaders_are_valid() {
        assert!(shader::validate_wgsl("scene vertex", VERTEX_SHADER).is_ok());
        assert!(shader::validate_wgsl("scene fragment", FRAGMENT_SHADER).is_ok());
    }

    #[test]
    fn test_vertex_attributes_match_layout() {
        assert_eq!(VERTEX_ATTRIBUTES[0].offset, 0);
        assert_eq!(VERTEX_ATTRIBUTES[1].offset, SceneVertex::COLOR_OFFSET as u64);
    }
}
