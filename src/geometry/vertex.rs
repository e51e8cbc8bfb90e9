//! 顶点数据定义
//!
//! 固定几何体（三角形、立方体）使用的顶点结构体。
//!
//! # 设计说明
//!
//! - 使用 `#[repr(C)]` 确保内存布局稳定
//! - 实现 `Pod` 和 `Zeroable` trait 以支持零拷贝上传到 GPU

use bytemuck::{Pod, Zeroable};

/// 场景顶点
///
/// # 内存布局
///
/// - `position`：前 12 字节（3 个 f32）
/// - `color`：后 16 字节（4 个 f32）
///
/// 总大小：28 字节
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    /// 顶点位置 [x, y, z]
    pub position: [f32; 3],
    /// 顶点颜色（RGBA，范围 0.0-1.0）
    pub color: [f32; 4],
}

impl SceneVertex {
    pub const fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    /// 顶点步长（字节）
    pub const STRIDE: usize = std::mem::size_of::<SceneVertex>();

    /// `color` 字段的字节偏移
    pub const COLOR_OFFSET: usize = std::mem::size_of::<[f32; 3]>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(SceneVertex::STRIDE, 28);
        assert_eq!(SceneVertex::COLOR_OFFSET, 12);

        let v = SceneVertex::new([1.0, 2.0, 3.0], [0.5, 0.5, 0.5, 1.0]);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 28);
    }
}
