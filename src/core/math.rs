//! 数学工具
//!
//! 基于 `nalgebra` 的类型别名和立方体 MVP 所需的矩阵辅助函数。

pub use nalgebra::{Matrix4 as Mat4, Point3, Unit, Vector3 as Vec3};

pub type Vector3 = Vec3<f32>;
pub type Matrix4 = Mat4<f32>;

/// nalgebra 的透视矩阵输出 OpenGL 风格的深度范围 [-1, 1]，
/// wgpu 与 Vulkan 使用 [0, 1]。
#[rustfmt::skip]
pub fn depth_zero_to_one() -> Matrix4 {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// 右手系透视投影，深度范围 0..1
pub fn perspective(aspect: f32, fov_y: f32, near: f32, far: f32) -> Matrix4 {
    depth_zero_to_one() * Matrix4::new_perspective(aspect, fov_y, near, far)
}

/// 从 `eye` 看向原点，+Y 向上
pub fn look_at_origin(eye: &Vector3) -> Matrix4 {
    Matrix4::look_at_rh(&Point3::from(*eye), &Point3::origin(), &Vector3::y())
}

/// 绕任意轴旋转，轴为零向量时返回单位矩阵
pub fn rotation_about(axis: [f32; 3], angle: f32) -> Matrix4 {
    match Unit::try_new(Vector3::new(axis[0], axis[1], axis[2]), 1.0e-6) {
        Some(axis) => Matrix4::from_axis_angle(&axis, angle),
        None => Matrix4::identity(),
    }
}

/// 列主序数组，可直接写入 uniform 缓冲区
pub fn to_cols_array(m: &Matrix4) -> [[f32; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (c, column) in out.iter_mut().enumerate() {
        for (r, value) in column.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    #[test]
    fn test_perspective_depth_range() {
        let proj = perspective(1.0, 45f32.to_radians(), 0.1, 100.0);

        let near = proj * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        assert_eq!(rotation_about([0.0; 3], 1.0), Matrix4::identity());
    }

    #[test]
    fn test_cols_array_layout() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let cols = to_cols_array(&m);
        assert_eq!(cols[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
