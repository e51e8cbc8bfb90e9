//! 场景配置模块
//!
//! 定义沙盒场景的配置：清屏颜色、固定几何体种类、三角形颜色、
//! 立方体旋转参数以及观察立方体所用的相机。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{ConfigError, Result, SandboxError};
use crate::core::math::{self, Matrix4, Vector3};

/// 固定几何体种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    /// 只清屏，不绘制几何体
    None,
    /// 一个平面三角形（顶点直通）
    Triangle,
    /// 绕固定轴旋转的立方体
    Cube,
}

/// 相机配置
///
/// 相机始终看向原点。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 相机位置 (x, y, z)
    #[serde(default = "default_eye")]
    pub position: [f32; 3],

    /// 视野角度（度数）
    #[serde(default = "default_fov")]
    pub fov: f32,

    /// 近裁剪面距离
    #[serde(default = "default_near_clip")]
    pub near_clip: f32,

    /// 远裁剪面距离
    #[serde(default = "default_far_clip")]
    pub far_clip: f32,
}

/// 立方体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeConfig {
    /// 旋转速度（度/秒）
    #[serde(default = "default_rotation_speed")]
    pub rotation_speed: f32,

    /// 旋转轴，使用前会归一化
    #[serde(default = "default_rotation_axis")]
    pub rotation_axis: [f32; 3],
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    /// 每帧的清屏颜色 (RGBA)
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    /// 绘制的固定几何体
    #[serde(default = "default_geometry")]
    pub geometry: GeometryKind,

    /// 三角形的颜色 (RGBA)
    #[serde(default = "default_triangle_color")]
    pub triangle_color: [f32; 4],

    /// 立方体参数
    #[serde(default)]
    pub cube: CubeConfig,

    /// 相机参数
    #[serde(default)]
    pub camera: CameraConfig,
}

fn default_eye() -> [f32; 3] { [0.0, 1.5, 4.0] }
fn default_fov() -> f32 { 45.0 }
fn default_near_clip() -> f32 { 0.1 }
fn default_far_clip() -> f32 { 100.0 }
fn default_rotation_speed() -> f32 { 45.0 }
fn default_rotation_axis() -> [f32; 3] { [0.3, 1.0, 0.2] }
fn default_clear_color() -> [f32; 4] { [0.1, 0.3, 0.2, 1.0] }
fn default_geometry() -> GeometryKind { GeometryKind::Triangle }
fn default_triangle_color() -> [f32; 4] { [1.0, 0.5, 0.2, 1.0] }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_eye(),
            fov: default_fov(),
            near_clip: default_near_clip(),
            far_clip: default_far_clip(),
        }
    }
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            rotation_speed: default_rotation_speed(),
            rotation_axis: default_rotation_axis(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            clear_color: default_clear_color(),
            geometry: default_geometry(),
            triangle_color: default_triangle_color(),
            cube: CubeConfig::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl CameraConfig {
    /// 创建看向原点的视图矩阵
    pub fn view_matrix(&self) -> Matrix4 {
        let eye = Vector3::new(self.position[0], self.position[1], self.position[2]);
        math::look_at_origin(&eye)
    }

    /// 创建透视投影矩阵（深度范围 0..1）
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Matrix4 {
        math::perspective(aspect_ratio, self.fov.to_radians(), self.near_clip, self.far_clip)
    }
}

impl SceneConfig {
    /// 从文件加载场景配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            SandboxError::Config(ConfigError::FileNotFound(format!(
                "Failed to read scene config file '{}': {}",
                path.display(),
                e
            )))
        })?;

        toml::from_str(&contents).map_err(|e| {
            SandboxError::Config(ConfigError::ParseError(format!(
                "Failed to parse scene config: {}",
                e
            )))
        })
    }

    /// 从文件加载，如果文件不存在或无法解析则返回默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Scene config '{}' not found, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(path) {
            Ok(config) => {
                tracing::info!("Loaded scene config from: {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// 验证场景配置
    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        if !(camera.near_clip > 0.0) || camera.far_clip <= camera.near_clip {
            return Err(ConfigError::InvalidValue {
                field: "camera.near_clip/far_clip".to_string(),
                reason: "Clip planes must satisfy 0 < near < far".to_string(),
            }
            .into());
        }

        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::InvalidValue {
                field: "camera.fov".to_string(),
                reason: "Field of view must be within (0, 180) degrees".to_string(),
            }
            .into());
        }

        let axis = self.cube.rotation_axis;
        if axis.iter().all(|v| *v == 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "cube.rotation_axis".to_string(),
                reason: "Rotation axis must not be zero".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene() {
        let scene = SceneConfig::default();
        assert_eq!(scene.clear_color, [0.1, 0.3, 0.2, 1.0]);
        assert_eq!(scene.triangle_color, [1.0, 0.5, 0.2, 1.0]);
        assert_eq!(scene.geometry, GeometryKind::Triangle);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_scene_from_toml() {
        let scene: SceneConfig = toml::from_str(
            r#"
            geometry = "cube"
            clear_color = [0.0, 0.0, 0.0, 1.0]

            [cube]
            rotation_speed = 90.0
            "#,
        )
        .unwrap();

        assert_eq!(scene.geometry, GeometryKind::Cube);
        assert_eq!(scene.cube.rotation_speed, 90.0);
        assert_eq!(scene.cube.rotation_axis, [0.3, 1.0, 0.2]);
    }

    #[test]
    fn test_invalid_camera_rejected() {
        let mut scene = SceneConfig::default();
        scene.camera.far_clip = 0.05;
        assert!(scene.validate().is_err());

        let mut scene = SceneConfig::default();
        scene.cube.rotation_axis = [0.0; 3];
        assert!(scene.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let scene = SceneConfig::from_file_or_default("no/such/scene.toml");
        assert_eq!(scene.geometry, GeometryKind::Triangle);
    }
}
