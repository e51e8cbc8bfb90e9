//! 场景动画
//!
//! 根据场景配置和帧时间生成每帧的 [`SceneFrame`]。

use std::time::Duration;

use crate::core::math::{self, Matrix4};
use crate::core::scene::{GeometryKind, SceneConfig};
use crate::geometry::{primitives, MeshData};

use super::frame::SceneFrame;

/// 运行时场景
#[derive(Debug, Clone)]
pub struct Scene {
    config: SceneConfig,
    /// 立方体当前旋转角（度）
    angle: f32,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self { config, angle: 0.0 }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn geometry(&self) -> GeometryKind {
        self.config.geometry
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.config.clear_color
    }

    /// 当前几何体的网格数据
    pub fn mesh(&self) -> Option<MeshData> {
        match self.config.geometry {
            GeometryKind::None => None,
            GeometryKind::Triangle => Some(primitives::triangle(self.config.triangle_color)),
            GeometryKind::Cube => Some(primitives::cube()),
        }
    }

    /// 推进动画
    pub fn advance(&mut self, delta: Duration) {
        if self.config.geometry == GeometryKind::Cube {
            self.angle = (self.angle + self.config.cube.rotation_speed * delta.as_secs_f32()) % 360.0;
        }
    }

    /// 当前旋转角（度）
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// 生成本帧参数
    pub fn frame(&self, aspect_ratio: f32) -> SceneFrame {
        let mvp = match self.config.geometry {
            GeometryKind::None | GeometryKind::Triangle => Matrix4::identity(),
            GeometryKind::Cube => {
                let camera = &self.config.camera;
                let model = math::rotation_about(self.config.cube.rotation_axis, self.angle.to_radians());
                camera.projection_matrix(aspect_ratio) * camera.view_matrix() * model
            }
        };

        SceneFrame {
            geometry: self.config.geometry,
            mvp: math::to_cols_array(&mvp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> [[f32; 4]; 4] {
        math::to_cols_array(&Matrix4::identity())
    }

    #[test]
    fn test_triangle_is_passthrough() {
        let mut scene = Scene::new(SceneConfig::default());
        scene.advance(Duration::from_secs(1));
        assert_eq!(scene.angle(), 0.0);
        assert_eq!(scene.frame(1.5).mvp, identity());
        assert_eq!(scene.mesh().map(|m| m.vertex_count()), Some(3));
    }

    #[test]
    fn test_cube_rotates_with_time() {
        let mut config = SceneConfig::default();
        config.geometry = GeometryKind::Cube;
        config.cube.rotation_speed = 90.0;
        let mut scene = Scene::new(config);

        let before = scene.frame(1.0);
        scene.advance(Duration::from_millis(500));
        assert!((scene.angle() - 45.0).abs() < 1e-3);
        assert_ne!(scene.frame(1.0).mvp, before.mvp);

        scene.advance(Duration::from_secs(4));
        assert!(scene.angle() < 360.0);
    }

    #[test]
    fn test_no_geometry() {
        let mut config = SceneConfig::default();
        config.geometry = GeometryKind::None;
        let scene = Scene::new(config);
        assert!(scene.mesh().is_none());
        assert_eq!(scene.frame(1.0).geometry, GeometryKind::None);
    }
}
