//! 性能统计模块
//!
//! PerformanceMetrics 用于跟踪和计算帧率、帧时间等性能指标。

use std::time::Duration;

/// FPS 的刷新间隔
const UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// 性能统计（帧率、帧时间）
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    frame_count: u32,
    accumulated: Duration,
    fps: f32,
    frame_time_ms: f32,
}

impl PerformanceMetrics {
    /// 创建新的性能统计器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧
    pub fn record_frame(&mut self, delta: Duration) {
        self.frame_count += 1;
        self.accumulated += delta;

        // 每秒更新一次 FPS
        if self.accumulated >= UPDATE_INTERVAL {
            self.fps = self.frame_count as f32 / self.accumulated.as_secs_f32();
            self.frame_time_ms = 1000.0 / self.fps;
            self.frame_count = 0;
            self.accumulated = Duration::ZERO;
        }
    }

    /// 获取当前 FPS
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// 获取当前帧时间（毫秒）
    pub fn frame_time_ms(&self) -> f32 {
        self.frame_time_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_updates_once_per_second() {
        let mut metrics = PerformanceMetrics::new();
        for _ in 0..59 {
            metrics.record_frame(Duration::from_millis(16));
        }
        assert_eq!(metrics.fps(), 0.0);

        for _ in 0..4 {
            metrics.record_frame(Duration::from_millis(16));
        }
        // 63 帧 × 16ms = 1.008s
        assert!((metrics.fps() - 62.5).abs() < 0.1);
        assert!((metrics.frame_time_ms() - 16.0).abs() < 0.1);
    }
}
