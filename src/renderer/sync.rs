//! 交换链同步状态
//!
//! 与具体图形 API 无关的帧同步簿记：
//!
//! - [`SwapchainState`]：记录交换链是否需要重建
//! - [`SemaphoreRing`]：在每个交换链图像对应的信号量对之间轮转
//!
//! # 重建流程
//!
//! ```text
//! acquire/present 返回 OUT_OF_DATE 或 SUBOPTIMAL
//!     ↓ mark_out_of_date()
//! 本帧跳过渲染
//!     ↓ 下一帧 begin_frame
//! 帧缓冲区宽高都 > 0 → 重建交换链 → finish_rebuild()，帧序号归零
//! 否则继续等待
//! ```

/// 交换链状态跟踪
#[derive(Debug, Clone, Default)]
pub struct SwapchainState {
    rebuild_pending: bool,
    rebuild_count: u64,
}

impl SwapchainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取或呈现时发现交换链过期
    pub fn mark_out_of_date(&mut self) {
        if !self.rebuild_pending {
            tracing::debug!("Swapchain is out of date, scheduling a rebuild");
        }
        self.rebuild_pending = true;
    }

    /// 是否等待重建
    pub fn is_rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    /// 给定尺寸下能否立即重建
    pub fn can_rebuild(&self, width: u32, height: u32) -> bool {
        self.rebuild_pending && width > 0 && height > 0
    }

    /// 重建完成
    pub fn finish_rebuild(&mut self) {
        self.rebuild_pending = false;
        self.rebuild_count += 1;
    }

    /// 已完成的重建次数
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }
}

/// 信号量环
///
/// 信号量对的数量等于交换链图像数，每成功呈现一次前进一格。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreRing {
    index: usize,
    len: usize,
}

impl SemaphoreRing {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len: len.max(1) }
    }

    /// 当前使用的信号量对下标
    pub fn current(&self) -> usize {
        self.index
    }

    /// 前进到下一对
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.len;
    }

    /// 交换链重建后按新的图像数重置
    pub fn reset(&mut self, len: usize) {
        *self = Self::new(len);
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_waits_for_non_zero_size() {
        let mut state = SwapchainState::new();
        assert!(!state.can_rebuild(800, 600));

        state.mark_out_of_date();
        state.mark_out_of_date();
        assert!(state.is_rebuild_pending());
        assert!(!state.can_rebuild(0, 600));
        assert!(!state.can_rebuild(800, 0));
        assert!(state.can_rebuild(800, 600));

        state.finish_rebuild();
        assert!(!state.is_rebuild_pending());
        assert_eq!(state.rebuild_count(), 1);
    }

    #[test]
    fn test_semaphore_ring_wraps() {
        let mut ring = SemaphoreRing::new(3);
        let visited: Vec<usize> = (0..5)
            .map(|_| {
                let i = ring.current();
                ring.advance();
                i
            })
            .collect();
        assert_eq!(visited, vec![0, 1, 2, 0, 1]);

        ring.reset(2);
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_empty_ring_is_clamped() {
        let mut ring = SemaphoreRing::new(0);
        ring.advance();
        assert_eq!(ring.current(), 0);
    }
}
