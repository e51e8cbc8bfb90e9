//! 启动顺序与循环状态
//!
//! ```text
//! 启动：Window → Backend → Gui
//! 循环：Running ──(收到关闭请求)──→ Stopping
//! 清理：只在 Stopping 之后进行，顺序与启动相反
//! ```

use std::fmt;

use crate::core::error::{Result, SandboxError};

/// 启动阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    Window,
    Backend,
    Gui,
}

impl StartupStage {
    const ORDER: [StartupStage; 3] = [StartupStage::Window, StartupStage::Backend, StartupStage::Gui];
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupStage::Window => write!(f, "window"),
            StartupStage::Backend => write!(f, "graphics backend"),
            StartupStage::Gui => write!(f, "GUI"),
        }
    }
}

/// 启动顺序检查
///
/// 每个阶段都依赖前一个阶段已经完成。
#[derive(Debug, Clone, Default)]
pub struct StartupSequence {
    completed: usize,
}

impl StartupSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记一个阶段完成
    ///
    /// 阶段跳过或乱序时返回错误，指出缺失的依赖。
    pub fn complete(&mut self, stage: StartupStage) -> Result<()> {
        match StartupStage::ORDER.get(self.completed) {
            Some(expected) if *expected == stage => {
                self.completed += 1;
                tracing::debug!("Startup stage completed: {}", stage);
                Ok(())
            }
            Some(expected) => Err(SandboxError::Initialization(format!(
                "Cannot initialize the {} before the {}",
                stage, expected
            ))),
            None => Err(SandboxError::Initialization(format!(
                "The {} has already been initialized",
                stage
            ))),
        }
    }

    /// 已完成的阶段
    pub fn completed(&self) -> &[StartupStage] {
        &StartupStage::ORDER[..self.completed]
    }

    /// 给定阶段是否已经完成
    pub fn is_done(&self, stage: StartupStage) -> bool {
        self.completed().contains(&stage)
    }
}

/// 主循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Running,
    Stopping,
}

impl LoopState {
    /// 根据窗口的关闭标志转换状态，`Stopping` 不会回到 `Running`
    pub fn observe_close(&mut self, close_requested: bool) {
        if close_requested && *self == LoopState::Running {
            tracing::info!("Close requested, leaving the main loop");
            *self = LoopState::Stopping;
        }
    }

    /// 致命错误时停止循环
    pub fn stop(&mut self) {
        *self = LoopState::Stopping;
    }

    pub fn is_running(&self) -> bool {
        *self == LoopState::Running
    }

    /// 只有离开主循环之后才能清理
    pub fn can_teardown(&self) -> bool {
        *self == LoopState::Stopping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_in_order() {
        let mut startup = StartupSequence::new();
        assert!(startup.complete(StartupStage::Window).is_ok());
        assert!(startup.complete(StartupStage::Backend).is_ok());
        assert!(startup.complete(StartupStage::Gui).is_ok());
        assert_eq!(startup.completed(), &StartupStage::ORDER);
    }

    #[test]
    fn test_backend_requires_window() {
        let mut startup = StartupSequence::new();
        let err = startup.complete(StartupStage::Backend).unwrap_err();
        assert!(err.to_string().contains("before the window"));
        assert!(startup.completed().is_empty());
    }

    #[test]
    fn test_gui_requires_backend() {
        let mut startup = StartupSequence::new();
        startup.complete(StartupStage::Window).unwrap();
        let err = startup.complete(StartupStage::Gui).unwrap_err();
        assert!(err.to_string().contains("before the graphics backend"));
        assert!(startup.is_done(StartupStage::Window));
        assert!(!startup.is_done(StartupStage::Gui));
    }

    #[test]
    fn test_stage_cannot_repeat() {
        let mut startup = StartupSequence::new();
        for stage in StartupStage::ORDER {
            startup.complete(stage).unwrap();
        }
        assert!(startup.complete(StartupStage::Gui).is_err());
    }

    #[test]
    fn test_teardown_only_after_close() {
        let mut state = LoopState::default();
        assert!(state.is_running());
        assert!(!state.can_teardown());

        state.observe_close(false);
        assert!(!state.can_teardown());

        state.observe_close(true);
        assert!(state.can_teardown());

        state.observe_close(false);
        assert_eq!(state, LoopState::Stopping);
    }
}
