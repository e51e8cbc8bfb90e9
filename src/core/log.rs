//! 日志系统模块
//!
//! 基于 `tracing` 提供日志记录功能。控制台输出形如：
//!
//! ```text
//! [INFO] winit event loop has been initialized
//! [WARNING] Couldn't load the font file, using the default one
//! [ERROR] Failed to create the Vulkan device
//! ```
//!
//! `WARN` 及以上级别写入 stderr，其余写入 stdout。
//! 可选地同时写入按天滚动的日志文件（不带 ANSI 颜色）。

use std::fmt;
use std::path::Path;

use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{
        format::{self, FormatEvent, FormatFields},
        writer::MakeWriterExt,
        FmtContext,
    },
    prelude::*,
    registry::LookupSpan,
    EnvFilter,
};

use super::config::LogLevel;
use super::error::{Result, SandboxError};

/// 输出 `[LEVEL] message key=value` 格式的事件格式化器
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketedFormat;

/// 日志级别在方括号中的名称
pub fn level_tag(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

impl<S, N> FormatEvent<S, N> for BracketedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "[{}] ", level_tag(event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 初始化日志系统
///
/// 必须在程序开始时调用一次，重复调用返回错误。
///
/// # 参数
///
/// * `level` - 日志级别（`RUST_LOG` 环境变量优先）
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "gui_sandbox.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // 图形库内部的日志非常多，只保留警告
        EnvFilter::new(format!(
            "{},wgpu_core=warn,wgpu_hal=warn,naga=warn",
            level_directive(level)
        ))
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(BracketedFormat)
        .with_writer(std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout));

    let file_layer = if file_output {
        let log_path = log_file_path.unwrap_or("gui_sandbox.log");
        let path = Path::new(log_path);
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("gui_sandbox.log");

        // 创建滚动文件 appender（每天滚动）
        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        Some(
            tracing_subscriber::fmt::layer()
                .event_format(BracketedFormat)
                .with_ansi(false)
                .with_writer(file_appender),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SandboxError::Log(e.to_string()))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

/// 日志级别转换
impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(&Level::WARN), "WARNING");
        assert_eq!(level_tag(&Level::INFO), "INFO");
    }

    #[test]
    fn test_bracketed_lines() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(BracketedFormat)
            .with_writer(captured.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Window has been created");
            tracing::warn!(width = 800, "Small window");
        });

        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[INFO] Window has been created");
        assert!(lines[1].starts_with("[WARNING] "));
        assert!(lines[1].contains("Small window"));
        assert!(lines[1].contains("width=800"));
    }
}
