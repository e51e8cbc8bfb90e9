//! 时间工具
//!
//! 启动/退出横幅使用的本地时间戳，以及帧循环使用的帧计时器。

use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeZone};

/// 时间戳格式：`dd.mm.YYYY HH:MM:SS.mmm +zzzz`
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S%.3f %z";

/// 格式化给定时刻
pub fn format_timestamp<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// 当前本地时间
pub fn current_time() -> String {
    format_timestamp(&Local::now())
}

/// 打印 `[时间戳] Start` 一类的横幅
///
/// 横幅不经过日志系统，日志初始化之前也可以输出。
pub fn print_banner(label: &str) {
    println!("[{}] {}\n- - -\n", current_time(), label);
}

/// 帧计时器
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
}

/// 一次 `tick` 的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// 自启动以来的时间
    pub elapsed: Duration,
    /// 距上一帧的时间
    pub delta: Duration,
    /// 帧序号，从 0 开始
    pub frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self { start: now, last: now, frame_index: 0 }
    }

    /// 开始新的一帧
    pub fn tick(&mut self) -> FrameTiming {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTiming {
        let timing = FrameTiming {
            elapsed: now.saturating_duration_since(self.start),
            delta: now.saturating_duration_since(self.last),
            frame_index: self.frame_index,
        };
        self.last = now;
        self.frame_index += 1;
        timing
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_timestamp_format() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let time = offset
            .with_ymd_and_hms(2021, 11, 7, 9, 5, 3)
            .unwrap()
            + chrono::Duration::milliseconds(42);

        assert_eq!(format_timestamp(&time), "07.11.2021 09:05:03.042 +0300");
    }

    #[test]
    fn test_negative_offset() {
        let offset = FixedOffset::west_opt(5 * 3600 + 1800).unwrap();
        let time = offset.with_ymd_and_hms(2022, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(format_timestamp(&time), "31.01.2022 23:59:59.000 -0530");
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::new();
        let start = clock.start;

        let first = clock.tick_at(start + Duration::from_millis(16));
        assert_eq!(first.frame_index, 0);
        assert_eq!(first.delta, Duration::from_millis(16));

        let second = clock.tick_at(start + Duration::from_millis(40));
        assert_eq!(second.frame_index, 1);
        assert_eq!(second.delta, Duration::from_millis(24));
        assert_eq!(second.elapsed, Duration::from_millis(40));
    }
}
