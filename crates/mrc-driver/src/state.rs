//! 连接/活动状态机
//!
//! 状态码沿用上位机约定的数值（1..=6），状态行格式为 `SMS:<text>`。

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 连接/活动状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ConnectionState {
    /// 链路异常（写入失败等）
    ConnectionProblem = 1,
    /// 链路已断开（读到 EOF 或主动断开）
    Disconnected = 2,
    /// 尚未连接（初始默认值）
    NotConnected = 3,
    /// 空闲，可接受新指令
    Ready = 4,
    /// 正在执行指令
    Working = 5,
    /// 等待外部条件
    Waiting = 6,
}

impl ConnectionState {
    /// 状态行中的文本
    pub fn status_text(self) -> &'static str {
        match self {
            ConnectionState::ConnectionProblem => "Connection problems",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::NotConnected => "Not connected",
            ConnectionState::Ready => "Ready",
            ConnectionState::Working => "Working...",
            ConnectionState::Waiting => "Waiting...",
        }
    }

    /// `SMS:<text>`
    pub fn status_line(self) -> String {
        format!("SMS:{}", self.status_text())
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// 按数值状态码生成状态行；未知状态码输出 `SMS:Unknown status`
pub fn status_line_for_code(code: u8) -> String {
    match ConnectionState::try_from(code) {
        Ok(state) => state.status_line(),
        Err(_) => "SMS:Unknown status".to_string(),
    }
}

/// 状态跟踪器
///
/// 默认每次转换都重新通知（即使状态未变），上位机可将其视为心跳；
/// 开启 `dedup` 后仅在状态实际变化时通知。
#[derive(Debug, Clone)]
pub struct StatusTracker {
    current: ConnectionState,
    dedup: bool,
}

impl StatusTracker {
    pub fn new(dedup: bool) -> Self {
        Self {
            current: ConnectionState::NotConnected,
            dedup,
        }
    }

    pub fn current(&self) -> ConnectionState {
        self.current
    }

    /// 切换状态，返回需要通知的新状态
    pub fn transition(&mut self, next: ConnectionState) -> Option<ConnectionState> {
        let changed = self.current != next;
        self.current = next;
        (changed || !self.dedup).then_some(next)
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(ConnectionState::Ready.status_line(), "SMS:Ready");
        assert_eq!(ConnectionState::Working.status_line(), "SMS:Working...");
        assert_eq!(ConnectionState::Waiting.status_line(), "SMS:Waiting...");
        assert_eq!(
            ConnectionState::ConnectionProblem.status_line(),
            "SMS:Connection problems"
        );
        assert_eq!(ConnectionState::Disconnected.status_line(), "SMS:Disconnected");
        assert_eq!(ConnectionState::NotConnected.status_line(), "SMS:Not connected");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(u8::from(ConnectionState::Ready), 4);
        assert_eq!(status_line_for_code(5), "SMS:Working...");
        assert_eq!(status_line_for_code(0), "SMS:Unknown status");
        assert_eq!(status_line_for_code(42), "SMS:Unknown status");
    }

    #[test]
    fn test_tracker_starts_not_connected() {
        assert_eq!(
            StatusTracker::default().current(),
            ConnectionState::NotConnected
        );
    }

    #[test]
    fn test_tracker_reemits_by_default() {
        let mut tracker = StatusTracker::new(false);
        assert_eq!(
            tracker.transition(ConnectionState::Working),
            Some(ConnectionState::Working)
        );
        assert_eq!(
            tracker.transition(ConnectionState::Working),
            Some(ConnectionState::Working)
        );
    }

    #[test]
    fn test_tracker_dedup() {
        let mut tracker = StatusTracker::new(true);
        assert_eq!(
            tracker.transition(ConnectionState::Ready),
            Some(ConnectionState::Ready)
        );
        assert_eq!(tracker.transition(ConnectionState::Ready), None);
        assert_eq!(
            tracker.transition(ConnectionState::Working),
            Some(ConnectionState::Working)
        );
        assert_eq!(tracker.current(), ConnectionState::Working);
    }
}
