//! # MRC Serial Link Layer
//!
//! 串口硬件抽象层：会话层只通过 [`Link`] / [`Connector`] 访问物理链路，
//! 不直接接触原始 IO。
//!
//! - `native`（默认）：基于 `serialport` 的真实串口实现 [`SerialLink`]
//! - `mock`：内存中的 [`mock::MockLink`]，用于无硬件测试

use std::io;
use std::time::Duration;
use thiserror::Error;

// 重新导出 mrc-protocol 中的 Frame
pub use mrc_protocol::Frame;

#[cfg(feature = "native")]
mod native;

#[cfg(feature = "native")]
pub use native::{SerialConnector, SerialLink};

#[cfg(feature = "mock")]
pub mod mock;

/// 链路层统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    /// 设备无法打开（权限不足、设备不存在、被占用）
    #[error("Link unavailable ({port}): {message}")]
    Unavailable { port: String, message: String },

    /// 写入失败（管道断开、设备拔出）
    #[error("Link write error: {0}")]
    Write(#[source] io::Error),

    /// 读取时发现设备已关闭
    #[error("Link closed: {0}")]
    Closed(String),

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
}

impl LinkError {
    pub fn unavailable(port: impl Into<String>, message: impl ToString) -> Self {
        Self::Unavailable {
            port: port.into(),
            message: message.to_string(),
        }
    }

    /// 链路是否已不可再用（需要重新 CONNECT）
    pub fn is_fatal(&self) -> bool {
        matches!(self, LinkError::Write(_) | LinkError::Closed(_))
    }
}

/// 已打开的双向字节链路
pub trait Link {
    /// 链路名（如 `/dev/ttyUSB0`）
    fn name(&self) -> &str;

    /// 写入全部字节
    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    /// 读取直到遇到终止符或超时
    ///
    /// 超时不是错误：返回截至超时已累积的字节（可能为空）。
    /// 不会阻塞超过 `timeout`。
    fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>, LinkError>;

    /// 内核缓冲区中尚未读取的字节数
    fn bytes_pending(&mut self) -> Result<usize, LinkError> {
        Ok(0)
    }

    /// 可供事件轮询注册的文件描述符
    #[cfg(unix)]
    fn raw_fd(&self) -> Option<std::os::unix::io::RawFd> {
        None
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<(), LinkError> {
        self.write(&frame.encode())
    }
}

/// 按端口名打开链路
pub trait Connector {
    type Link: Link;

    fn open(&mut self, port: &str) -> Result<Self::Link, LinkError>;
}

/// 链路打开参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// 单次读取的超时上限
    pub timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: mrc_protocol::DEFAULT_BAUD_RATE,
            timeout: Duration::from_millis(500),
        }
    }
}
