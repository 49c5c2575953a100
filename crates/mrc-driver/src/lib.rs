//! # MRC Driver
//!
//! 命令中继会话层：
//!
//! - 控制通道命令解析与翻译（[`BridgeCommand`] → [`Dispatch`]）
//! - 连接/活动状态机（[`ConnectionState`]、[`StatusTracker`]）
//! - 事务日志（[`Journal`]）
//! - 会话与事件循环（[`Session`]、[`EventLoop`]）
//!
//! 会话只通过 `mrc-serial` 的 `Connector` 打开链路，测试时可换成 mock 实现。

pub mod command;
mod config;
mod error;
#[cfg(unix)]
pub mod event_loop;
pub mod journal;
pub mod session;
pub mod state;
pub mod translate;

pub use command::{BridgeCommand, CommandError};
pub use config::{BridgeConfig, ConfigError};
pub use error::SessionError;
#[cfg(unix)]
pub use event_loop::{ControlChannel, EventLoop, ExitReason, NonBlockingStdin};
pub use journal::{Direction, Journal, LogRecord};
pub use session::{BANNER, CONNECT_HINT, Session, SessionOptions};
pub use state::{ConnectionState, StatusTracker, status_line_for_code};
pub use translate::{Dispatch, translate};
