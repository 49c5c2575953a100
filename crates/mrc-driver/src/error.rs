//! 会话层错误类型定义
//!
//! 链路错误与单条命令的编码错误不在此列：前者只改变连接状态，
//! 后者在状态通道上报告，都不会终止会话。

use std::io;
use thiserror::Error;

/// 会话层错误类型
#[derive(Error, Debug)]
pub enum SessionError {
    /// 状态通道写入失败（上位机已退出）
    #[error("Status channel error: {0}")]
    StatusChannel(#[source] io::Error),

    /// 控制通道读取失败
    #[error("Control channel error: {0}")]
    Control(#[source] io::Error),

    /// 事件轮询失败
    #[error("Poll error: {0}")]
    Poll(#[source] io::Error),
}
