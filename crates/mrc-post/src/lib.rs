//! # MRC Post
//!
//! 离线编程后处理器：把运动/IO 调用序列转换为带行号的 MRC 程序文本，
//! 保存为 `.mril` 文件，或通过串口以写入帧下载到控制器。
//!
//! ```rust
//! use mrc_post::MrcPost;
//!
//! let mut post = MrcPost::new();
//! post.set_speed(50.0);
//! post.pause(1000.0);
//! assert_eq!(post.program(), "N1  V 50.00\nN2  D 1000\n");
//! ```

mod program;
mod upload;

pub use program::{IoValue, MAX_AXES, MrcPost, PROGRAM_EXTENSION, Pose, joints_to_str, pose_to_str};
pub use upload::{SendReport, program_frames, program_size};

pub use mrc_protocol::MAX_PROGRAM_BYTES;

use mrc_protocol::ProtocolError;
use mrc_serial::LinkError;
use thiserror::Error;

/// 后处理器错误类型
#[derive(Error, Debug)]
pub enum PostError {
    /// 程序行无法编码为写入帧
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 下载时链路错误
    #[error("Link error: {0}")]
    Link(#[from] LinkError),
}
