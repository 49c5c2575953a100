//! # MRC Protocol
//!
//! MRC 控制器串口 ASCII 协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量（帧定界符、哨兵序号、波特率）
//! - `opcode`: 单字符操作码
//! - `control`: 指令构建与数值格式化
//! - `feedback`: 控制器应答解析（完成确认、关节角读数）
//!
//! ## 帧格式
//!
//! ```text
//! ':' <opcode> <payload> '\r'
//! ```
//!
//! 载荷内字段以单个空格分隔，载荷本身不允许包含终止符。

pub mod constants;
pub mod control;
pub mod feedback;
pub mod opcode;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use opcode::*;

use std::fmt;
use thiserror::Error;

/// MRC 线上帧
///
/// # 设计目的
///
/// `Frame` 是指令层与串口层之间的中间抽象：
/// - **不变量**：帧总是带有起始符 `:` 与终止符 `\r`，载荷中不含终止符
/// - **层次解耦**：串口层只搬运字节，不关心指令语义
///
/// # 示例
///
/// ```rust
/// use mrc_protocol::{Frame, Opcode};
///
/// let frame = Frame::new(Opcode::Execute, "V 50").unwrap();
/// assert_eq!(frame.encode(), b":EV 50\r");
///
/// let decoded = Frame::decode(b":EV 50\r").unwrap();
/// assert_eq!(decoded, frame);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    opcode: Opcode,
    payload: String,
}

impl Frame {
    /// 创建帧，校验载荷
    pub fn new(opcode: Opcode, payload: impl Into<String>) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        if payload.as_bytes().contains(&FRAME_END) {
            return Err(ProtocolError::TerminatorInPayload);
        }
        if !payload.is_ascii() {
            return Err(ProtocolError::NonAscii);
        }
        Ok(Self { opcode, payload })
    }

    /// 创建无载荷帧（如 `:Q\r`、`:W\r`）
    pub fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            payload: String::new(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// 编码为线上字节：`':' + opcode + payload + '\r'`
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.payload.len() + 3);
        out.push(FRAME_START);
        out.push(self.opcode.into());
        out.extend_from_slice(self.payload.as_bytes());
        out.push(FRAME_END);
        out
    }

    /// 从一个完整帧（含两端定界符）解码
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let Some((&first, rest)) = bytes.split_first() else {
            return Err(ProtocolError::Empty);
        };
        if first != FRAME_START {
            return Err(ProtocolError::MissingStart);
        }
        let Some((&last, body)) = rest.split_last() else {
            return Err(ProtocolError::MissingTerminator);
        };
        if last != FRAME_END {
            return Err(ProtocolError::MissingTerminator);
        }
        let Some((&op, payload)) = body.split_first() else {
            return Err(ProtocolError::Empty);
        };
        let opcode = Opcode::try_from(op).map_err(|_| ProtocolError::UnknownOpcode(op))?;
        let payload = std::str::from_utf8(payload).map_err(|_| ProtocolError::NonAscii)?;
        Self::new(opcode, payload)
    }
}

/// 日志友好的文本形式（不含终止符）
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            FRAME_START as char,
            self.opcode.as_char(),
            self.payload
        )
    }
}

/// 按终止符切分字节流的增量解码器
///
/// 逐字节累积，遇到终止符即产出一行（包含终止符）。
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    terminator: u8,
}

impl FrameDecoder {
    pub fn new(terminator: u8) -> Self {
        Self {
            buf: Vec::new(),
            terminator,
        }
    }

    /// 推入一个字节；完整行出现时返回它
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        self.buf.push(byte);
        if byte == self.terminator {
            Some(std::mem::take(&mut self.buf))
        } else {
            None
        }
    }

    /// 尚未遇到终止符的字节数
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(FRAME_END)
    }
}

/// 将一次读取的字节切分为完整行
///
/// 末尾不完整的部分直接丢弃，不跨读取边界缓存。
pub fn decode_stream(bytes: &[u8], terminator: u8) -> Vec<Vec<u8>> {
    let mut decoder = FrameDecoder::new(terminator);
    bytes.iter().filter_map(|&b| decoder.push(b)).collect()
}

/// 协议错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Empty frame")]
    Empty,

    #[error("Frame does not start with ':'")]
    MissingStart,

    #[error("Frame is not terminated by '\\r'")]
    MissingTerminator,

    #[error("Payload contains the frame terminator")]
    TerminatorInPayload,

    #[error("Payload is not ASCII")]
    NonAscii,

    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("No joint values in reply: {0:?}")]
    NoJointValues(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_execute_frame() {
        let frame = Frame::new(Opcode::Execute, "N42 D 1000").unwrap();
        assert_eq!(frame.encode(), b":EN42 D 1000\r".to_vec());
        assert_eq!(frame.to_string(), ":EN42 D 1000");
    }

    #[test]
    fn test_bare_queue_frame() {
        assert_eq!(Frame::bare(Opcode::Queue).encode(), b":Q\r".to_vec());
    }

    #[test]
    fn test_terminator_in_payload_rejected() {
        let err = Frame::new(Opcode::Execute, "V 1\rV 2").unwrap_err();
        assert_eq!(err, ProtocolError::TerminatorInPayload);
    }

    #[test]
    fn test_decode_requires_both_delimiters() {
        assert_eq!(Frame::decode(b"EV 1\r"), Err(ProtocolError::MissingStart));
        assert_eq!(
            Frame::decode(b":EV 1"),
            Err(ProtocolError::MissingTerminator)
        );
        assert_eq!(Frame::decode(b""), Err(ProtocolError::Empty));
        assert_eq!(Frame::decode(b":\r"), Err(ProtocolError::Empty));
    }

    #[test]
    fn test_decode_unknown_opcode() {
        assert_eq!(
            Frame::decode(b":Z123\r"),
            Err(ProtocolError::UnknownOpcode(b'Z'))
        );
    }

    #[test]
    fn test_decode_buffer_size_query() {
        let frame = Frame::decode(b":B\r").unwrap();
        assert_eq!(frame.opcode(), Opcode::BufferSize);
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn test_decode_stream_splits_on_terminator() {
        let lines = decode_stream(b":N142\r:R0 1.0\r", FRAME_END);
        assert_eq!(lines, vec![b":N142\r".to_vec(), b":R0 1.0\r".to_vec()]);
    }

    #[test]
    fn test_decode_stream_discards_partial_tail() {
        let lines = decode_stream(b":N142\r:R0 1.", FRAME_END);
        assert_eq!(lines, vec![b":N142\r".to_vec()]);

        assert!(decode_stream(b"no terminator here", FRAME_END).is_empty());
        assert!(decode_stream(b"", FRAME_END).is_empty());
    }

    #[test]
    fn test_frame_decoder_pending() {
        let mut decoder = FrameDecoder::default();
        assert_eq!(decoder.push(b':'), None);
        assert_eq!(decoder.push(b'N'), None);
        assert_eq!(decoder.pending(), 2);
        assert_eq!(decoder.push(b'\r'), Some(b":N\r".to_vec()));
        assert_eq!(decoder.pending(), 0);
    }

    fn opcode_strategy() -> impl Strategy<Value = Opcode> {
        prop_oneof![
            Just(Opcode::Queue),
            Just(Opcode::Execute),
            Just(Opcode::Write),
            Just(Opcode::BufferSize),
        ]
    }

    proptest! {
        /// 任意不含终止符的 ASCII 载荷都可以无损往返
        #[test]
        fn prop_encode_decode_roundtrip(op in opcode_strategy(), payload in "[ -~\t\n]{0,64}") {
            let frame = Frame::new(op, payload.clone()).unwrap();
            let decoded = Frame::decode(&frame.encode()).unwrap();
            prop_assert_eq!(decoded.opcode(), op);
            prop_assert_eq!(decoded.payload(), payload.as_str());
        }

        /// 编码后的帧在字节流中恰好切分为一行
        #[test]
        fn prop_encoded_frame_is_single_line(op in opcode_strategy(), payload in "[ -~]{0,64}") {
            let bytes = Frame::new(op, payload).unwrap().encode();
            let lines = decode_stream(&bytes, FRAME_END);
            prop_assert_eq!(lines.len(), 1);
            prop_assert_eq!(&lines[0], &bytes);
        }
    }
}
