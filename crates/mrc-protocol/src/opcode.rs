//! 操作码定义
//!
//! 每帧 `:` 之后的单个字符。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 帧操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    /// 'Q'：指令入队
    Queue = 0x51,
    /// 'E'：立即执行
    Execute = 0x45,
    /// 'W'：写入程序存储
    Write = 0x57,
    /// 'B'：查询缓冲区大小
    BufferSize = 0x42,
}

impl Opcode {
    pub fn as_char(self) -> char {
        u8::from(self) as char
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_letters() {
        assert_eq!(Opcode::Queue.as_char(), 'Q');
        assert_eq!(Opcode::Execute.as_char(), 'E');
        assert_eq!(Opcode::Write.as_char(), 'W');
        assert_eq!(Opcode::BufferSize.as_char(), 'B');
    }

    #[test]
    fn test_opcode_from_byte() {
        assert_eq!(Opcode::try_from(b'E').unwrap(), Opcode::Execute);
        assert!(Opcode::try_from(b'X').is_err());
    }
}
