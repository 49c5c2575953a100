//! 控制指令构建
//!
//! 指令以助记符字段序列表示，字段之间以单个空格分隔，
//! 最终通过 [`Instruction::to_frame`] 封装为线上帧。

use crate::{FRAME_END, Frame, NUMBER_DECIMALS, Opcode, ProtocolError};

/// 将数值格式化为固件要求的精度（保留 5 位小数）
///
/// 负零统一输出为 `0.00000`。该函数是幂等的：
/// 对已格式化的字符串再次解析并格式化，结果不变。
pub fn format_number(value: f64) -> String {
    let text = format!("{:.*}", NUMBER_DECIMALS, value);
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

/// 解析一个有限数值字段
pub fn parse_number(text: &str) -> Result<f64, ProtocolError> {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ProtocolError::InvalidNumber(text.to_string())),
    }
}

/// 助记符形式的指令（封帧之前）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    opcode: Opcode,
    fields: Vec<String>,
    /// 寄存器列表以空格结尾，与控制器固件的解析方式一致
    trailing_space: bool,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            fields: Vec::new(),
            trailing_space: false,
        }
    }

    /// 立即执行指令（`E`）
    pub fn execute() -> Self {
        Self::new(Opcode::Execute)
    }

    /// 入队指令（`Q`）
    pub fn queue() -> Self {
        Self::new(Opcode::Queue)
    }

    /// 写程序存储指令（`W`）
    pub fn write() -> Self {
        Self::new(Opcode::Write)
    }

    /// 追加一个字段
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// 追加序号字段 `N<id>`
    pub fn sequence(self, id: u32) -> Self {
        self.field(format!("N{id}"))
    }

    /// 追加寄存器字段 `R0 <v0> R1 <v1> ...`
    pub fn registers(mut self, values: &[f64]) -> Self {
        for (i, &v) in values.iter().enumerate() {
            self.fields.push(format!("R{i}"));
            self.fields.push(format_number(v));
        }
        self.trailing_space = true;
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// 载荷文本
    pub fn payload(&self) -> String {
        let mut payload = self.fields.join(" ");
        if self.trailing_space && !payload.is_empty() {
            payload.push(' ');
        }
        payload
    }

    /// 封装为帧；字段中出现终止符时报错
    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        if self
            .fields
            .iter()
            .any(|f| f.as_bytes().contains(&FRAME_END))
        {
            return Err(ProtocolError::TerminatorInPayload);
        }
        Frame::new(self.opcode, self.payload())
    }
}
