//! 控制器应答解析
//!
//! 控制器以 `\r` 结尾的行应答。执行完成时回送 `N1<序号>`，
//! 序号从第 1 个字节开始（第 0 个字节为起始符）。

use crate::{ProtocolError, parse_number};

/// 完成确认标记：`N1` + 序号
pub fn completion_marker(sequence: u32) -> String {
    format!("N1{sequence}")
}

/// 判断一行应答是否为指定序号的完成确认
///
/// 对哨兵序号 42 而言即：第 1 个字节为 `N`，第 2..5 个字节为 `142`。
pub fn is_completion_ack(line: &[u8], sequence: u32) -> bool {
    let marker = completion_marker(sequence);
    line.get(1..)
        .is_some_and(|rest| rest.starts_with(marker.as_bytes()))
}

/// 去掉行尾的 `\r` / `\n`
pub fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// 关节角读数（`R<index> <value>` 序列）
///
/// 保留控制器回送的原始数值文本，仅校验其可解析。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointReadout {
    values: Vec<String>,
}

impl JointReadout {
    /// 解析关节角应答行
    ///
    /// 第一个 `R` 之前的内容（起始符、序号等）被忽略；
    /// 每个 `R` 后跟关节编号，编号之后的文本即角度值。
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let text = trim_line(line);
        let mut values = Vec::new();
        for segment in text.split('R').skip(1) {
            let index_len = segment.bytes().take_while(u8::is_ascii_digit).count();
            if index_len == 0 {
                continue;
            }
            let value = segment[index_len..].trim();
            if value.is_empty() {
                continue;
            }
            parse_number(value)?;
            values.push(value.to_string());
        }
        if values.is_empty() {
            return Err(ProtocolError::NoJointValues(text.to_string()));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// 数值形式
    pub fn as_f64(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|v| parse_number(v).ok())
            .collect()
    }

    /// 以空格连接的数值行
    pub fn joined(&self) -> String {
        self.values.join(" ")
    }
}
