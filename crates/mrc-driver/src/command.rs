//! 控制通道命令定义
//!
//! 每行一条命令：命令名 + 以空白分隔的位置参数。
//! 未识别的命令名不是错误，而是原样透传给控制器。

use mrc_protocol::{REGISTER_COUNT, parse_number, trim_line};
use thiserror::Error;

/// 控制通道命令
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    /// `CONNECT <port>`：打开串口
    Connect { port: String },
    /// `MOVJ <j0>..<j5>`：关节运动
    MoveJoint([f64; REGISTER_COUNT]),
    /// `MOVL <p0>..<p5>`：直线运动
    MoveLinear([f64; REGISTER_COUNT]),
    /// `MOVC`：圆弧运动（控制器不支持，拒绝）
    MoveCircular,
    /// `PAUSE <ms>`
    Pause { duration: String },
    /// `SPEED <mm_s>`
    Speed { value: String },
    /// `CJNT`：读取当前关节角
    ReadJoints,
    /// `SETDO <var> <value>`
    SetDigitalOutput { var: String, value: String },
    /// `WAITDI <var> <value>`
    WaitDigitalInput { var: String, value: String },
    /// 其他任意词序列
    Passthrough(Vec<String>),
}

/// 命令解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("{command} expects {expected} argument(s), got {actual}")]
    MissingArguments {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{command}: invalid number {value:?}")]
    InvalidNumber { command: &'static str, value: String },
}

impl BridgeCommand {
    /// 解析一行控制输入
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let words: Vec<&str> = trim_line(line).split_whitespace().collect();
        let Some((&name, args)) = words.split_first() else {
            return Err(CommandError::Empty);
        };

        let command = match name {
            "CONNECT" => {
                let [port] = take::<1>("CONNECT", args)?;
                BridgeCommand::Connect {
                    port: port.to_string(),
                }
            },
            "MOVJ" => BridgeCommand::MoveJoint(registers("MOVJ", args)?),
            "MOVL" => BridgeCommand::MoveLinear(registers("MOVL", args)?),
            "MOVC" => BridgeCommand::MoveCircular,
            "PAUSE" => {
                let [duration] = take::<1>("PAUSE", args)?;
                number("PAUSE", duration)?;
                BridgeCommand::Pause {
                    duration: duration.to_string(),
                }
            },
            "SPEED" => {
                let [value] = take::<1>("SPEED", args)?;
                number("SPEED", value)?;
                BridgeCommand::Speed {
                    value: value.to_string(),
                }
            },
            "CJNT" => BridgeCommand::ReadJoints,
            "SETDO" => {
                let [var, value] = take::<2>("SETDO", args)?;
                BridgeCommand::SetDigitalOutput {
                    var: var.to_string(),
                    value: value.to_string(),
                }
            },
            "WAITDI" => {
                let [var, value] = take::<2>("WAITDI", args)?;
                BridgeCommand::WaitDigitalInput {
                    var: var.to_string(),
                    value: value.to_string(),
                }
            },
            _ => BridgeCommand::Passthrough(words.iter().map(|w| w.to_string()).collect()),
        };
        Ok(command)
    }

    /// 命令名（用于日志）
    pub fn name(&self) -> &str {
        match self {
            BridgeCommand::Connect { .. } => "CONNECT",
            BridgeCommand::MoveJoint(_) => "MOVJ",
            BridgeCommand::MoveLinear(_) => "MOVL",
            BridgeCommand::MoveCircular => "MOVC",
            BridgeCommand::Pause { .. } => "PAUSE",
            BridgeCommand::Speed { .. } => "SPEED",
            BridgeCommand::ReadJoints => "CJNT",
            BridgeCommand::SetDigitalOutput { .. } => "SETDO",
            BridgeCommand::WaitDigitalInput { .. } => "WAITDI",
            BridgeCommand::Passthrough(words) => words.first().map_or("", String::as_str),
        }
    }
}

/// 取前 N 个参数，多余参数忽略
fn take<'a, const N: usize>(
    command: &'static str,
    args: &[&'a str],
) -> Result<[&'a str; N], CommandError> {
    args.get(..N)
        .and_then(|head| <[&str; N]>::try_from(head).ok())
        .ok_or(CommandError::MissingArguments {
            command,
            expected: N,
            actual: args.len(),
        })
}

fn number(command: &'static str, text: &str) -> Result<f64, CommandError> {
    parse_number(text).map_err(|_| CommandError::InvalidNumber {
        command,
        value: text.to_string(),
    })
}

fn registers(command: &'static str, args: &[&str]) -> Result<[f64; REGISTER_COUNT], CommandError> {
    let texts = take::<REGISTER_COUNT>(command, args)?;
    let mut values = [0.0; REGISTER_COUNT];
    for (slot, text) in values.iter_mut().zip(texts) {
        *slot = number(command, text)?;
    }
    Ok(values)
}
