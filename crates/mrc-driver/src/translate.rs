//! 命令 → 线上指令翻译
//!
//! 每个命令变体对应一个翻译函数；字段顺序、固定速度与哨兵序号
//! 都是控制器固件词汇表的一部分。

use crate::command::BridgeCommand;
use crate::state::ConnectionState;
use mrc_protocol::{
    Frame, Instruction, MOVJ_VELOCITY, MOVL_VELOCITY, Opcode, ProtocolError, REGISTER_COUNT,
    SEQ_SENTINEL,
};

/// 翻译结果：会话层据此执行动作
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// 打开链路，随后发送入队帧
    Connect { port: String },
    /// 发送一帧，发送前可选地切换状态
    Send {
        frame: Frame,
        status: Option<ConnectionState>,
    },
    /// 发送关节角查询并同步读取两行应答
    QueryJoints { frame: Frame },
    /// 拒绝执行，仅向调用方报告
    Reject { message: String },
}

pub fn translate(command: &BridgeCommand) -> Result<Dispatch, ProtocolError> {
    let dispatch = match command {
        BridgeCommand::Connect { port } => Dispatch::Connect { port: port.clone() },
        BridgeCommand::MoveJoint(values) => Dispatch::Send {
            frame: move_joint(values).to_frame()?,
            status: Some(ConnectionState::Working),
        },
        BridgeCommand::MoveLinear(values) => Dispatch::Send {
            frame: move_linear(values).to_frame()?,
            status: Some(ConnectionState::Working),
        },
        BridgeCommand::MoveCircular => Dispatch::Reject {
            message: "MOVC not implemented on MRC".to_string(),
        },
        BridgeCommand::Pause { duration } => Dispatch::Send {
            frame: pause(duration).to_frame()?,
            status: None,
        },
        BridgeCommand::Speed { value } => Dispatch::Send {
            frame: speed(value).to_frame()?,
            status: None,
        },
        BridgeCommand::ReadJoints => Dispatch::QueryJoints {
            frame: read_joints().to_frame()?,
        },
        BridgeCommand::SetDigitalOutput { var, value } => Dispatch::Send {
            frame: set_digital_output(var, value).to_frame()?,
            status: None,
        },
        BridgeCommand::WaitDigitalInput { var, value } => Dispatch::Send {
            frame: wait_digital_input(var, value).to_frame()?,
            status: None,
        },
        BridgeCommand::Passthrough(words) => Dispatch::Send {
            frame: passthrough(words).to_frame()?,
            status: None,
        },
    };
    Ok(dispatch)
}

/// CONNECT 成功后发送的入队帧 `:Q\r`
pub fn connect_frame() -> Frame {
    Frame::bare(Opcode::Queue)
}

/// `M00 V10 N42 R0 <v0> ... R5 <v5> `
pub fn move_joint(values: &[f64; REGISTER_COUNT]) -> Instruction {
    Instruction::execute()
        .field("M00")
        .field(MOVJ_VELOCITY)
        .sequence(SEQ_SENTINEL)
        .registers(values)
}

/// `M01 V20 N42 R0 <v0> ... R5 <v5> `
pub fn move_linear(values: &[f64; REGISTER_COUNT]) -> Instruction {
    Instruction::execute()
        .field("M01")
        .field(MOVL_VELOCITY)
        .sequence(SEQ_SENTINEL)
        .registers(values)
}

/// `N42 D <duration>`
pub fn pause(duration: &str) -> Instruction {
    Instruction::execute()
        .sequence(SEQ_SENTINEL)
        .field("D")
        .field(duration)
}

/// `V <value>`
pub fn speed(value: &str) -> Instruction {
    Instruction::execute().field("V").field(value)
}

/// `N42 R1 R2 R3 R4 R5 R6`
pub fn read_joints() -> Instruction {
    (1..=REGISTER_COUNT).fold(Instruction::execute().sequence(SEQ_SENTINEL), |ins, i| {
        ins.field(format!("R{i}"))
    })
}

/// `N42 O<var> <value>`
pub fn set_digital_output(var: &str, value: &str) -> Instruction {
    Instruction::execute()
        .sequence(SEQ_SENTINEL)
        .field(format!("O{var}"))
        .field(value)
}

/// `N42 I<var> <value>`
pub fn wait_digital_input(var: &str, value: &str) -> Instruction {
    Instruction::execute()
        .sequence(SEQ_SENTINEL)
        .field(format!("I{var}"))
        .field(value)
}

/// 原样透传的词序列
pub fn passthrough(words: &[String]) -> Instruction {
    words
        .iter()
        .fold(Instruction::execute(), |ins, w| ins.field(w.as_str()))
}
