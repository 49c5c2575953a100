//! 协议常量定义

/// 帧起始符
pub const FRAME_START: u8 = b':';

/// 帧终止符
pub const FRAME_END: u8 = b'\r';

/// 同步指令使用的固定序号（哨兵）
///
/// 目标控制器固件只回显这一个序号，所有同步指令共用，
/// 因此同一时刻只能有一条同步指令在途。
pub const SEQ_SENTINEL: u32 = 42;

/// 控制器默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// 数值字段保留的小数位数（固件精度要求）
pub const NUMBER_DECIMALS: usize = 5;

/// 一次下载到控制器内存的程序最大字节数（不计空格）
pub const MAX_PROGRAM_BYTES: usize = 2000;

/// MOVJ 固定速度字段
pub const MOVJ_VELOCITY: &str = "V10";

/// MOVL 固定速度字段
pub const MOVL_VELOCITY: &str = "V20";

/// 关节/位姿寄存器数量
pub const REGISTER_COUNT: usize = 6;
