//! 程序生成
//!
//! 每次调用运动/IO 方法都会追加零或多行带行号的程序文本，
//! 无法在控制器上表达的调用只写入生成日志。

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 程序文件扩展名
pub const PROGRAM_EXTENSION: &str = "mril";

/// 最大轴数（`R1`..`R9`）
pub const MAX_AXES: usize = 9;

/// 位姿 `[x, y, z, a, b, c]`（mm / deg）
pub type Pose = [f64; 6];

/// IO 值：数值按正负映射为 `1`/`0`，文本原样输出
#[derive(Debug, Clone, PartialEq)]
pub enum IoValue {
    Number(f64),
    Text(String),
}

impl IoValue {
    fn render(&self) -> String {
        match self {
            IoValue::Number(v) if *v > 0.0 => "1".to_string(),
            IoValue::Number(_) => "0".to_string(),
            IoValue::Text(text) => text.clone(),
        }
    }
}

impl From<f64> for IoValue {
    fn from(value: f64) -> Self {
        IoValue::Number(value)
    }
}

impl From<i32> for IoValue {
    fn from(value: i32) -> Self {
        IoValue::Number(f64::from(value))
    }
}

impl From<&str> for IoValue {
    fn from(value: &str) -> Self {
        IoValue::Text(value.to_string())
    }
}

impl From<String> for IoValue {
    fn from(value: String) -> Self {
        IoValue::Text(value)
    }
}

/// `X<x/10> Y<y/10> Z<z/10> A<a> B<b> C<c>`
pub fn pose_to_str(pose: &Pose) -> String {
    let [x, y, z, a, b, c] = *pose;
    format!(
        "X{:.3} Y{:.3} Z{:.3} A{:.3} B{:.3} C{:.3}",
        x / 10.0,
        y / 10.0,
        z / 10.0,
        a,
        b,
        c
    )
}

/// `R1<j1> R2<j2> ...`，超出 [`MAX_AXES`] 的轴被忽略
pub fn joints_to_str(joints: &[f64]) -> String {
    joints
        .iter()
        .take(MAX_AXES)
        .enumerate()
        .map(|(i, j)| format!("R{}{:.3}", i + 1, j))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 程序后处理器
#[derive(Debug, Clone, Default)]
pub struct MrcPost {
    program: String,
    log: String,
    line_number: usize,
}

impl MrcPost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有程序文本构造（如读取 `.mril` 文件后直接下载）
    pub fn from_text(program: impl Into<String>) -> Self {
        let program = program.into();
        let line_number = program.lines().count();
        Self {
            program,
            line_number,
            ..Self::default()
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 生成日志
    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn line_count(&self) -> usize {
        self.line_number
    }

    /// 关节运动 `M00 R1.. R2..`
    pub fn move_j(&mut self, joints: &[f64]) {
        self.add_line(&format!("M00 {}", joints_to_str(joints)));
    }

    /// 直线运动 `M01 X.. Y.. Z.. A.. B.. C..`
    pub fn move_l(&mut self, pose: &Pose) {
        self.add_line(&format!("M01 {}", pose_to_str(pose)));
    }

    pub fn move_c(&mut self, via: &Pose, end: &Pose) {
        self.add_line(&format!("MOVC {} {}", pose_to_str(via), pose_to_str(end)));
    }

    /// 控制器不支持切换参考坐标系
    pub fn set_frame(&mut self, _pose: &Pose) {}

    pub fn set_tool(&mut self, pose: &Pose) {
        self.add_line(&format!("TOOL_FRAME {}", pose_to_str(pose)));
    }

    /// 负值表示无限期暂停
    pub fn pause(&mut self, time_ms: f64) {
        if time_ms < 0.0 {
            self.add_line("PAUSE");
        } else {
            self.add_line(&format!("D {:03}", time_ms as i64));
        }
    }

    pub fn set_speed(&mut self, speed_mms: f64) {
        self.add_line(&format!("V {speed_mms:.2}"));
    }

    pub fn set_acceleration(&mut self, _accel_mmss: f64) {
        self.add_log("setAcceleration not defined");
    }

    pub fn set_speed_joints(&mut self, _speed_degs: f64) {
        self.add_log("setSpeedJoints not defined");
    }

    pub fn set_acceleration_joints(&mut self, _accel_degss: f64) {
        self.add_log("setAccelerationJoints not defined");
    }

    pub fn set_zone_data(&mut self, zone_mm: f64) {
        self.add_log(&format!("setZoneData not defined ({zone_mm:.1} mm)"));
    }

    pub fn set_do(&mut self, var: impl ToString, value: impl Into<IoValue>) {
        let value = value.into().render();
        self.add_line(&format!("O{} {}", var.to_string(), value));
    }

    /// 控制器没有超时语义，`timeout_ms` 被忽略
    pub fn wait_di(&mut self, var: impl ToString, value: impl Into<IoValue>, _timeout_ms: f64) {
        let value = value.into().render();
        self.add_line(&format!("I{} {}", var.to_string(), value));
    }

    pub fn run_code(&mut self, code: &str, is_function_call: bool) {
        if is_function_call {
            let mut call = code.replace(' ', "_");
            if !call.ends_with(')') {
                call.push_str("()");
            }
            self.add_line(&call);
        } else {
            self.add_line(code);
        }
    }

    pub fn run_message(&mut self, message: &str, is_comment: bool) {
        if is_comment {
            self.add_line(&format!("# {message}"));
        } else {
            self.add_log(&format!(
                "Show message on teach pendant not implemented ({message})"
            ));
        }
    }

    /// 保存为 `<folder>/<name>.mril`，返回写入的路径
    pub fn prog_save(&self, folder: impl AsRef<Path>, name: &str) -> std::io::Result<PathBuf> {
        let path = folder
            .as_ref()
            .join(format!("{name}.{PROGRAM_EXTENSION}"));
        fs::write(&path, &self.program)?;
        info!("Saved program to {}", path.display());
        Ok(path)
    }

    /// 追加一行程序：行号后补 [`line_padding`] 个空格
    fn add_line(&mut self, text: &str) {
        self.line_number += 1;
        let number = self.line_number.to_string();
        let pad = " ".repeat(line_padding(number.len()));
        let _ = writeln!(self.program, "N{number}{pad}{text}");
        debug!("N{} {}", self.line_number, text);
    }

    pub(crate) fn add_log(&mut self, message: &str) {
        self.log.push_str(message);
        self.log.push('\n');
        info!("{}", message);
    }
}

/// 行号后的空格数
///
/// 1 到 3 位补齐到 3 列；4 位起按 `3 - (位数 - 3)` 递减，6 位及以上不补。
fn line_padding(digits: usize) -> usize {
    if digits <= 3 {
        3 - digits
    } else {
        3usize.saturating_sub(digits - 3)
    }
}
