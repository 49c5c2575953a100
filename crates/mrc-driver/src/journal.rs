//! 事务日志
//!
//! 只追加的文本日志，每个事件一行：
//!
//! ```text
//! 2024-05-01 12:00:00 starting
//! 2024-05-01 12:00:00 R: MOVJ 10 20 30 40 50 60
//! 2024-05-01 12:00:00 T: :EM00 V10 N42 R0 10.00000 ...
//! ```
//!
//! 写日志失败绝不会中断会话：错误只通过 `tracing` 报告一次，之后静默丢弃。

use chrono::{DateTime, Local};
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, LineWriter, Write};
use std::path::Path;
use tracing::warn;

/// 时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 事件方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 收到（控制通道输入、控制器应答）
    Received,
    /// 发出（线上帧、状态通道输出）
    Transmitted,
    /// 会话事件（启动、连接），不带方向标记
    Note,
}

impl Direction {
    pub fn tag(self) -> Option<char> {
        match self {
            Direction::Received => Some('R'),
            Direction::Transmitted => Some('T'),
            Direction::Note => None,
        }
    }
}

/// 单条日志记录
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub direction: Direction,
    pub text: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self.timestamp.format(TIMESTAMP_FORMAT);
        match self.direction.tag() {
            Some(tag) => write!(f, "{} {}: {}", stamp, tag, self.text),
            None => write!(f, "{} {}", stamp, self.text),
        }
    }
}

/// 事务日志
pub struct Journal {
    sink: Option<Box<dyn Write + Send>>,
    records: u64,
    failed: bool,
}

impl Journal {
    /// 打开日志文件（行缓冲）
    ///
    /// `append == false` 时截断已有内容。
    pub fn open(path: impl AsRef<Path>, append: bool) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self::from_writer(LineWriter::new(file)))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(Box::new(writer)),
            records: 0,
            failed: false,
        }
    }

    /// 不落盘的日志
    pub fn disabled() -> Self {
        Self {
            sink: None,
            records: 0,
            failed: false,
        }
    }

    pub fn received(&mut self, text: &str) {
        self.record(Direction::Received, text);
    }

    pub fn transmitted(&mut self, text: &str) {
        self.record(Direction::Transmitted, text);
    }

    pub fn note(&mut self, text: &str) {
        self.record(Direction::Note, text);
    }

    pub fn record(&mut self, direction: Direction, text: &str) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let record = LogRecord {
            timestamp: Local::now(),
            direction,
            text: text.to_string(),
        };
        match writeln!(sink, "{record}") {
            Ok(()) => self.records += 1,
            Err(e) => {
                if !self.failed {
                    warn!("Journal write failed, further errors suppressed: {}", e);
                    self.failed = true;
                }
            },
        }
    }

    pub fn flush(&mut self) {
        if let Some(sink) = self.sink.as_mut()
            && let Err(e) = sink.flush()
        {
            warn!("Journal flush failed: {}", e);
        }
    }

    /// 成功写入的记录数
    pub fn records_written(&self) -> u64 {
        self.records
    }
}

impl fmt::Debug for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Journal")
            .field("enabled", &self.sink.is_some())
            .field("records", &self.records)
            .field("failed", &self.failed)
            .finish()
    }
}
