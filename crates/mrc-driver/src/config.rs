//! 桥接进程配置
//!
//! 配置文件为 TOML，所有字段都有默认值，缺省字段沿用默认。

use crate::session::SessionOptions;
use mrc_serial::LinkSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 桥接配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 串口波特率
    pub baud_rate: u32,

    /// 单次串口读取超时（毫秒）
    pub read_timeout_ms: u64,

    /// 事件轮询间隔（毫秒）
    pub poll_interval_ms: u64,

    /// CJNT 发出查询后等待应答的时间（毫秒）
    pub joint_query_delay_ms: u64,

    /// 事务日志路径
    pub log_file: PathBuf,

    /// 是否追加到已有日志（默认截断）
    pub append_log: bool,

    /// 状态未变化时不重复通知
    pub dedup_status: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            baud_rate: mrc_protocol::DEFAULT_BAUD_RATE,
            read_timeout_ms: 500,
            poll_interval_ms: 50,
            joint_query_delay_ms: 100,
            log_file: PathBuf::from("log.txt"),
            append_log: false,
            dedup_status: false,
        }
    }
}

impl BridgeConfig {
    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn joint_query_delay(&self) -> Duration {
        Duration::from_millis(self.joint_query_delay_ms)
    }

    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            baud_rate: self.baud_rate,
            timeout: self.read_timeout(),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            read_timeout: self.read_timeout(),
            joint_query_delay: self.joint_query_delay(),
            dedup_status: self.dedup_status,
        }
    }
}
