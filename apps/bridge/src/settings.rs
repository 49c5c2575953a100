//! 配置解析：文件 → 命令行覆盖

use anyhow::{Context, Result};
use clap::Args;
use mrc_driver::BridgeConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 未设置 `RUST_LOG` 时的日志过滤
pub const DEFAULT_FILTER: &str = "mrc_bridge=info,mrc_driver=info,mrc_post=info";

/// 命令行覆盖项
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// 事务日志路径
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// 追加到已有日志而不是截断
    #[arg(long, global = true)]
    pub append_log: bool,

    /// 串口波特率
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    /// 单次串口读取超时（毫秒）
    #[arg(long, global = true)]
    pub read_timeout_ms: Option<u64>,

    /// 状态未变化时不重复通知
    #[arg(long, global = true)]
    pub dedup_status: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(path) = &self.log_file {
            config.log_file = path.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(ms) = self.read_timeout_ms {
            config.read_timeout_ms = ms;
        }
        config.append_log |= self.append_log;
        config.dedup_status |= self.dedup_status;
    }
}

/// 默认配置文件路径
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mrc").join("bridge.toml"))
}

/// `--config` 优先；否则默认路径存在时加载；否则使用默认值
pub fn resolve(explicit: Option<&Path>, overrides: &Overrides) -> Result<BridgeConfig> {
    let mut config = match explicit {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match default_config_file().filter(|p| p.exists()) {
            Some(path) => {
                debug!("Using config {}", path.display());
                BridgeConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            },
            None => BridgeConfig::default(),
        },
    };
    overrides.apply(&mut config);
    Ok(config)
}
