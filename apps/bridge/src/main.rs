//! # MRC Bridge
//!
//! 上位机程序与 MRC 机械臂控制器之间的行命令中继。
//!
//! ## 中继模式（默认）
//!
//! ```bash
//! $ mrc-bridge --log-file /tmp/mrc.log
//! MRC remote
//! use CONNECT <serialport> to open a connection
//! SMS:Working...
//! CONNECT /dev/ttyUSB0
//! SMS:Ready
//! MOVJ 10 20 30 40 50 60
//! SMS:Working...
//! ```
//!
//! stdin 为控制通道，stdout 为状态通道，诊断日志写到 stderr。
//!
//! ## 程序下载
//!
//! ```bash
//! mrc-bridge send Program.mril --port /dev/ttyUSB0
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod relay;
mod send;
mod settings;

use settings::Overrides;

/// MRC Bridge - 机械臂命令中继
#[derive(Parser, Debug)]
#[command(name = "mrc-bridge")]
#[command(about = "Command relay between a host program and an MRC robot controller", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 `<config_dir>/mrc/bridge.toml`）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 中继 stdin 命令到串口（默认）
    Relay,

    /// 下载 `.mril` 程序到控制器
    Send {
        /// 程序文件
        program: PathBuf,

        /// 串口设备（如 /dev/ttyUSB0）
        #[arg(short, long)]
        port: String,
    },

    /// 打印生效的配置（TOML）
    Config,
}

fn main() -> Result<()> {
    // 日志写 stderr，stdout 留给状态通道
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings::DEFAULT_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = settings::resolve(cli.config.as_deref(), &cli.overrides)?;

    match cli.command.unwrap_or(Commands::Relay) {
        Commands::Relay => relay::run(&config),
        Commands::Send { program, port } => send::run(&config, &program, &port),
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        },
    }
}
