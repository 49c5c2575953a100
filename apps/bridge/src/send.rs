//! 程序下载模式

use anyhow::{Context, Result, bail};
use mrc_driver::BridgeConfig;
use mrc_post::{MAX_PROGRAM_BYTES, MrcPost, SendReport};
use mrc_serial::{Connector, SerialConnector};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

pub fn run(config: &BridgeConfig, program: &Path, port: &str) -> Result<()> {
    let text = std::fs::read_to_string(program)
        .with_context(|| format!("Failed to read program {}", program.display()))?;
    let mut post = MrcPost::from_text(text);
    info!("Loaded {} line(s) from {}", post.line_count(), program.display());

    let mut link = SerialConnector::new(config.link_settings())
        .open(port)
        .with_context(|| format!("Failed to open {port}"))?;

    let report = post.send_program(&mut link)?;
    write_log(&mut io::stdout().lock(), post.log()).context("Failed to print program log")?;

    match report {
        SendReport::Sent { frames, bytes } => {
            println!("sent {frames} frame(s), {bytes} bytes to {port}");
            Ok(())
        },
        SendReport::TooLarge { size } => {
            bail!("program to long: {size} max {MAX_PROGRAM_BYTES} Bytes")
        },
    }
}

/// 逐行输出后处理日志，去掉帧结束符
fn write_log(out: &mut impl Write, log: &str) -> io::Result<()> {
    for line in log.lines() {
        writeln!(out, "{}", line.trim_end_matches('\r'))?;
    }
    out.flush()
}
