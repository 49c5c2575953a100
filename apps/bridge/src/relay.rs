//! 中继模式：stdin → 会话 → 串口，状态写 stdout

use anyhow::Result;
use mrc_driver::BridgeConfig;

#[cfg(unix)]
pub fn run(config: &BridgeConfig) -> Result<()> {
    use anyhow::Context;
    use mrc_driver::{ControlChannel, EventLoop, Journal, NonBlockingStdin, Session};
    use mrc_serial::SerialConnector;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tracing::info;

    let journal = Journal::open(&config.log_file, config.append_log)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;
    info!("Transaction log: {}", config.log_file.display());

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let mut session = Session::new(
        SerialConnector::new(config.link_settings()),
        journal,
        std::io::stdout(),
        config.session_options(),
    );
    let stdin = NonBlockingStdin::new().context("Failed to prepare stdin")?;
    let mut control = ControlChannel::new(stdin);
    let mut event_loop = EventLoop::new(config.poll_interval())?;

    session.start()?;
    let result = event_loop.run(&mut session, &mut control, &shutdown);
    session.shutdown();

    let reason = result?;
    info!("Relay stopped: {:?}", reason);
    Ok(())
}

#[cfg(not(unix))]
pub fn run(_config: &BridgeConfig) -> Result<()> {
    anyhow::bail!("relay mode requires a Unix platform")
}
